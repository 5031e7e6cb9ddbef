//! Cutover Core
//!
//! Deploys a newly trained ranking model to a managed inference endpoint
//! without downtime:
//! - Resolving the trained artifact for a model identifier
//! - Registering it under a fresh, unique model name
//! - Creating a new endpoint configuration and pointing the endpoint at it
//! - Waiting for the endpoint to settle, then retiring what it served before
//!
//! Platform access goes through the `cutover-platform` traits, so the same
//! controller drives the HTTP clients and the in-memory fakes.

pub mod artifact;
pub mod config;
pub mod controller;
pub mod error;
pub mod health;
pub mod naming;
pub mod poll;
pub mod progress;

pub use artifact::{artifact_prefix, resolve_artifact, ResolvedArtifact};
pub use config::{ConfigError, ConfigResult, CutoverConfig, DeployConfig};
pub use controller::{resolve_shape, CutoverController, CutoverReport, Discovery, PreviousDeployment};
pub use error::{CutoverError, CutoverResult};
pub use health::{check_endpoint_health, EndpointHealth};
pub use naming::{validate_resource_name, ResourceNamer, MAX_NAME_LEN};
pub use poll::{await_terminal_status, PollOutcome, PollPolicy};
pub use progress::{ProgressEvent, ProgressSink, RecordingProgressSink, TracingProgressSink};
