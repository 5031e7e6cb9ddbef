//! Platform abstraction layer for endpoint cutovers.
//!
//! This crate defines the two collaborators a deploy talks to and ships
//! implementations of them:
//!
//! - **`ObjectStore`**: lists trained artifacts under a key prefix
//! - **`HostingPlatform`**: registers models, creates endpoint configurations,
//!   repoints endpoints and deletes retired resources
//!
//! `http` provides JSON-over-HTTP clients; `memory` provides recording fakes.

pub mod error;
pub mod http;
pub mod memory;
pub mod types;

use async_trait::async_trait;

pub use error::{PlatformError, PlatformResult};
pub use http::{HttpHostingPlatform, HttpObjectStore, DEFAULT_REQUEST_TIMEOUT};
pub use memory::{InMemoryObjectStore, InMemoryPlatform, PlatformCall};
pub use types::{
    EndpointAction, EndpointConfigDescription, EndpointConfigSpec, EndpointDescription,
    EndpointStatus, InstanceShape, ModelRegistration, ObjectSummary, ProductionVariant,
    PRIMARY_VARIANT,
};

/// Read access to the object store holding trained artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every object in `bucket` whose key starts with `prefix`.
    async fn list(&self, bucket: &str, prefix: &str) -> PlatformResult<Vec<ObjectSummary>>;
}

/// The managed model hosting platform.
#[async_trait]
pub trait HostingPlatform: Send + Sync {
    /// Describes an endpoint, or `None` if it does not exist.
    async fn describe_endpoint(&self, name: &str) -> PlatformResult<Option<EndpointDescription>>;

    /// Describes an endpoint configuration.
    async fn describe_endpoint_config(&self, name: &str) -> PlatformResult<EndpointConfigDescription>;

    /// Registers a model and returns its platform identifier.
    async fn create_model(&self, model: &ModelRegistration) -> PlatformResult<String>;

    /// Creates an endpoint configuration and returns its platform identifier.
    async fn create_endpoint_config(&self, config: &EndpointConfigSpec) -> PlatformResult<String>;

    /// Creates the endpoint or repoints it at `config_name`.
    async fn create_or_update_endpoint(
        &self,
        name: &str,
        config_name: &str,
        action: EndpointAction,
    ) -> PlatformResult<()>;

    async fn delete_endpoint_config(&self, name: &str) -> PlatformResult<()>;

    async fn delete_model(&self, name: &str) -> PlatformResult<()>;
}
