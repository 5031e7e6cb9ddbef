//! Cutover Training
//!
//! Client for the training trigger service that feeds the deploy pipeline:
//! - Starting a training run (`POST /train`)
//! - Polling it to completion (`GET /train`)
//! - Fetching the latest training data (`GET /latest-data`)

pub mod client;
pub mod error;
pub mod retry;

pub use client::{TrainingClient, TrainingClientConfig, TrainingStatus, TriggerOutcome};
pub use error::{TrainingError, TrainingResult};
pub use retry::AuthRetryPolicy;
