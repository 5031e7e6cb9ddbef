//! Command implementations for the Cutover CLI.

pub mod config;
pub mod deploy;
pub mod fetch_data;
pub mod status;
pub mod train;

use anyhow::Context;
use cutover_core::CutoverConfig;
use cutover_platform::{HttpHostingPlatform, HttpObjectStore};
use cutover_training::TrainingClient;

/// Hosting platform client from the `[platform]` section.
fn hosting_platform(config: &CutoverConfig) -> anyhow::Result<HttpHostingPlatform> {
    let (base_url, token) = config.platform.require("platform").context("Hosting platform is not configured")?;
    Ok(HttpHostingPlatform::new(base_url, token)?)
}

/// Object store client from the `[object_store]` section.
fn object_store(config: &CutoverConfig) -> anyhow::Result<HttpObjectStore> {
    let (base_url, token) =
        config.object_store.require("object_store").context("Object store is not configured")?;
    Ok(HttpObjectStore::new(base_url, token)?)
}

fn training_client(config: &CutoverConfig) -> anyhow::Result<TrainingClient> {
    let settings = config.training_client_config().context("Training service is not configured")?;
    Ok(TrainingClient::new(settings)?)
}
