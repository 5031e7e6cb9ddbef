//! Locating the trained artifact for a model identifier.

use crate::error::{CutoverError, CutoverResult};
use cutover_platform::ObjectStore;
use serde::Serialize;
use tracing::{error, info};

/// Key prefix under which training output for `model_id` is stored.
#[must_use]
pub fn artifact_prefix(model_id: &str) -> String {
    format!("model/{}/output", model_id.trim())
}

/// The single artifact a deploy serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArtifact {
    pub bucket: String,
    pub key: String,
}

impl ResolvedArtifact {
    #[must_use]
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// Finds the artifact for `model_id`; exactly one object must match.
pub async fn resolve_artifact(
    store: &dyn ObjectStore,
    bucket: &str,
    model_id: &str,
) -> CutoverResult<ResolvedArtifact> {
    if model_id.trim().is_empty() {
        return Err(CutoverError::InvalidConfig("model identifier is empty".to_string()));
    }
    let prefix = artifact_prefix(model_id);
    info!(bucket, prefix = %prefix, "Looking for model artifact");

    let mut objects = store.list(bucket, &prefix).await?;
    match objects.len() {
        0 => {
            error!(bucket, prefix = %prefix, "Couldn't find the model");
            Err(CutoverError::ArtifactNotFound { prefix })
        }
        1 => {
            let key = objects.remove(0).key;
            info!(key = %key, "Found model artifact");
            Ok(ResolvedArtifact { bucket: bucket.to_string(), key })
        }
        n => {
            error!(prefix = %prefix, count = n, "Found too many models");
            let keys: Vec<String> = objects.into_iter().map(|o| o.key).collect();
            for key in &keys {
                error!("- {key}");
            }
            Err(CutoverError::AmbiguousArtifact { prefix, keys })
        }
    }
}
