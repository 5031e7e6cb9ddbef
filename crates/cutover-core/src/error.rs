//! Error types for cutover operations.

use cutover_platform::PlatformError;
use std::time::Duration;
use thiserror::Error;

/// Result type for cutover operations.
pub type CutoverResult<T> = std::result::Result<T, CutoverError>;

/// Errors that abort a deploy.
#[derive(Debug, Error)]
pub enum CutoverError {
    /// No artifact matched the model prefix.
    #[error("no model artifact found under {prefix}")]
    ArtifactNotFound { prefix: String },

    /// More than one artifact matched the model prefix.
    #[error("expected exactly 1 model artifact under {prefix}, found {}: {}", keys.len(), keys.join(", "))]
    AmbiguousArtifact { prefix: String, keys: Vec<String> },

    /// The endpoint settled in a status other than `InService`.
    #[error("endpoint transition failed with status {status}{}", reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    EndpointTransitionFailed { status: String, reason: Option<String> },

    /// The endpoint was still transitioning when the poll bound ran out.
    #[error("endpoint still transitioning after {attempts} status checks ({elapsed:?})")]
    Timeout { attempts: u32, elapsed: Duration },

    /// The deploy was cancelled while waiting on the endpoint.
    #[error("cutover cancelled while waiting for the endpoint")]
    Cancelled,

    /// A generated or configured resource name breaks platform naming rules.
    #[error("invalid resource name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Deploy configuration is missing or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Retiring the previous resources failed after a successful cutover.
    #[error("endpoint is in service but retiring {resource} failed: {source}")]
    CleanupFailed {
        resource: String,
        #[source]
        source: PlatformError,
    },

    /// Platform or object store call failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl CutoverError {
    /// Whether any platform state may have changed before the error.
    ///
    /// Artifact and naming errors are raised before the first mutating call.
    #[must_use]
    pub const fn is_pre_mutation(&self) -> bool {
        matches!(
            self,
            Self::ArtifactNotFound { .. }
                | Self::AmbiguousArtifact { .. }
                | Self::InvalidName { .. }
                | Self::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_artifact_lists_every_key() {
        let err = CutoverError::AmbiguousArtifact {
            prefix: "model/m/output".to_string(),
            keys: vec!["model/m/output/a".to_string(), "model/m/output/b".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("found 2"));
        assert!(msg.contains("model/m/output/a, model/m/output/b"));
    }

    #[test]
    fn test_transition_failure_message_includes_reason() {
        let err = CutoverError::EndpointTransitionFailed {
            status: "Failed".to_string(),
            reason: Some("health check failed".to_string()),
        };
        assert_eq!(err.to_string(), "endpoint transition failed with status Failed: health check failed");

        let err = CutoverError::EndpointTransitionFailed { status: "RollingBack".to_string(), reason: None };
        assert_eq!(err.to_string(), "endpoint transition failed with status RollingBack");
    }
}
