//! Endpoint cutover state machine.
//!
//! A deploy walks these states in order:
//!
//! ```text
//! DISCOVER -> RESOLVE_ARTIFACT -> REGISTER_MODEL -> CREATE_CONFIG -> CUTOVER -> POLL -> CLEANUP
//! ```
//!
//! Nothing that existed before the deploy is changed until the new
//! configuration is `InService`. A failure before the cutover leaves only the
//! newly created model/configuration behind; a failed transition leaves both
//! the new and previous resources in place so the endpoint can be rolled back
//! or the deploy retried.

use crate::artifact::{resolve_artifact, ResolvedArtifact};
use crate::config::{DeployConfig, DEFAULT_INSTANCE_COUNT, DEFAULT_INSTANCE_TYPE};
use crate::error::{CutoverError, CutoverResult};
use crate::naming::{validate_resource_name, ResourceNamer};
use crate::poll::await_terminal_status;
use crate::progress::{ProgressEvent, ProgressSink, TracingProgressSink};
use cutover_platform::{
    EndpointAction, EndpointConfigSpec, HostingPlatform, InstanceShape, ModelRegistration, ObjectStore,
    PlatformError,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

static TRACING_SINK: TracingProgressSink = TracingProgressSink;

/// What the endpoint was serving when the deploy started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviousDeployment {
    pub config_name: String,
    /// Model behind the primary variant, if the configuration has one.
    pub model_name: Option<String>,
    pub shape: Option<InstanceShape>,
}

/// Outcome of the discovery step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// The endpoint exists; the cutover updates it and retires `PreviousDeployment`.
    Existing(PreviousDeployment),
    /// The endpoint does not exist; the cutover creates it.
    FirstDeploy,
    /// The endpoint could not be described; handled like `FirstDeploy`.
    LookupFailed { reason: String },
}

impl Discovery {
    #[must_use]
    pub const fn previous(&self) -> Option<&PreviousDeployment> {
        match self {
            Self::Existing(previous) => Some(previous),
            Self::FirstDeploy | Self::LookupFailed { .. } => None,
        }
    }

    #[must_use]
    pub const fn action(&self) -> EndpointAction {
        match self {
            Self::Existing(_) => EndpointAction::Update,
            Self::FirstDeploy | Self::LookupFailed { .. } => EndpointAction::Create,
        }
    }
}

/// Summary of a completed deploy.
#[derive(Debug, Clone, Serialize)]
pub struct CutoverReport {
    pub endpoint_name: String,
    pub action: EndpointAction,
    pub artifact: ResolvedArtifact,
    pub model_name: String,
    pub config_name: String,
    pub shape: InstanceShape,
    pub status_checks: u32,
    /// Resources deleted after the cutover.
    pub retired: Option<PreviousDeployment>,
}

/// Picks the shape for the new configuration.
///
/// Count and type resolve independently: caller override, then the
/// previous configuration, then the built-in default.
#[must_use]
pub fn resolve_shape(
    count: Option<u32>,
    instance_type: Option<&str>,
    previous: Option<&InstanceShape>,
) -> InstanceShape {
    InstanceShape {
        count: count.or_else(|| previous.map(|p| p.count)).unwrap_or(DEFAULT_INSTANCE_COUNT),
        instance_type: instance_type
            .map(str::to_string)
            .or_else(|| previous.map(|p| p.instance_type.clone()))
            .unwrap_or_else(|| DEFAULT_INSTANCE_TYPE.to_string()),
    }
}

/// Drives one deploy against a hosting platform.
pub struct CutoverController<'a> {
    platform: &'a dyn HostingPlatform,
    store: &'a dyn ObjectStore,
    config: &'a DeployConfig,
    namer: ResourceNamer,
    sink: &'a dyn ProgressSink,
    cancel: CancellationToken,
}

impl<'a> CutoverController<'a> {
    #[must_use]
    pub fn new(platform: &'a dyn HostingPlatform, store: &'a dyn ObjectStore, config: &'a DeployConfig) -> Self {
        Self {
            platform,
            store,
            config,
            namer: ResourceNamer::new(config.name_prefix.clone(), config.environment.clone()),
            sink: &TRACING_SINK,
            cancel: CancellationToken::new(),
        }
    }

    /// Reports progress to `sink` instead of the log.
    #[must_use]
    pub fn with_progress(mut self, sink: &'a dyn ProgressSink) -> Self {
        self.sink = sink;
        self
    }

    /// Aborts the status wait when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Finds what the endpoint currently serves. Never fails.
    pub async fn discover(&self) -> Discovery {
        let endpoint = &self.config.endpoint_name;
        let discovery = match self.describe_current().await {
            Ok(Some(previous)) => Discovery::Existing(previous),
            Ok(None) => {
                info!(endpoint = %endpoint, "could not find current endpoint, will create a new one");
                Discovery::FirstDeploy
            }
            Err(e) => {
                warn!(
                    endpoint = %endpoint,
                    error = %e,
                    "EndpointLookupFailed: could not describe current endpoint, will create a new one"
                );
                Discovery::LookupFailed { reason: e.to_string() }
            }
        };
        self.sink.on_event(ProgressEvent::Discovered {
            endpoint: endpoint.clone(),
            previous: discovery.previous().cloned(),
        });
        discovery
    }

    async fn describe_current(&self) -> Result<Option<PreviousDeployment>, PlatformError> {
        let Some(endpoint) = self.platform.describe_endpoint(&self.config.endpoint_name).await? else {
            return Ok(None);
        };
        let config = self.platform.describe_endpoint_config(&endpoint.config_name).await?;
        let primary = config.primary();
        Ok(Some(PreviousDeployment {
            config_name: endpoint.config_name,
            model_name: primary.map(|v| v.model_name.clone()),
            shape: primary.map(|v| v.shape()),
        }))
    }

    /// Deploys the artifact trained for `model_id` to the endpoint.
    pub async fn deploy(&self, model_id: &str) -> CutoverResult<CutoverReport> {
        let endpoint = self.config.endpoint_name.clone();
        validate_resource_name(&endpoint)?;

        let discovery = self.discover().await;
        let previous = discovery.previous();
        let action = discovery.action();

        let artifact = resolve_artifact(self.store, &self.config.bucket, model_id).await?;
        self.sink.on_event(ProgressEvent::ArtifactResolved { key: artifact.key.clone() });

        let model_name = self.namer.model_name()?;
        let config_name = self.namer.config_name(&model_name)?;
        let shape = resolve_shape(
            self.config.instance_count,
            self.config.instance_type.as_deref(),
            previous.and_then(|p| p.shape.as_ref()),
        );

        info!(model = %model_name, uri = %artifact.uri(), "Registering model");
        self.platform
            .create_model(&ModelRegistration {
                model_name: model_name.clone(),
                artifact_uri: artifact.uri(),
                role_arn: self.config.role_arn.clone(),
                image: self.config.image.clone(),
            })
            .await?;
        self.sink.on_event(ProgressEvent::ModelRegistered { model_name: model_name.clone() });

        self.platform
            .create_endpoint_config(&EndpointConfigSpec::primary(
                config_name.clone(),
                model_name.clone(),
                shape.clone(),
            ))
            .await?;
        self.sink.on_event(ProgressEvent::ConfigCreated { config_name: config_name.clone(), shape: shape.clone() });

        self.platform.create_or_update_endpoint(&endpoint, &config_name, action).await?;
        self.sink.on_event(ProgressEvent::CutoverIssued {
            endpoint: endpoint.clone(),
            config_name: config_name.clone(),
            action,
        });

        let outcome =
            await_terminal_status(self.platform, &endpoint, &self.config.poll, &self.cancel, self.sink).await?;

        let retired = match previous {
            Some(previous) => Some(self.retire(previous, &config_name, &model_name).await?),
            None => None,
        };

        self.sink.on_event(ProgressEvent::Finished { endpoint: endpoint.clone() });
        Ok(CutoverReport {
            endpoint_name: endpoint,
            action,
            artifact,
            model_name,
            config_name,
            shape,
            status_checks: outcome.checks,
            retired,
        })
    }

    /// Deletes the previous configuration, then the previous model.
    ///
    /// The configuration must go first: the platform refuses to delete a
    /// model still referenced by a configuration.
    async fn retire(
        &self,
        previous: &PreviousDeployment,
        new_config: &str,
        new_model: &str,
    ) -> CutoverResult<PreviousDeployment> {
        if previous.config_name != new_config {
            self.platform.delete_endpoint_config(&previous.config_name).await.map_err(|source| {
                CutoverError::CleanupFailed { resource: format!("endpoint config {}", previous.config_name), source }
            })?;
        }

        match previous.model_name.as_deref() {
            Some(model) if model != new_model => {
                self.platform.delete_model(model).await.map_err(|source| CutoverError::CleanupFailed {
                    resource: format!("model {model}"),
                    source,
                })?;
            }
            Some(_) => {}
            None => warn!(config = %previous.config_name, "Previous endpoint config had no model variant"),
        }

        self.sink.on_event(ProgressEvent::Retired {
            config_name: previous.config_name.clone(),
            model_name: previous.model_name.clone(),
        });
        Ok(previous.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(count: u32, instance_type: &str) -> InstanceShape {
        InstanceShape { count, instance_type: instance_type.to_string() }
    }

    #[test]
    fn test_override_beats_previous_shape() {
        let previous = shape(3, "ml.m5.large");
        let resolved = resolve_shape(Some(1), Some("ml.c5.xlarge"), Some(&previous));
        assert_eq!(resolved, shape(1, "ml.c5.xlarge"));
    }

    #[test]
    fn test_previous_shape_fills_missing_overrides() {
        let previous = shape(3, "ml.m5.large");
        assert_eq!(resolve_shape(None, None, Some(&previous)), previous);
        assert_eq!(resolve_shape(Some(5), None, Some(&previous)), shape(5, "ml.m5.large"));
    }

    #[test]
    fn test_default_shape_without_previous() {
        assert_eq!(resolve_shape(None, None, None), shape(DEFAULT_INSTANCE_COUNT, DEFAULT_INSTANCE_TYPE));
    }

    #[test]
    fn test_discovery_actions() {
        let previous = PreviousDeployment { config_name: "cfg".to_string(), model_name: None, shape: None };
        assert_eq!(Discovery::Existing(previous).action(), EndpointAction::Update);
        assert_eq!(Discovery::FirstDeploy.action(), EndpointAction::Create);
        assert_eq!(Discovery::LookupFailed { reason: "x".to_string() }.action(), EndpointAction::Create);
        assert!(Discovery::FirstDeploy.previous().is_none());
    }
}
