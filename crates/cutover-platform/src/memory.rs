//! In-memory platform and object store for tests and local dry runs.
//!
//! `InMemoryPlatform` keeps endpoints, configurations and models in maps and
//! records every call it receives. It enforces the platform's reference rules:
//! a configuration bound to an endpoint cannot be deleted, and a model used by
//! a configuration cannot be deleted.

use crate::error::{PlatformError, PlatformResult};
use crate::types::{
    EndpointAction, EndpointConfigDescription, EndpointConfigSpec, EndpointDescription,
    EndpointStatus, InstanceShape, ModelRegistration, ObjectSummary, ProductionVariant,
    PRIMARY_VARIANT,
};
use crate::{HostingPlatform, ObjectStore};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// One call received by `InMemoryPlatform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    DescribeEndpoint(String),
    DescribeEndpointConfig(String),
    CreateModel(ModelRegistration),
    CreateEndpointConfig(EndpointConfigSpec),
    CreateOrUpdateEndpoint { name: String, config_name: String, action: EndpointAction },
    DeleteEndpointConfig(String),
    DeleteModel(String),
}

impl PlatformCall {
    /// Whether the call changes platform state.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        !matches!(self, Self::DescribeEndpoint(_) | Self::DescribeEndpointConfig(_))
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::DescribeEndpoint(_) => "describe_endpoint",
            Self::DescribeEndpointConfig(_) => "describe_endpoint_config",
            Self::CreateModel(_) => "create_model",
            Self::CreateEndpointConfig(_) => "create_endpoint_config",
            Self::CreateOrUpdateEndpoint { .. } => "create_or_update_endpoint",
            Self::DeleteEndpointConfig(_) => "delete_endpoint_config",
            Self::DeleteModel(_) => "delete_model",
        }
    }
}

#[derive(Debug, Default)]
struct PlatformState {
    endpoints: HashMap<String, EndpointDescription>,
    configs: HashMap<String, EndpointConfigDescription>,
    models: HashMap<String, ModelRegistration>,
    /// Statuses reported by `describe_endpoint` once a cutover was issued.
    status_script: VecDeque<EndpointStatus>,
    failure_reason: Option<String>,
    cutover_issued: bool,
    failures: HashMap<&'static str, PlatformError>,
    calls: Vec<PlatformCall>,
}

/// Recording in-memory `HostingPlatform`.
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    state: Mutex<PlatformState>,
}

impl InMemoryPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an `InService` endpoint backed by `config_name` and `model_name`.
    #[must_use]
    pub fn with_endpoint(
        self,
        endpoint_name: &str,
        config_name: &str,
        model_name: &str,
        shape: InstanceShape,
    ) -> Self {
        {
            let mut state = self.lock();
            state.models.insert(
                model_name.to_string(),
                ModelRegistration {
                    model_name: model_name.to_string(),
                    artifact_uri: format!("s3://seed/{model_name}"),
                    role_arn: "seed".to_string(),
                    image: "seed".to_string(),
                },
            );
            state.configs.insert(
                config_name.to_string(),
                EndpointConfigDescription {
                    config_name: config_name.to_string(),
                    variants: vec![ProductionVariant {
                        variant_name: PRIMARY_VARIANT.to_string(),
                        model_name: model_name.to_string(),
                        instance_count: shape.count,
                        instance_type: shape.instance_type,
                    }],
                },
            );
            state.endpoints.insert(
                endpoint_name.to_string(),
                EndpointDescription {
                    endpoint_name: endpoint_name.to_string(),
                    config_name: config_name.to_string(),
                    status: EndpointStatus::InService,
                    failure_reason: None,
                },
            );
        }
        self
    }

    /// Statuses returned by successive `describe_endpoint` calls after a cutover.
    ///
    /// Once the script runs out a transitional endpoint settles to `InService`.
    #[must_use]
    pub fn with_status_script(self, statuses: Vec<EndpointStatus>) -> Self {
        self.lock().status_script = statuses.into();
        self
    }

    /// Failure reason attached to the endpoint once it leaves the script.
    #[must_use]
    pub fn with_failure_reason(self, reason: &str) -> Self {
        self.lock().failure_reason = Some(reason.to_string());
        self
    }

    /// Makes every call to `operation` (e.g. "create_model") fail with `error`.
    #[must_use]
    pub fn failing(self, operation: &'static str, error: PlatformError) -> Self {
        self.lock().failures.insert(operation, error);
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.lock().calls.clone()
    }

    /// Calls that changed platform state, in order.
    pub fn mutating_calls(&self) -> Vec<PlatformCall> {
        self.lock().calls.iter().filter(|c| c.is_mutating()).cloned().collect()
    }

    /// Number of `describe_endpoint` calls made after a cutover was issued.
    pub fn status_checks(&self) -> usize {
        let state = self.lock();
        state
            .calls
            .iter()
            .skip_while(|c| !matches!(c, PlatformCall::CreateOrUpdateEndpoint { .. }))
            .filter(|c| matches!(c, PlatformCall::DescribeEndpoint(_)))
            .count()
    }

    pub fn endpoint(&self, name: &str) -> Option<EndpointDescription> {
        self.lock().endpoints.get(name).cloned()
    }

    pub fn has_endpoint_config(&self, name: &str) -> bool {
        self.lock().configs.contains_key(name)
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.lock().models.contains_key(name)
    }

    fn lock(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `call` and returns the locked state unless a failure is injected.
    fn record(&self, call: PlatformCall) -> PlatformResult<MutexGuard<'_, PlatformState>> {
        let mut state = self.lock();
        let operation = call.operation();
        debug!(operation, "In-memory platform call");
        state.calls.push(call);
        if let Some(err) = state.failures.get(operation) {
            return Err(err.clone());
        }
        Ok(state)
    }
}

#[async_trait]
impl HostingPlatform for InMemoryPlatform {
    async fn describe_endpoint(&self, name: &str) -> PlatformResult<Option<EndpointDescription>> {
        let mut state = self.record(PlatformCall::DescribeEndpoint(name.to_string()))?;
        let issued = state.cutover_issued;
        let next = if issued { state.status_script.pop_front() } else { None };
        let reason = state.failure_reason.clone();

        let Some(endpoint) = state.endpoints.get_mut(name) else {
            return Ok(None);
        };
        if let Some(status) = next {
            endpoint.status = status;
        } else if issued && endpoint.status.is_transitional() {
            endpoint.status = EndpointStatus::InService;
        }
        if issued && !endpoint.status.is_transitional() && endpoint.status != EndpointStatus::InService {
            endpoint.failure_reason = reason;
        }
        Ok(Some(endpoint.clone()))
    }

    async fn describe_endpoint_config(&self, name: &str) -> PlatformResult<EndpointConfigDescription> {
        let state = self.record(PlatformCall::DescribeEndpointConfig(name.to_string()))?;
        state
            .configs
            .get(name)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("endpoint config {name}")))
    }

    async fn create_model(&self, model: &ModelRegistration) -> PlatformResult<String> {
        let mut state = self.record(PlatformCall::CreateModel(model.clone()))?;
        if state.models.contains_key(&model.model_name) {
            return Err(PlatformError::Api {
                status: 400,
                message: format!("model {} already exists", model.model_name),
            });
        }
        state.models.insert(model.model_name.clone(), model.clone());
        Ok(format!("arn:model/{}", model.model_name))
    }

    async fn create_endpoint_config(&self, config: &EndpointConfigSpec) -> PlatformResult<String> {
        let mut state = self.record(PlatformCall::CreateEndpointConfig(config.clone()))?;
        if state.configs.contains_key(&config.config_name) {
            return Err(PlatformError::Api {
                status: 400,
                message: format!("endpoint config {} already exists", config.config_name),
            });
        }
        if !state.models.contains_key(&config.model_name) {
            return Err(PlatformError::NotFound(format!("model {}", config.model_name)));
        }
        state.configs.insert(
            config.config_name.clone(),
            EndpointConfigDescription {
                config_name: config.config_name.clone(),
                variants: vec![ProductionVariant {
                    variant_name: config.variant_name.clone(),
                    model_name: config.model_name.clone(),
                    instance_count: config.shape.count,
                    instance_type: config.shape.instance_type.clone(),
                }],
            },
        );
        Ok(format!("arn:endpoint-config/{}", config.config_name))
    }

    async fn create_or_update_endpoint(
        &self,
        name: &str,
        config_name: &str,
        action: EndpointAction,
    ) -> PlatformResult<()> {
        let mut state = self.record(PlatformCall::CreateOrUpdateEndpoint {
            name: name.to_string(),
            config_name: config_name.to_string(),
            action,
        })?;
        if !state.configs.contains_key(config_name) {
            return Err(PlatformError::NotFound(format!("endpoint config {config_name}")));
        }
        match (action, state.endpoints.contains_key(name)) {
            (EndpointAction::Create, true) => {
                return Err(PlatformError::Api {
                    status: 400,
                    message: format!("endpoint {name} already exists"),
                });
            }
            (EndpointAction::Update, false) => {
                return Err(PlatformError::NotFound(format!("endpoint {name}")));
            }
            _ => {}
        }
        let status = match action {
            EndpointAction::Create => EndpointStatus::Creating,
            EndpointAction::Update => EndpointStatus::Updating,
        };
        state.endpoints.insert(
            name.to_string(),
            EndpointDescription {
                endpoint_name: name.to_string(),
                config_name: config_name.to_string(),
                status,
                failure_reason: None,
            },
        );
        state.cutover_issued = true;
        Ok(())
    }

    async fn delete_endpoint_config(&self, name: &str) -> PlatformResult<()> {
        let mut state = self.record(PlatformCall::DeleteEndpointConfig(name.to_string()))?;
        if state.endpoints.values().any(|e| e.config_name == name) {
            return Err(PlatformError::Api {
                status: 400,
                message: format!("endpoint config {name} is in use by an endpoint"),
            });
        }
        state
            .configs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound(format!("endpoint config {name}")))
    }

    async fn delete_model(&self, name: &str) -> PlatformResult<()> {
        let mut state = self.record(PlatformCall::DeleteModel(name.to_string()))?;
        let referenced = state
            .configs
            .values()
            .any(|c| c.variants.iter().any(|v| v.model_name == name));
        if referenced {
            return Err(PlatformError::Api {
                status: 400,
                message: format!("model {name} is referenced by an endpoint config"),
            });
        }
        state
            .models
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound(format!("model {name}")))
    }
}

/// In-memory `ObjectStore` keyed by bucket.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    buckets: Mutex<HashMap<String, Vec<ObjectSummary>>>,
}

impl InMemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object with `key` to `bucket`.
    #[must_use]
    pub fn with_object(self, bucket: &str, key: &str) -> Self {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(bucket.to_string())
            .or_default()
            .push(ObjectSummary::new(key));
        self
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list(&self, bucket: &str, prefix: &str) -> PlatformResult<Vec<ObjectSummary>> {
        let buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(buckets
            .get(bucket)
            .map(|objects| objects.iter().filter(|o| o.key.starts_with(prefix)).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> InstanceShape {
        InstanceShape { count: 1, instance_type: "ml.t2.medium".to_string() }
    }

    #[tokio::test]
    async fn test_config_in_use_cannot_be_deleted() {
        let platform = InMemoryPlatform::new().with_endpoint("ep", "cfg-old", "model-old", shape());

        let err = platform.delete_endpoint_config("cfg-old").await.unwrap_err();
        assert!(matches!(err, PlatformError::Api { status: 400, .. }));
        let err = platform.delete_model("model-old").await.unwrap_err();
        assert!(matches!(err, PlatformError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_status_script_applies_only_after_cutover() {
        let platform = InMemoryPlatform::new()
            .with_endpoint("ep", "cfg-old", "model-old", shape())
            .with_status_script(vec![EndpointStatus::Updating, EndpointStatus::Failed])
            .with_failure_reason("boom");

        let before = platform.describe_endpoint("ep").await.unwrap().unwrap();
        assert_eq!(before.status, EndpointStatus::InService);

        platform
            .create_or_update_endpoint("ep", "cfg-old", EndpointAction::Update)
            .await
            .unwrap();
        let first = platform.describe_endpoint("ep").await.unwrap().unwrap();
        let second = platform.describe_endpoint("ep").await.unwrap().unwrap();
        assert_eq!(first.status, EndpointStatus::Updating);
        assert_eq!(second.status, EndpointStatus::Failed);
        assert_eq!(second.failure_reason.as_deref(), Some("boom"));
        assert_eq!(platform.status_checks(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded_and_returned() {
        let platform =
            InMemoryPlatform::new().failing("describe_endpoint", PlatformError::Request("down".to_string()));

        let err = platform.describe_endpoint("ep").await.unwrap_err();
        assert_eq!(err, PlatformError::Request("down".to_string()));
        assert_eq!(platform.calls(), vec![PlatformCall::DescribeEndpoint("ep".to_string())]);
    }

    #[tokio::test]
    async fn test_object_store_filters_by_prefix() {
        let store = InMemoryObjectStore::new()
            .with_object("b", "model/a/output/model.tar.gz")
            .with_object("b", "model/ab/output/model.tar.gz")
            .with_object("b", "data/a/train.txt");

        let objects = store.list("b", "model/a/output").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert!(store.list("other", "model").await.unwrap().is_empty());
    }
}
