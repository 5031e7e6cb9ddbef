use crate::controller::PreviousDeployment;
use cutover_platform::{EndpointAction, EndpointStatus, InstanceShape};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Discovered { endpoint: String, previous: Option<PreviousDeployment> },
    ArtifactResolved { key: String },
    ModelRegistered { model_name: String },
    ConfigCreated { config_name: String, shape: InstanceShape },
    CutoverIssued { endpoint: String, config_name: String, action: EndpointAction },
    StatusChecked { endpoint: String, attempt: u32, status: EndpointStatus },
    Retired { config_name: String, model_name: Option<String> },
    Finished { endpoint: String },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Discovered { endpoint, previous: Some(previous) } => {
                info!(endpoint = %endpoint, config = %previous.config_name, "Found current endpoint config");
            }
            ProgressEvent::Discovered { endpoint, previous: None } => {
                info!(endpoint = %endpoint, "No current endpoint, will create a new one");
            }
            ProgressEvent::ArtifactResolved { key } => info!(key = %key, "Deploying model"),
            ProgressEvent::ModelRegistered { model_name } => info!(model = %model_name, "Registered model"),
            ProgressEvent::ConfigCreated { config_name, shape } => {
                info!(config = %config_name, shape = %shape, "Created endpoint config");
            }
            ProgressEvent::CutoverIssued { endpoint, config_name, action } => {
                info!(endpoint = %endpoint, config = %config_name, action = %action, "Cutover issued");
            }
            ProgressEvent::StatusChecked { endpoint, attempt, status } => {
                info!(endpoint = %endpoint, attempt, status = %status, "Waiting for new model to be deployed...");
            }
            ProgressEvent::Retired { config_name, model_name } => {
                info!(config = %config_name, model = ?model_name, "Removed previous endpoint config and model");
            }
            ProgressEvent::Finished { endpoint } => info!(endpoint = %endpoint, "done"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgressSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ProgressSink for RecordingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = ProgressEvent::StatusChecked {
            endpoint: "ep".to_string(),
            attempt: 2,
            status: EndpointStatus::Updating,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "status_checked", "endpoint": "ep", "attempt": 2, "status": "Updating"})
        );
    }

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingProgressSink::default();
        sink.on_event(ProgressEvent::ArtifactResolved { key: "k".to_string() });
        sink.on_event(ProgressEvent::Finished { endpoint: "ep".to_string() });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], ProgressEvent::Finished { .. }));
    }
}
