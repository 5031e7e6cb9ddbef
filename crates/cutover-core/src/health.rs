//! Endpoint health check.

use crate::error::CutoverResult;
use cutover_platform::{EndpointStatus, HostingPlatform};
use serde::Serialize;
use std::fmt;

/// Statuses in which an endpoint still serves requests.
pub const HEALTHY_STATUSES: [EndpointStatus; 3] =
    [EndpointStatus::InService, EndpointStatus::Updating, EndpointStatus::SystemUpdating];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "health", rename_all = "snake_case")]
pub enum EndpointHealth {
    Healthy { status: EndpointStatus },
    Unhealthy { status: EndpointStatus, reason: Option<String> },
    Missing,
}

impl EndpointHealth {
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }
}

impl fmt::Display for EndpointHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy { status } => write!(f, "Status: '{status}'."),
            Self::Unhealthy { status, reason: Some(reason) } => write!(f, "Status: '{status}'. Error: {reason}."),
            Self::Unhealthy { status, reason: None } => write!(f, "Status: '{status}'."),
            Self::Missing => write!(f, "Endpoint does not exist."),
        }
    }
}

/// Describes `endpoint` and classifies its status.
pub async fn check_endpoint_health(platform: &dyn HostingPlatform, endpoint: &str) -> CutoverResult<EndpointHealth> {
    let Some(description) = platform.describe_endpoint(endpoint).await? else {
        return Ok(EndpointHealth::Missing);
    };
    let status = description.status;
    if HEALTHY_STATUSES.contains(&status) {
        Ok(EndpointHealth::Healthy { status })
    } else {
        Ok(EndpointHealth::Unhealthy { status, reason: description.failure_reason })
    }
}
