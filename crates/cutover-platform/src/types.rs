//! Resources exchanged with the hosting platform and object store.
//!
//! All of these are owned by the external services; the controller only
//! refers to them by name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Variant name used for the single production variant of every configuration.
pub const PRIMARY_VARIANT: &str = "primary";

/// One object returned by an object store listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    /// Full object key inside the bucket.
    pub key: String,
    /// Object size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Last modification time, if reported.
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectSummary {
    /// Creates a summary carrying only a key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), size: 0, last_modified: None }
    }
}

/// Lifecycle status of an endpoint as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EndpointStatus {
    OutOfService,
    Creating,
    Updating,
    SystemUpdating,
    RollingBack,
    InService,
    Deleting,
    Failed,
    UpdateRollbackFailed,
    /// A status this client does not know about.
    Other(String),
}

impl EndpointStatus {
    /// Whether a cutover in this status is still settling.
    #[must_use]
    pub const fn is_transitional(&self) -> bool {
        matches!(self, Self::Creating | Self::Updating)
    }

    /// Platform text for this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::OutOfService => "OutOfService",
            Self::Creating => "Creating",
            Self::Updating => "Updating",
            Self::SystemUpdating => "SystemUpdating",
            Self::RollingBack => "RollingBack",
            Self::InService => "InService",
            Self::Deleting => "Deleting",
            Self::Failed => "Failed",
            Self::UpdateRollbackFailed => "UpdateRollbackFailed",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for EndpointStatus {
    fn from(s: &str) -> Self {
        match s {
            "OutOfService" => Self::OutOfService,
            "Creating" => Self::Creating,
            "Updating" => Self::Updating,
            "SystemUpdating" => Self::SystemUpdating,
            "RollingBack" => Self::RollingBack,
            "InService" => Self::InService,
            "Deleting" => Self::Deleting,
            "Failed" => Self::Failed,
            "UpdateRollbackFailed" => Self::UpdateRollbackFailed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EndpointStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<EndpointStatus> for String {
    fn from(status: EndpointStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of a named endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescription {
    pub endpoint_name: String,
    #[serde(rename = "endpoint_config_name")]
    pub config_name: String,
    #[serde(rename = "endpoint_status")]
    pub status: EndpointStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Hardware shape a configuration serves with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceShape {
    pub count: u32,
    pub instance_type: String,
}

impl fmt::Display for InstanceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.count, self.instance_type)
    }
}

/// One model variant inside an endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionVariant {
    pub variant_name: String,
    pub model_name: String,
    #[serde(rename = "initial_instance_count")]
    pub instance_count: u32,
    pub instance_type: String,
}

impl ProductionVariant {
    #[must_use]
    pub fn shape(&self) -> InstanceShape {
        InstanceShape { count: self.instance_count, instance_type: self.instance_type.clone() }
    }
}

/// An immutable endpoint configuration as described by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfigDescription {
    #[serde(rename = "endpoint_config_name")]
    pub config_name: String,
    #[serde(rename = "production_variants")]
    pub variants: Vec<ProductionVariant>,
}

impl EndpointConfigDescription {
    /// The variant deployments are built around (the first one).
    #[must_use]
    pub fn primary(&self) -> Option<&ProductionVariant> {
        self.variants.first()
    }
}

/// Request to register a new servable model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRegistration {
    pub model_name: String,
    /// Location of the artifact, e.g. `s3://bucket/model/x/output/model.tar.gz`.
    pub artifact_uri: String,
    pub role_arn: String,
    /// Serving container image the platform runs the artifact in.
    pub image: String,
}

/// Request to create a new endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfigSpec {
    pub config_name: String,
    pub model_name: String,
    pub shape: InstanceShape,
    pub variant_name: String,
}

impl EndpointConfigSpec {
    /// Single-variant configuration using the `primary` variant name.
    #[must_use]
    pub fn primary(config_name: String, model_name: String, shape: InstanceShape) -> Self {
        Self { config_name, model_name, shape, variant_name: PRIMARY_VARIANT.to_string() }
    }
}

/// Whether a cutover creates the endpoint or repoints an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointAction {
    Create,
    Update,
}

impl EndpointAction {
    #[must_use]
    pub const fn is_update(self) -> bool {
        matches!(self, Self::Update)
    }
}

impl fmt::Display for EndpointAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
        }
    }
}
