//! Deploy configuration file support.
//!
//! `CutoverConfig` mirrors the TOML file: every field is optional so a file,
//! command-line overrides and defaults can be merged. `CutoverConfig::deploy_config`
//! resolves the merged values into the `DeployConfig` handed to the controller.

use crate::poll::PollPolicy;
use cutover_training::{AuthRetryPolicy, TrainingClientConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name prefix for generated models.
pub const DEFAULT_NAME_PREFIX: &str = "search-ltr";

/// Serving container the platform runs registered models in.
pub const DEFAULT_IMAGE: &str =
    "763104351884.dkr.ecr.eu-west-1.amazonaws.com/tensorflow-inference:2.0.0-cpu";

/// Instance count used when neither an override nor a previous configuration exists.
pub const DEFAULT_INSTANCE_COUNT: u32 = 1;

/// Instance type used when neither an override nor a previous configuration exists.
pub const DEFAULT_INSTANCE_TYPE: &str = "ml.t2.medium";

/// Endpoint status poll defaults: every 10s, for at most an hour.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 360;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 3600;

/// Deploy configuration as read from `cutover.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutoverConfig {
    /// Target environment name (e.g. "staging").
    pub environment: Option<String>,

    /// Execution role bound to registered models.
    pub role_arn: Option<String>,

    /// Artifact bucket (default: "<environment>-search-relevancy").
    pub bucket: Option<String>,

    /// Endpoint to cut over (default: "<environment>-<name_prefix>-endpoint").
    pub endpoint_name: Option<String>,

    pub name_prefix: Option<String>,

    /// Serving container image.
    pub image: Option<String>,

    /// Instance count override.
    pub instance_count: Option<u32>,

    /// Instance type override.
    pub instance_type: Option<String>,

    pub poll: PollSettings,

    pub platform: ServiceSettings,

    pub object_store: ServiceSettings,

    pub training: TrainingSettings,
}

/// Endpoint status polling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Location and credentials of an HTTP service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
}

/// Training trigger service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub max_wait_secs: Option<u64>,
    pub auth_retries: Option<u32>,
    pub auth_backoff_secs: Option<u64>,
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Missing or invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Fully resolved settings for one deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub environment: String,
    pub role_arn: String,
    pub bucket: String,
    pub endpoint_name: String,
    pub name_prefix: String,
    pub image: String,
    pub instance_count: Option<u32>,
    pub instance_type: Option<String>,
    pub poll: PollPolicy,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn merge_option<T: Clone>(target: &mut Option<T>, other: &Option<T>) {
    if other.is_some() {
        target.clone_from(other);
    }
}

impl ServiceSettings {
    fn merge(&mut self, other: &Self) {
        merge_option(&mut self.base_url, &other.base_url);
        merge_option(&mut self.api_token, &other.api_token);
    }

    /// Base URL and token, failing if the URL is missing.
    pub fn require(&self, service: &str) -> ConfigResult<(String, Option<String>)> {
        let base_url = non_empty(self.base_url.as_ref())
            .ok_or_else(|| ConfigError::InvalidValue(format!("{service}.base_url is required")))?;
        Ok((base_url.to_string(), self.api_token.clone()))
    }
}

impl CutoverConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Default configuration file path, relative to the working directory.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from("cutover.toml")
    }

    /// Load `path` if given, else `./cutover.toml` if it exists, else defaults.
    ///
    /// An explicitly given path must exist.
    pub fn discover_and_load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::load_from_file(&Self::default_local_path()) {
                Ok(config) => Ok(config),
                Err(ConfigError::NotFound(_)) => Ok(Self::default()),
                Err(e) => Err(e),
            },
        }
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &Self) {
        merge_option(&mut self.environment, &other.environment);
        merge_option(&mut self.role_arn, &other.role_arn);
        merge_option(&mut self.bucket, &other.bucket);
        merge_option(&mut self.endpoint_name, &other.endpoint_name);
        merge_option(&mut self.name_prefix, &other.name_prefix);
        merge_option(&mut self.image, &other.image);
        merge_option(&mut self.instance_count, &other.instance_count);
        merge_option(&mut self.instance_type, &other.instance_type);

        merge_option(&mut self.poll.interval_secs, &other.poll.interval_secs);
        merge_option(&mut self.poll.max_attempts, &other.poll.max_attempts);
        merge_option(&mut self.poll.timeout_secs, &other.poll.timeout_secs);

        self.platform.merge(&other.platform);
        self.object_store.merge(&other.object_store);

        let (t, o) = (&mut self.training, &other.training);
        merge_option(&mut t.base_url, &o.base_url);
        merge_option(&mut t.api_token, &o.api_token);
        merge_option(&mut t.poll_interval_secs, &o.poll_interval_secs);
        merge_option(&mut t.max_wait_secs, &o.max_wait_secs);
        merge_option(&mut t.auth_retries, &o.auth_retries);
        merge_option(&mut t.auth_backoff_secs, &o.auth_backoff_secs);
    }

    /// Environment name, required by every command.
    pub fn environment(&self) -> ConfigResult<&str> {
        non_empty(self.environment.as_ref())
            .ok_or_else(|| ConfigError::InvalidValue("environment is required".to_string()))
    }

    /// Endpoint name, explicit or derived from environment and prefix.
    pub fn endpoint_name(&self) -> ConfigResult<String> {
        if let Some(name) = non_empty(self.endpoint_name.as_ref()) {
            return Ok(name.to_string());
        }
        let prefix = non_empty(self.name_prefix.as_ref()).unwrap_or(DEFAULT_NAME_PREFIX);
        Ok(format!("{}-{prefix}-endpoint", self.environment()?))
    }

    /// Endpoint poll policy with defaults applied.
    pub fn poll_policy(&self) -> ConfigResult<PollPolicy> {
        let interval = self.poll.interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        let max_attempts = self.poll.max_attempts.unwrap_or(DEFAULT_POLL_MAX_ATTEMPTS);
        let timeout = self.poll.timeout_secs.unwrap_or(DEFAULT_POLL_TIMEOUT_SECS);
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue("poll.max_attempts must be >= 1".to_string()));
        }
        Ok(PollPolicy {
            interval: Duration::from_secs(interval),
            max_attempts: Some(max_attempts),
            timeout: Some(Duration::from_secs(timeout)),
        })
    }

    /// Resolve and validate everything a deploy needs.
    pub fn deploy_config(&self) -> ConfigResult<DeployConfig> {
        let environment = self.environment()?.to_string();
        let role_arn = non_empty(self.role_arn.as_ref())
            .ok_or_else(|| ConfigError::InvalidValue("role_arn is required".to_string()))?
            .to_string();
        if self.instance_count == Some(0) {
            return Err(ConfigError::InvalidValue("instance_count must be >= 1".to_string()));
        }
        if self.instance_type.as_ref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidValue("instance_type must not be empty".to_string()));
        }

        Ok(DeployConfig {
            bucket: non_empty(self.bucket.as_ref())
                .map_or_else(|| format!("{environment}-search-relevancy"), str::to_string),
            endpoint_name: self.endpoint_name()?,
            name_prefix: non_empty(self.name_prefix.as_ref()).unwrap_or(DEFAULT_NAME_PREFIX).to_string(),
            image: non_empty(self.image.as_ref()).unwrap_or(DEFAULT_IMAGE).to_string(),
            instance_count: self.instance_count,
            instance_type: self.instance_type.as_ref().map(|t| t.trim().to_string()),
            poll: self.poll_policy()?,
            environment,
            role_arn,
        })
    }

    /// Settings for the training trigger client.
    pub fn training_client_config(&self) -> ConfigResult<TrainingClientConfig> {
        let t = &self.training;
        let base_url = non_empty(t.base_url.as_ref())
            .ok_or_else(|| ConfigError::InvalidValue("training.base_url is required".to_string()))?;

        let mut config = TrainingClientConfig::new(base_url);
        config.api_token.clone_from(&t.api_token);
        if let Some(secs) = t.poll_interval_secs {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = t.max_wait_secs {
            config.max_wait = Duration::from_secs(secs);
        }
        let defaults = AuthRetryPolicy::default();
        config.auth_retry = AuthRetryPolicy {
            max_retries: t.auth_retries.unwrap_or(defaults.max_retries),
            backoff: t.auth_backoff_secs.map_or(defaults.backoff, Duration::from_secs),
        };
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn minimal() -> CutoverConfig {
        CutoverConfig {
            environment: Some("staging".to_string()),
            role_arn: Some("arn:aws:iam::1:role/deploy".to_string()),
            ..CutoverConfig::default()
        }
    }

    #[test]
    fn test_load_from_file_parses_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cutover.toml");
        std::fs::write(
            &path,
            r#"
environment = "integration"
role_arn = "arn:role"
instance_count = 2

[poll]
interval_secs = 5

[platform]
base_url = "http://hosting.local"

[training]
base_url = "http://trainer.local"
auth_retries = 1
"#,
        )
        .unwrap();

        let config = CutoverConfig::load_from_file(&path).unwrap();
        assert_eq!(config.environment.as_deref(), Some("integration"));
        assert_eq!(config.instance_count, Some(2));
        assert_eq!(config.poll.interval_secs, Some(5));
        assert_eq!(config.platform.base_url.as_deref(), Some("http://hosting.local"));
        assert_eq!(config.training.auth_retries, Some(1));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = CutoverConfig::load_from_file(&temp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cutover.toml");
        std::fs::write(&path, "environment = [").unwrap();
        assert!(matches!(CutoverConfig::load_from_file(&path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_merge_overrides_only_set_values() {
        let mut base = minimal();
        base.bucket = Some("file-bucket".to_string());
        base.poll.interval_secs = Some(30);

        let overrides = CutoverConfig {
            environment: Some("production".to_string()),
            instance_type: Some("ml.c5.xlarge".to_string()),
            ..CutoverConfig::default()
        };
        base.merge(&overrides);

        assert_eq!(base.environment.as_deref(), Some("production"));
        assert_eq!(base.bucket.as_deref(), Some("file-bucket"));
        assert_eq!(base.instance_type.as_deref(), Some("ml.c5.xlarge"));
        assert_eq!(base.poll.interval_secs, Some(30));
    }

    #[test]
    fn test_deploy_config_derives_defaults_from_environment() {
        let deploy = minimal().deploy_config().unwrap();

        assert_eq!(deploy.bucket, "staging-search-relevancy");
        assert_eq!(deploy.endpoint_name, "staging-search-ltr-endpoint");
        assert_eq!(deploy.name_prefix, DEFAULT_NAME_PREFIX);
        assert_eq!(deploy.image, DEFAULT_IMAGE);
        assert_eq!(deploy.instance_count, None);
        assert_eq!(deploy.poll.interval, Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));
        assert_eq!(deploy.poll.max_attempts, Some(DEFAULT_POLL_MAX_ATTEMPTS));
    }

    #[test]
    fn test_deploy_config_requires_environment_and_role() {
        let mut config = minimal();
        config.role_arn = Some("  ".to_string());
        assert!(matches!(config.deploy_config(), Err(ConfigError::InvalidValue(_))));

        let config = CutoverConfig { role_arn: Some("arn".to_string()), ..CutoverConfig::default() };
        let err = config.deploy_config().unwrap_err();
        assert!(err.to_string().contains("environment"));
    }

    #[test]
    fn test_deploy_config_rejects_zero_instances() {
        let mut config = minimal();
        config.instance_count = Some(0);
        assert!(config.deploy_config().is_err());
    }

    #[test]
    fn test_training_client_config_applies_settings() {
        let mut config = minimal();
        config.training = TrainingSettings {
            base_url: Some("http://trainer".to_string()),
            api_token: Some("tok".to_string()),
            poll_interval_secs: Some(1),
            max_wait_secs: None,
            auth_retries: Some(2),
            auth_backoff_secs: Some(0),
        };

        let training = config.training_client_config().unwrap();
        assert_eq!(training.base_url, "http://trainer");
        assert_eq!(training.api_token.as_deref(), Some("tok"));
        assert_eq!(training.poll_interval, Duration::from_secs(1));
        assert_eq!(training.auth_retry.max_retries, 2);
        assert_eq!(training.auth_retry.backoff, Duration::ZERO);
    }

    #[test]
    fn test_service_settings_require_base_url() {
        let settings = ServiceSettings::default();
        assert!(settings.require("platform").is_err());
    }
}
