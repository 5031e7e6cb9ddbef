//! CLI configuration loading and merging.

use anyhow::Context;
use clap::Args;
use cutover_core::CutoverConfig;
use std::path::Path;

/// Settings that can be given as flags or `CUTOVER_*` environment variables.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Target environment (e.g. staging, production)
    #[arg(short, long, env = "CUTOVER_ENVIRONMENT", global = true)]
    pub environment: Option<String>,

    /// Execution role bound to registered models
    #[arg(long, env = "CUTOVER_ROLE_ARN", global = true)]
    pub role_arn: Option<String>,

    /// Bucket holding trained artifacts
    #[arg(long, env = "CUTOVER_BUCKET", global = true)]
    pub bucket: Option<String>,

    /// Endpoint to deploy to
    #[arg(long, env = "CUTOVER_ENDPOINT_NAME", global = true)]
    pub endpoint_name: Option<String>,

    /// Instance count for the new endpoint configuration
    #[arg(long, env = "CUTOVER_INSTANCE_COUNT", global = true)]
    pub instance_count: Option<u32>,

    /// Instance type for the new endpoint configuration
    #[arg(long, env = "CUTOVER_INSTANCE_TYPE", global = true)]
    pub instance_type: Option<String>,

    /// Hosting platform API base URL
    #[arg(long, env = "CUTOVER_PLATFORM_URL", global = true)]
    pub platform_url: Option<String>,

    #[arg(long, env = "CUTOVER_PLATFORM_TOKEN", global = true, hide_env_values = true)]
    pub platform_token: Option<String>,

    /// Object store API base URL
    #[arg(long, env = "CUTOVER_OBJECT_STORE_URL", global = true)]
    pub object_store_url: Option<String>,

    #[arg(long, env = "CUTOVER_OBJECT_STORE_TOKEN", global = true, hide_env_values = true)]
    pub object_store_token: Option<String>,

    /// Training trigger service base URL
    #[arg(long, env = "CUTOVER_TRAINING_URL", global = true)]
    pub training_url: Option<String>,

    #[arg(long, env = "CUTOVER_TRAINING_TOKEN", global = true, hide_env_values = true)]
    pub training_token: Option<String>,
}

impl ConfigOverrides {
    fn to_config(&self) -> CutoverConfig {
        let mut config = CutoverConfig {
            environment: self.environment.clone(),
            role_arn: self.role_arn.clone(),
            bucket: self.bucket.clone(),
            endpoint_name: self.endpoint_name.clone(),
            instance_count: self.instance_count,
            instance_type: self.instance_type.clone(),
            ..CutoverConfig::default()
        };
        config.platform.base_url.clone_from(&self.platform_url);
        config.platform.api_token.clone_from(&self.platform_token);
        config.object_store.base_url.clone_from(&self.object_store_url);
        config.object_store.api_token.clone_from(&self.object_store_token);
        config.training.base_url.clone_from(&self.training_url);
        config.training.api_token.clone_from(&self.training_token);
        config
    }
}

/// Load and merge CLI configuration.
///
/// Configuration precedence:
/// 1. CLI arguments and `CUTOVER_*` environment variables (handled by clap)
/// 2. `--config` file, or ./cutover.toml
/// 3. Defaults
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> anyhow::Result<CutoverConfig> {
    let mut config = CutoverConfig::discover_and_load(path).context("Failed to load configuration")?;
    config.merge(&overrides.to_config());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_file_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cutover.toml");
        std::fs::write(&path, "environment = \"staging\"\nbucket = \"file-bucket\"\n").unwrap();

        let overrides = ConfigOverrides {
            environment: Some("production".to_string()),
            platform_url: Some("http://platform.local".to_string()),
            ..ConfigOverrides::default()
        };
        let config = load_config(Some(&path), &overrides).unwrap();

        assert_eq!(config.environment.as_deref(), Some("production"));
        assert_eq!(config.bucket.as_deref(), Some("file-bucket"));
        assert_eq!(config.platform.base_url.as_deref(), Some("http://platform.local"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = load_config(Some(&temp.path().join("missing.toml")), &ConfigOverrides::default());
        assert!(result.is_err());
    }
}
