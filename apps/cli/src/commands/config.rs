//! Config command implementation.

use anyhow::Context;
use clap::Subcommand;
use colored::Colorize;
use cutover_core::CutoverConfig;
use std::path::Path;

use crate::config::{load_config, ConfigOverrides};

/// Starter configuration written by `cutover config init`.
const TEMPLATE: &str = r#"# Cutover configuration
environment = "staging"
role_arn = "arn:aws:iam::000000000000:role/deploy"
# bucket = "staging-search-relevancy"
# endpoint_name = "staging-search-ltr-endpoint"
# instance_count = 1
# instance_type = "ml.t2.medium"

[poll]
interval_secs = 10
max_attempts = 360
timeout_secs = 3600

[platform]
base_url = "http://localhost:8080"

[object_store]
base_url = "http://localhost:8081"

[training]
base_url = "http://localhost:8082"
"#;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the merged configuration
    Show {
        /// Print the resolved deploy settings instead of the raw file values
        #[arg(long)]
        resolved: bool,
    },

    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Execute a config subcommand.
///
/// `path` is the `--config` file: `show` reads it, `init` writes it.
pub fn execute(command: ConfigCommand, path: Option<&Path>, overrides: &ConfigOverrides) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Show { resolved } => show(&load_config(path, overrides)?, resolved),
        ConfigCommand::Init { force } => init(path, force),
    }
}

fn show(config: &CutoverConfig, resolved: bool) -> anyhow::Result<()> {
    if resolved {
        let deploy = config.deploy_config().context("Invalid deploy configuration")?;
        println!("{}", "Deploy settings".bold().cyan());
        println!("  Environment: {}", deploy.environment);
        println!("  Endpoint:    {}", deploy.endpoint_name.cyan());
        println!("  Bucket:      {}", deploy.bucket);
        println!("  Role:        {}", deploy.role_arn);
        println!("  Image:       {}", deploy.image.dimmed());
        println!("  Name prefix: {}", deploy.name_prefix);
        println!(
            "  Shape:       {} x {}",
            deploy.instance_count.map_or_else(|| "(previous)".to_string(), |c| c.to_string()),
            deploy.instance_type.as_deref().unwrap_or("(previous)")
        );
        println!("  Poll:        every {:?}", deploy.poll.interval);
    } else {
        print!("{}", toml::to_string_pretty(&redacted(config))?);
    }
    Ok(())
}

/// Write the starter configuration to `path` or ./cutover.toml.
fn init(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let default_path = CutoverConfig::default_local_path();
    let path = path.unwrap_or(&default_path);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(path, TEMPLATE).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}

fn redacted(config: &CutoverConfig) -> CutoverConfig {
    let mut config = config.clone();
    for token in [
        &mut config.platform.api_token,
        &mut config.object_store.api_token,
        &mut config.training.api_token,
    ] {
        if token.is_some() {
            *token = Some("********".to_string());
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses() {
        let config: CutoverConfig = toml::from_str(TEMPLATE).unwrap();
        assert!(config.deploy_config().is_ok());
    }

    #[test]
    fn test_tokens_are_redacted() {
        let mut config = CutoverConfig::default();
        config.training.api_token = Some("secret".to_string());
        let shown = redacted(&config);
        assert_eq!(shown.training.api_token.as_deref(), Some("********"));
        assert!(shown.platform.api_token.is_none());
    }
}
