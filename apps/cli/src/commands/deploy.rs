//! Deploy command implementation.

use anyhow::Context;
use colored::Colorize;
use cutover_core::{CutoverConfig, CutoverController, CutoverReport};
use tokio_util::sync::CancellationToken;

use super::{hosting_platform, object_store};

/// Execute the deploy command.
///
/// Cuts the configured endpoint over to the artifact trained for `model_id`.
pub async fn execute(
    config: &CutoverConfig,
    model_id: &str,
    json_output: bool,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let deploy_config = config.deploy_config().context("Invalid deploy configuration")?;
    let platform = hosting_platform(config)?;
    let store = object_store(config)?;

    let report = match CutoverController::new(&platform, &store, &deploy_config)
        .with_cancellation(cancel)
        .deploy(model_id)
        .await
    {
        Ok(report) => report,
        Err(err) => {
            let aftermath = if err.is_pre_mutation() {
                "no platform resources were changed"
            } else {
                "resources created by this deploy may remain on the platform"
            };
            return Err(anyhow::Error::new(err).context(format!(
                "Deploy of '{}' to {} failed; {aftermath}",
                model_id.trim(),
                deploy_config.endpoint_name
            )));
        }
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &CutoverReport) {
    println!();
    println!("{}", "Deploy complete".bold().green());
    println!("  Endpoint: {} ({})", report.endpoint_name.cyan(), report.action);
    println!("  Artifact: {}", report.artifact.uri().dimmed());
    println!("  Model:    {}", report.model_name.cyan());
    println!("  Config:   {} [{}]", report.config_name.cyan(), report.shape);
    println!("  Checks:   {}", report.status_checks);
    match &report.retired {
        Some(previous) => {
            println!("  Retired:  {}", previous.config_name.dimmed());
            if let Some(model) = &previous.model_name {
                println!("            {}", model.dimmed());
            }
        }
        None => println!("  Retired:  {}", "nothing (first deploy)".dimmed()),
    }
    println!();
}
