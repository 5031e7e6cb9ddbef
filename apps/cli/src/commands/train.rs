//! Train command implementation.

use anyhow::Context;
use colored::Colorize;
use cutover_core::CutoverConfig;
use cutover_training::TriggerOutcome;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{deploy, training_client};

/// Execute the train command.
///
/// Triggers a training run and, unless `no_wait`, waits for the trained model
/// identifier. With `deploy_after`, the trained model is deployed right away.
pub async fn execute(
    config: &CutoverConfig,
    no_wait: bool,
    deploy_after: bool,
    json_output: bool,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let client = training_client(config)?;

    let outcome = client.trigger().await.context("Failed to trigger training")?;
    if no_wait {
        if json_output {
            let out = json!({ "triggered": true, "already_running": outcome == TriggerOutcome::AlreadyRunning });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            let message = match outcome {
                TriggerOutcome::Accepted => "Training started",
                TriggerOutcome::AlreadyRunning => "Training already in progress",
            };
            println!("{} {}", "✓".green(), message);
        }
        return Ok(());
    }

    let model_id = client.wait_for_completion(&cancel).await.context("Training did not complete")?;
    let model_id = model_id.trim().to_string();
    info!(model_id = %model_id, "Training complete");

    if deploy_after {
        return deploy::execute(config, &model_id, json_output, cancel).await;
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&json!({ "model_id": model_id }))?);
    } else {
        println!("{} Trained model: {}", "✓".green(), model_id.cyan());
        println!("  {}", format!("Deploy it with: cutover deploy {model_id}").dimmed());
    }
    Ok(())
}
