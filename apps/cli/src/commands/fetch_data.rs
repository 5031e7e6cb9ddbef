//! Fetch-data command implementation.

use anyhow::Context;
use colored::Colorize;
use cutover_core::CutoverConfig;
use std::path::Path;

use super::training_client;

/// Execute the fetch-data command.
///
/// Writes the latest training data to `output`, or to stdout.
pub async fn execute(config: &CutoverConfig, output: Option<&Path>) -> anyhow::Result<()> {
    let client = training_client(config)?;
    let data = client.latest_data().await.context("Failed to fetch latest training data")?;

    match output {
        Some(path) => {
            std::fs::write(path, &data).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} Wrote {} bytes to {}", "✓".green(), data.len(), path.display());
        }
        None => print!("{data}"),
    }
    Ok(())
}
