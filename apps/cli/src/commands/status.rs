//! Status command implementation.

use colored::Colorize;
use cutover_core::{check_endpoint_health, CutoverConfig, EndpointHealth};
use serde_json::json;

use super::hosting_platform;

/// Execute the status command.
///
/// Shows the endpoint's health and fails unless it is serving.
pub async fn execute(config: &CutoverConfig, json_output: bool) -> anyhow::Result<()> {
    let endpoint = config.endpoint_name()?;
    let platform = hosting_platform(config)?;
    let health = check_endpoint_health(&platform, &endpoint).await?;

    if json_output {
        let out = json!({
            "endpoint": endpoint,
            "healthy": health.is_healthy(),
            "status": health,
            "message": health.to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let marker = match health {
            EndpointHealth::Healthy { .. } => "✓".green(),
            EndpointHealth::Unhealthy { .. } => "✗".red(),
            EndpointHealth::Missing => "?".yellow(),
        };
        println!("{} {} {}", marker, endpoint.bold(), health);
    }

    if !health.is_healthy() {
        anyhow::bail!("Endpoint {endpoint} is not healthy");
    }
    Ok(())
}
