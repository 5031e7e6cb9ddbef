//! Cutover CLI - deploys trained ranking models to a managed inference endpoint.
//!
//! This CLI provides a `cutover` command that triggers training, fetches
//! training data, and swaps an endpoint over to a newly trained model.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use commands::{config as config_cmd, deploy, fetch_data, status, train};
use config::ConfigOverrides;

/// Cutover CLI - zero-downtime model deploys
///
/// Registers a trained model, points the endpoint at a fresh configuration
/// and retires the previous one once the endpoint is back in service.
#[derive(Parser, Debug)]
#[command(name = "cutover", author, version, about = "Cutover - zero-downtime model deploys")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file (defaults to ./cutover.toml if present)
    #[arg(short, long, env = "CUTOVER_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy a trained model to the endpoint
    ///
    /// Resolves the artifact for MODEL_ID, registers it, cuts the endpoint
    /// over to a new configuration and removes the previous model.
    Deploy {
        /// Identifier of the training run whose artifact to deploy
        #[arg(env = "CUTOVER_MODEL_ID")]
        model_id: String,

        /// Output the deploy report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Trigger a training run and wait for it to finish
    Train {
        /// Return as soon as the run has been triggered
        #[arg(long, conflicts_with = "deploy")]
        no_wait: bool,

        /// Deploy the trained model once training finishes
        #[arg(long)]
        deploy: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download the latest training data
    FetchData {
        /// Write the data to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show whether the endpoint is serving
    ///
    /// Exits non-zero unless the endpoint is healthy.
    Status {
        /// Output status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(config_cmd::ConfigCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let load_config = || config::load_config(args.config.as_deref(), &args.overrides);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current request");
            on_interrupt.cancel();
        }
    });

    match args.command {
        Command::Deploy { model_id, json } => {
            deploy::execute(&load_config()?, &model_id, json, cancel).await?;
        }
        Command::Train { no_wait, deploy, json } => {
            train::execute(&load_config()?, no_wait, deploy, json, cancel).await?;
        }
        Command::FetchData { output } => {
            fetch_data::execute(&load_config()?, output.as_deref()).await?;
        }
        Command::Status { json } => {
            status::execute(&load_config()?, json).await?;
        }
        Command::Config(cmd) => {
            config_cmd::execute(cmd, args.config.as_deref(), &args.overrides)?;
        }
    }

    Ok(())
}
