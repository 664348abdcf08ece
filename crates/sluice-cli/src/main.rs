//! sluice - invocation host
//!
//! Each run handles one invocation and writes the response JSON to stdout.
//! The exit code is 1 unless the response status is 200.
//!
//! ```text
//! sluice trigger --event notification.json
//! cat notification.json | sluice trigger
//! sluice reap --dry-run
//! sluice reap --every 300
//! ```

use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use sluice_aws::{
    DynamoIdempotencyStore, EcsOrchestrator, EventBridgeBus, S3ObjectStore, SdkConfig,
};
use sluice_core::app::AppBuilder;
use sluice_core::config::{Config, LogConfig};
use sluice_core::domain::InvocationResponse;
use sluice_core::observability::init_logging;

#[derive(Debug, Parser)]
#[command(name = "sluice", version, about = "S3 change notifications to container launches")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process one S3 change-notification batch.
    Trigger {
        /// Notification JSON file, or `-` for stdin.
        #[arg(long, default_value = "-")]
        event: String,
    },
    /// Stop tasks that have been running longer than TASK_TIMEOUT_MINUTES.
    Reap {
        /// Log what would be stopped without stopping anything.
        #[arg(long)]
        dry_run: bool,

        /// Keep running and reap every SECS seconds until Ctrl-C.
        #[arg(long, value_name = "SECS")]
        every: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            init_logging(&LogConfig::default());
            tracing::error!(error = %err, "configuration rejected");
            return emit(&InvocationResponse::bad_request(err.to_string()));
        }
    };
    init_logging(&config.log);

    let sdk = sluice_aws::load_sdk_config().await;
    match cli.command {
        Command::Trigger { event } => trigger(config, &sdk, &event).await,
        Command::Reap { dry_run, every } => reap(config, &sdk, dry_run, every).await,
    }
}

async fn trigger(config: Config, sdk: &SdkConfig, event: &str) -> Result<ExitCode> {
    let raw = read_event(event)?;
    let payload: Value = match serde_json::from_str(&raw) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(error = %err, "trigger payload is not valid JSON");
            return emit(&InvocationResponse::bad_request(format!(
                "Trigger payload is not valid JSON: {err}"
            )));
        }
    };

    let mut builder = AppBuilder::new(config)
        .object_store(Arc::new(S3ObjectStore::new(sdk)))
        .event_bus(Arc::new(EventBridgeBus::new(sdk)));
    if let Some(table) = builder.config().idempotency.table_name.clone() {
        builder = builder.idempotency(Arc::new(DynamoIdempotencyStore::new(sdk, table)));
    }

    let pipeline = match builder.build_trigger() {
        Ok(pipeline) => pipeline,
        Err(err) => {
            tracing::error!(error = %err, "trigger pipeline not built");
            return emit(&err.to_response());
        }
    };
    emit(&pipeline.handle_payload(payload).await)
}

async fn reap(
    mut config: Config,
    sdk: &SdkConfig,
    dry_run: bool,
    every: Option<u64>,
) -> Result<ExitCode> {
    config.reaper.dry_run |= dry_run;

    let reaper = match AppBuilder::new(config)
        .orchestrator(Arc::new(EcsOrchestrator::new(sdk)))
        .build_reaper()
    {
        Ok(reaper) => reaper,
        Err(err) => {
            tracing::error!(error = %err, "reaper not built");
            return emit(&err.to_response());
        }
    };

    match every {
        Some(secs) => {
            let interval = Duration::from_secs(secs.max(1));
            reaper
                .run_every(interval, async {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %err, "failed to listen for ctrl-c");
                    }
                })
                .await;
            Ok(ExitCode::SUCCESS)
        }
        None => emit(&reaper.run_once().await.into_response()),
    }
}

fn read_event(source: &str) -> Result<String> {
    if source == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("reading notification from stdin")?;
        Ok(raw)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading notification from {source}"))
    }
}

fn emit(response: &InvocationResponse) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
