//! Observability: logging setup, run spans, and per-run counters.

use std::str::FromStr;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;
use crate::domain::errors::SluiceError;
use crate::domain::ids::{ReapRunId, TriggerRunId};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON lines, for log aggregation.
    Json,
    /// Human-readable, for local runs.
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = SluiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(SluiceError::Config(format!(
                "LOG_FORMAT must be `pretty` or `json`, got `{other}`"
            ))),
        }
    }
}

/// Initializes the global subscriber. Subsequent calls are no-ops.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LogConfig) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        match config.format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json().with_current_span(true))
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_target(false))
                    .init();
            }
        }
    });
}

#[must_use]
pub fn trigger_span(run_id: TriggerRunId, records: usize) -> Span {
    tracing::info_span!("trigger", run_id = %run_id, records = records)
}

#[must_use]
pub fn reap_span(run_id: ReapRunId, cluster: &str) -> Span {
    tracing::info_span!("reap", run_id = %run_id, cluster = cluster)
}

/// What happened to each record of one trigger batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerCounts {
    pub received: usize,
    pub wrong_source: usize,
    pub malformed: usize,
    pub outside_prefix: usize,
    pub ignored: usize,
    pub duplicate: usize,
    pub missing: usize,
    pub already_claimed: usize,
    pub dispatched: usize,
}
