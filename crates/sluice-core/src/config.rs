//! Configuration.
//!
//! All settings come from environment variables, read once at startup.
//! Every variable is optional; blank values count as unset and fall back to
//! the default. Values that are present but unparsable are errors.

use std::collections::BTreeSet;

use crate::domain::errors::SluiceError;
use crate::observability::LogFormat;

pub const DEFAULT_SOURCE_BUCKET: &str = "tccw-work-pipiline-entry";
pub const DEFAULT_SOURCE_PREFIX: &str = "knowledge_base/";
pub const DEFAULT_IGNORED_PREFIXES: &str = ".write/";
pub const DEFAULT_CLUSTER_NAME: &str = "tccw-knowledge-doc-agent-cluster";
pub const DEFAULT_TASK_DEFINITION: &str = "tccw-knowledge-doc-agent-task";
pub const DEFAULT_CONTAINER_NAME: &str = "tccw-knowledge-doc-agent-container";
pub const DEFAULT_EVENT_BUS_NAME: &str = "default";
pub const DEFAULT_EVENT_SOURCE: &str = "tccw.knowledge.doc.agent";
pub const DEFAULT_EVENT_DETAIL_TYPE: &str = "S3ObjectCreated";
pub const DEFAULT_TASK_TIMEOUT_MINUTES: u64 = 20;
pub const DEFAULT_DEDUP_TTL_SECONDS: u64 = 300;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Trigger path settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub source_bucket: String,
    pub source_prefix: String,
    pub ignored_prefixes: BTreeSet<String>,
    pub cluster_name: String,
    pub task_definition_name: String,
    pub container_name: String,
    pub event_bus_name: String,
    pub event_source: String,
    pub event_detail_type: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            source_bucket: DEFAULT_SOURCE_BUCKET.to_string(),
            source_prefix: DEFAULT_SOURCE_PREFIX.to_string(),
            ignored_prefixes: parse_prefix_list(DEFAULT_IGNORED_PREFIXES),
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            task_definition_name: DEFAULT_TASK_DEFINITION.to_string(),
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            event_bus_name: DEFAULT_EVENT_BUS_NAME.to_string(),
            event_source: DEFAULT_EVENT_SOURCE.to_string(),
            event_detail_type: DEFAULT_EVENT_DETAIL_TYPE.to_string(),
        }
    }
}

impl WatchConfig {
    /// Names of the dispatch fields that are blank. The launcher cannot start
    /// a task without them.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("cluster_name", &self.cluster_name),
            ("task_definition_name", &self.task_definition_name),
            ("container_name", &self.container_name),
            ("event_bus_name", &self.event_bus_name),
            ("event_source", &self.event_source),
            ("event_detail_type", &self.event_detail_type),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Reaper settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaperConfig {
    pub cluster_name: String,
    pub task_timeout_minutes: u64,
    pub dry_run: bool,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            task_timeout_minutes: DEFAULT_TASK_TIMEOUT_MINUTES,
            dry_run: false,
        }
    }
}

/// Cross-invocation dedup. Disabled unless a table name is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyConfig {
    pub table_name: Option<String>,
    pub ttl_seconds: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            table_name: None,
            ttl_seconds: DEFAULT_DEDUP_TTL_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `sluice_core=debug`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub watch: WatchConfig,
    pub reaper: ReaperConfig,
    pub idempotency: IdempotencyConfig,
    pub log: LogConfig,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, SluiceError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SluiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let mut config = Self::default();

        if let Some(bucket) = env.string("SOURCE_BUCKET_NAME") {
            config.watch.source_bucket = bucket;
        }
        if let Some(prefix) = env.string("SOURCE_BUCKET_PREFIX") {
            config.watch.source_prefix = prefix;
        }
        if let Some(prefixes) = env.string("IGNORED_PREFIXES") {
            config.watch.ignored_prefixes = parse_prefix_list(&prefixes);
        }
        if let Some(cluster) = env.string("ECS_CLUSTER_NAME") {
            config.watch.cluster_name = cluster.clone();
            config.reaper.cluster_name = cluster;
        }
        if let Some(task) = env.string("ECS_TASK_NAME") {
            config.watch.task_definition_name = task;
        }
        if let Some(container) = env.string("ECS_CONTAINER_NAME") {
            config.watch.container_name = container;
        }
        if let Some(bus) = env.string("EVENT_BUS_NAME") {
            config.watch.event_bus_name = bus;
        }
        if let Some(source) = env.string("EVENT_SOURCE") {
            config.watch.event_source = source;
        }
        if let Some(detail_type) = env.string("EVENT_DETAIL_TYPE") {
            config.watch.event_detail_type = detail_type;
        }

        if let Some(timeout) = env.u64("TASK_TIMEOUT_MINUTES")? {
            if timeout == 0 {
                return Err(SluiceError::Config(
                    "TASK_TIMEOUT_MINUTES must be greater than zero".to_string(),
                ));
            }
            config.reaper.task_timeout_minutes = timeout;
        }
        if let Some(dry_run) = env.bool("DRY_RUN")? {
            config.reaper.dry_run = dry_run;
        }

        config.idempotency.table_name = env.string("DEDUP_TABLE_NAME");
        if let Some(ttl) = env.u64("DEDUP_TTL_SECONDS")? {
            config.idempotency.ttl_seconds = ttl;
        }

        if let Some(level) = env.string("APP_LOG_LEVEL") {
            config.log.level = level;
        }
        if let Some(format) = env.string("LOG_FORMAT") {
            config.log.format = format.parse()?;
        }

        Ok(config)
    }
}

/// Splits a comma-separated prefix list, dropping blank entries.
pub fn parse_prefix_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_string)
        .collect()
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn u64(&self, name: &str) -> Result<Option<u64>, SluiceError> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        v.parse::<u64>()
            .map(Some)
            .map_err(|e| SluiceError::Config(format!("{name} must be a u64: {e}")))
    }

    fn bool(&self, name: &str) -> Result<Option<bool>, SluiceError> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Ok(Some(true)),
            "false" | "0" | "no" | "n" => Ok(Some(false)),
            _ => Err(SluiceError::Config(format!(
                "{name} must be a boolean (true/false/1/0)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, SluiceError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.watch.source_prefix, "knowledge_base/");
        assert_eq!(
            config.watch.ignored_prefixes,
            BTreeSet::from([".write/".to_string()])
        );
        assert_eq!(config.reaper.task_timeout_minutes, 20);
        assert!(!config.reaper.dry_run);
        assert_eq!(config.idempotency.table_name, None);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn overrides_are_read() {
        let config = load(&[
            ("SOURCE_BUCKET_PREFIX", "inbox/"),
            ("IGNORED_PREFIXES", "inbox/.write/, tmp/ ,,"),
            ("ECS_CLUSTER_NAME", "agents"),
            ("TASK_TIMEOUT_MINUTES", "45"),
            ("DRY_RUN", "TRUE"),
            ("DEDUP_TABLE_NAME", "sluice-claims"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.watch.source_prefix, "inbox/");
        assert_eq!(
            config.watch.ignored_prefixes,
            BTreeSet::from(["inbox/.write/".to_string(), "tmp/".to_string()])
        );
        assert_eq!(config.watch.cluster_name, "agents");
        assert_eq!(config.reaper.cluster_name, "agents");
        assert_eq!(config.reaper.task_timeout_minutes, 45);
        assert!(config.reaper.dry_run);
        assert_eq!(config.idempotency.table_name.as_deref(), Some("sluice-claims"));
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[("EVENT_BUS_NAME", "   ")]).unwrap();
        assert_eq!(config.watch.event_bus_name, "default");
    }

    #[rstest]
    #[case::not_a_number("TASK_TIMEOUT_MINUTES", "twenty")]
    #[case::zero_timeout("TASK_TIMEOUT_MINUTES", "0")]
    #[case::bad_bool("DRY_RUN", "maybe")]
    #[case::bad_ttl("DEDUP_TTL_SECONDS", "-5")]
    #[case::bad_format("LOG_FORMAT", "xml")]
    fn unparsable_values_are_rejected(#[case] name: &str, #[case] value: &str) {
        let err = load(&[(name, value)]).unwrap_err();
        assert!(matches!(err, SluiceError::Config(_)));
    }

    #[test]
    fn missing_fields_lists_blank_dispatch_settings() {
        let config = WatchConfig {
            cluster_name: String::new(),
            event_source: " ".into(),
            ..WatchConfig::default()
        };
        assert_eq!(config.missing_fields(), vec!["cluster_name", "event_source"]);
        assert!(WatchConfig::default().missing_fields().is_empty());
    }
}
