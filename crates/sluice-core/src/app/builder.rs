//! AppBuilder - ports と設定から TriggerPipeline / TaskReaper を組み立てる
//!
//! # Fail-fast 設計
//! - 必要な port が足りなければ BuildError::MissingPorts
//! - launcher が必要とする設定が空なら BuildError::MissingConfig
//! - どちらも invocation の応答では 400 になる

use std::sync::Arc;
use std::time::Duration;

use crate::app::dispatcher::Dispatcher;
use crate::app::reaper_loop::TaskReaper;
use crate::app::trigger::TriggerPipeline;
use crate::app::verifier::ExistenceVerifier;
use crate::config::Config;
use crate::domain::response::InvocationResponse;
use crate::impls::NoopIdempotencyStore;
use crate::ports::{
    Clock, EventBus, IdGenerator, IdempotencyStore, ObjectStore, SystemClock, TaskOrchestrator,
    UlidGenerator,
};

/// # 使用例
/// ```ignore
/// let pipeline = AppBuilder::new(config)
///     .object_store(Arc::new(S3ObjectStore::new(&sdk_config)))
///     .event_bus(Arc::new(EventBridgeBus::new(&sdk_config)))
///     .build_trigger()?;
/// ```
pub struct AppBuilder {
    config: Config,
    object_store: Option<Arc<dyn ObjectStore>>,
    event_bus: Option<Arc<dyn EventBus>>,
    orchestrator: Option<Arc<dyn TaskOrchestrator>>,
    idempotency: Option<Arc<dyn IdempotencyStore>>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing ports: {0:?}. These must be provided before building.")]
    MissingPorts(Vec<&'static str>),

    #[error("Missing required configuration: {0:?}")]
    MissingConfig(Vec<&'static str>),
}

impl BuildError {
    pub fn to_response(&self) -> InvocationResponse {
        InvocationResponse::bad_request(self.to_string())
    }
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            object_store: None,
            event_bus: None,
            orchestrator: None,
            idempotency: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    pub fn event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn orchestrator(mut self, orchestrator: Arc<dyn TaskOrchestrator>) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    /// 省略時は NoopIdempotencyStore（invocation 内の dedup のみ）
    pub fn idempotency(mut self, store: Arc<dyn IdempotencyStore>) -> Self {
        self.idempotency = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn ids(&self) -> Arc<dyn IdGenerator> {
        Arc::new(UlidGenerator::new(self.clock.clone()))
    }

    pub fn build_trigger(&self) -> Result<TriggerPipeline, BuildError> {
        let mut missing_ports = Vec::new();
        if self.object_store.is_none() {
            missing_ports.push("object_store");
        }
        if self.event_bus.is_none() {
            missing_ports.push("event_bus");
        }
        let (Some(store), Some(bus)) = (self.object_store.clone(), self.event_bus.clone()) else {
            return Err(BuildError::MissingPorts(missing_ports));
        };

        let missing_config = self.config.watch.missing_fields();
        if !missing_config.is_empty() {
            return Err(BuildError::MissingConfig(missing_config));
        }

        let watch = Arc::new(self.config.watch.clone());
        let idempotency = self
            .idempotency
            .clone()
            .unwrap_or_else(|| Arc::new(NoopIdempotencyStore));
        Ok(TriggerPipeline::new(
            watch.clone(),
            ExistenceVerifier::new(store),
            Dispatcher::new(bus, watch),
            idempotency,
            Duration::from_secs(self.config.idempotency.ttl_seconds),
            self.ids(),
        ))
    }

    pub fn build_reaper(&self) -> Result<TaskReaper, BuildError> {
        let Some(orchestrator) = self.orchestrator.clone() else {
            return Err(BuildError::MissingPorts(vec!["orchestrator"]));
        };

        let reaper = &self.config.reaper;
        let mut missing_config = Vec::new();
        if reaper.cluster_name.trim().is_empty() {
            missing_config.push("cluster_name");
        }
        if reaper.task_timeout_minutes == 0 {
            missing_config.push("task_timeout_minutes");
        }
        if !missing_config.is_empty() {
            return Err(BuildError::MissingConfig(missing_config));
        }

        Ok(TaskReaper::new(
            orchestrator,
            self.clock.clone(),
            self.ids(),
            reaper.clone(),
        ))
    }
}
