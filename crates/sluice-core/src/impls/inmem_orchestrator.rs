//! InMemoryOrchestrator - 台本どおりに動く開発用 orchestrator
//!
//! stop_task されたタスクは RUNNING 一覧から消えます。

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::lock;
use crate::domain::errors::SluiceError;
use crate::domain::task::RunningTaskSnapshot;
use crate::ports::TaskOrchestrator;

#[derive(Default)]
pub struct InMemoryOrchestrator {
    running: Mutex<Vec<RunningTaskSnapshot>>,
    /// (task_arn, reason)
    stopped: Mutex<Vec<(String, String)>>,
    failing_stops: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
    list_calls: AtomicUsize,
}

impl InMemoryOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&self, task: RunningTaskSnapshot) {
        lock(&self.running).push(task);
    }

    pub fn stopped(&self) -> Vec<(String, String)> {
        lock(&self.stopped).clone()
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::Relaxed);
    }

    pub fn fail_stop_for(&self, task_arn: impl Into<String>) {
        lock(&self.failing_stops).insert(task_arn.into());
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TaskOrchestrator for InMemoryOrchestrator {
    async fn list_running_tasks(&self, cluster: &str) -> Result<Vec<String>, SluiceError> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_listing.load(Ordering::Relaxed) {
            return Err(SluiceError::Orchestrator(format!(
                "cluster {cluster} not found"
            )));
        }
        Ok(lock(&self.running)
            .iter()
            .map(|task| task.task_arn.clone())
            .collect())
    }

    async fn describe_tasks(
        &self,
        _cluster: &str,
        task_arns: &[String],
    ) -> Result<Vec<RunningTaskSnapshot>, SluiceError> {
        Ok(lock(&self.running)
            .iter()
            .filter(|task| task_arns.contains(&task.task_arn))
            .cloned()
            .collect())
    }

    async fn stop_task(
        &self,
        _cluster: &str,
        task_arn: &str,
        reason: &str,
    ) -> Result<(), SluiceError> {
        if lock(&self.failing_stops).contains(task_arn) {
            return Err(SluiceError::Orchestrator(format!(
                "stop rejected for {task_arn}"
            )));
        }
        lock(&self.running).retain(|task| task.task_arn != task_arn);
        lock(&self.stopped).push((task_arn.to_string(), reason.to_string()));
        Ok(())
    }
}
