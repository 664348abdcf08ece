//! EcsOrchestrator - ECS の RUNNING タスクを列挙・記述・停止する
//!
//! - ListTasks は next_token が尽きるまでページングする
//! - DescribeTasks は 1 回 100 件までなので分割して呼ぶ

use async_trait::async_trait;
use aws_sdk_ecs::Client;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::{DesiredStatus, Task};
use chrono::{DateTime, Utc};

use sluice_core::domain::{ContainerStatus, RunningTaskSnapshot, SluiceError};
use sluice_core::ports::TaskOrchestrator;

/// DescribeTasks の 1 回あたりの上限
pub const DESCRIBE_BATCH_SIZE: usize = 100;

#[derive(Clone)]
pub struct EcsOrchestrator {
    client: Client,
}

impl EcsOrchestrator {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self::from_client(Client::new(config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_chrono(at: &aws_sdk_ecs::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(at.secs(), at.subsec_nanos())
}

/// task ARN のないエントリは捨てる
pub(crate) fn snapshot_from_task(task: &Task) -> Option<RunningTaskSnapshot> {
    let task_arn = task.task_arn()?.to_string();
    Some(RunningTaskSnapshot {
        task_arn,
        created_at: task.created_at().and_then(to_chrono),
        containers: task
            .containers()
            .iter()
            .map(|c| ContainerStatus {
                name: c.name().map(str::to_string),
                last_status: c.last_status().map(str::to_string),
            })
            .collect(),
    })
}

#[async_trait]
impl TaskOrchestrator for EcsOrchestrator {
    async fn list_running_tasks(&self, cluster: &str) -> Result<Vec<String>, SluiceError> {
        let mut arns = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .client
                .list_tasks()
                .cluster(cluster)
                .desired_status(DesiredStatus::Running)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| {
                    SluiceError::Orchestrator(format!("ListTasks {cluster}: {}", DisplayErrorContext(&e)))
                })?;

            arns.extend(page.task_arns().iter().cloned());
            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(arns)
    }

    async fn describe_tasks(
        &self,
        cluster: &str,
        task_arns: &[String],
    ) -> Result<Vec<RunningTaskSnapshot>, SluiceError> {
        let mut snapshots = Vec::with_capacity(task_arns.len());
        for chunk in task_arns.chunks(DESCRIBE_BATCH_SIZE) {
            let output = self
                .client
                .describe_tasks()
                .cluster(cluster)
                .set_tasks(Some(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| {
                    SluiceError::Orchestrator(format!(
                        "DescribeTasks {cluster}: {}",
                        DisplayErrorContext(&e)
                    ))
                })?;

            for failure in output.failures() {
                tracing::warn!(
                    task_arn = failure.arn().unwrap_or("unknown"),
                    reason = failure.reason().unwrap_or("unknown"),
                    "describe failure"
                );
            }
            snapshots.extend(output.tasks().iter().filter_map(snapshot_from_task));
        }
        Ok(snapshots)
    }

    async fn stop_task(
        &self,
        cluster: &str,
        task_arn: &str,
        reason: &str,
    ) -> Result<(), SluiceError> {
        self.client
            .stop_task()
            .cluster(cluster)
            .task(task_arn)
            .reason(reason)
            .send()
            .await
            .map_err(|e| {
                SluiceError::Orchestrator(format!("StopTask {task_arn}: {}", DisplayErrorContext(&e)))
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ecs::primitives::DateTime as AwsDateTime;
    use aws_sdk_ecs::types::Container;

    #[test]
    fn task_converts_to_snapshot() {
        let task = Task::builder()
            .task_arn("arn:aws:ecs:ap-northeast-1:123456789012:task/agents/abc")
            .created_at(AwsDateTime::from_secs(1_700_000_000))
            .containers(Container::builder().name("agent").last_status("RUNNING").build())
            .containers(Container::builder().build())
            .build();

        let snapshot = snapshot_from_task(&task).unwrap();
        assert_eq!(snapshot.task_id(), "abc");
        assert_eq!(
            snapshot.created_at,
            DateTime::from_timestamp(1_700_000_000, 0)
        );
        assert_eq!(snapshot.container_summary(), "agent:RUNNING, unknown:unknown");
    }

    #[test]
    fn missing_created_at_is_kept_as_none() {
        let task = Task::builder().task_arn("arn:task/x").build();
        assert_eq!(snapshot_from_task(&task).unwrap().created_at, None);
    }

    #[test]
    fn task_without_arn_is_dropped() {
        assert!(snapshot_from_task(&Task::builder().build()).is_none());
    }
}
