//! TaskOrchestrator port - 実行中タスクの列挙と停止
//!
//! 本番実装は `sluice-aws` の EcsOrchestrator。

use async_trait::async_trait;

use crate::domain::errors::SluiceError;
use crate::domain::task::RunningTaskSnapshot;

#[async_trait]
pub trait TaskOrchestrator: Send + Sync {
    /// cluster 内で RUNNING のタスク ARN を全件返す
    async fn list_running_tasks(&self, cluster: &str) -> Result<Vec<String>, SluiceError>;

    /// ARN から snapshot を取得
    async fn describe_tasks(
        &self,
        cluster: &str,
        task_arns: &[String],
    ) -> Result<Vec<RunningTaskSnapshot>, SluiceError>;

    async fn stop_task(&self, cluster: &str, task_arn: &str, reason: &str)
    -> Result<(), SluiceError>;
}
