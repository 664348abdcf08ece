//! TaskReaper - 実行時間の上限を超えたタスクを停止する
//!
//! # フロー（1 回の run）
//! 1. cluster 内の RUNNING タスクを列挙（0 件なら終了）
//! 2. describe で createdAt とコンテナ状態を取得
//! 3. createdAt がないタスクは評価せず skip（データ欠損では絶対に止めない）
//! 4. 経過分数 > 閾値なら停止。dry-run ならログだけ出して「停止扱い」で数える
//! 5. list / describe の失敗は run 全体で捕捉して 0 件停止として報告
//!    個別タスクの停止失敗はそのタスクだけ失敗扱いにして続行
//!
//! run をまたいだ状態は持ちません。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::Instrument;

use crate::config::ReaperConfig;
use crate::domain::decision::{TerminationDecider, TerminationDecision, TimeoutDecider};
use crate::domain::errors::SluiceError;
use crate::domain::ids::ReapRunId;
use crate::domain::response::InvocationResponse;
use crate::domain::task::RunningTaskSnapshot;
use crate::observability::reap_span;
use crate::ports::{Clock, IdGenerator, TaskOrchestrator};

#[derive(Debug, Clone, Serialize)]
pub struct ReapReport {
    pub run_id: ReapRunId,
    pub cluster: String,
    pub dry_run: bool,
    /// 経過時間を計算できたタスク
    pub evaluated: usize,
    /// 停止した（dry-run なら停止したはずの）タスク
    pub terminated_count: usize,
    /// 開始時刻のないタスク
    pub skipped: usize,
    /// 停止呼び出しが失敗したタスク
    pub failed: usize,
    pub decisions: Vec<TerminationDecision>,
    /// list / describe が失敗して何も評価しなかったときに入る
    pub error: Option<String>,
}

impl ReapReport {
    fn new(run_id: ReapRunId, config: &ReaperConfig) -> Self {
        Self {
            run_id,
            cluster: config.cluster_name.clone(),
            dry_run: config.dry_run,
            evaluated: 0,
            terminated_count: 0,
            skipped: 0,
            failed: 0,
            decisions: Vec::new(),
            error: None,
        }
    }

    pub fn into_response(self) -> InvocationResponse {
        let message = format!(
            "Task cleanup completed. Terminated {} tasks.",
            self.terminated_count
        );
        let mut response = InvocationResponse::ok(message)
            .with("terminated_count", self.terminated_count)
            .with("evaluated", self.evaluated)
            .with("skipped", self.skipped)
            .with("failed", self.failed)
            .with("dry_run", self.dry_run)
            .with("run_id", self.run_id.to_string());
        if let Some(error) = self.error {
            response = response.with("error", error);
        }
        response
    }
}

pub struct TaskReaper {
    orchestrator: Arc<dyn TaskOrchestrator>,
    decider: Box<dyn TerminationDecider>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    config: ReaperConfig,
}

impl TaskReaper {
    pub fn new(
        orchestrator: Arc<dyn TaskOrchestrator>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: ReaperConfig,
    ) -> Self {
        let decider = Box::new(TimeoutDecider::new(config.task_timeout_minutes, config.dry_run));
        Self {
            orchestrator,
            decider,
            clock,
            ids,
            config,
        }
    }

    pub fn config(&self) -> &ReaperConfig {
        &self.config
    }

    pub async fn run_once(&self) -> ReapReport {
        let run_id = self.ids.reap_run_id();
        let span = reap_span(run_id, &self.config.cluster_name);
        self.reap(run_id).instrument(span).await
    }

    /// `interval` ごとに run_once を繰り返す。`shutdown` が完了したら抜ける。
    ///
    /// 最初の run は即座に行う。
    pub async fn run_every<F>(&self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("reaper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.run_once().await;
                    tracing::info!(
                        terminated = report.terminated_count,
                        evaluated = report.evaluated,
                        "reaper run finished"
                    );
                }
            }
        }
    }

    async fn reap(&self, run_id: ReapRunId) -> ReapReport {
        let mut report = ReapReport::new(run_id, &self.config);
        tracing::info!(
            cluster = %self.config.cluster_name,
            timeout_minutes = self.config.task_timeout_minutes,
            dry_run = self.config.dry_run,
            "checking for long-running tasks"
        );

        let tasks = match self.snapshot().await {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::error!(
                    cluster = %self.config.cluster_name,
                    error = %err,
                    "error retrieving tasks"
                );
                report.error = Some(err.to_string());
                return report;
            }
        };

        let now = self.clock.now();
        for task in &tasks {
            let Some(decision) = self.decider.decide(task, now) else {
                report.skipped += 1;
                tracing::warn!(
                    task_id = task.task_id(),
                    "task has no start time information, skipping"
                );
                continue;
            };
            report.evaluated += 1;

            if decision.will_terminate {
                if self.terminate(task, &decision).await {
                    report.terminated_count += 1;
                } else {
                    report.failed += 1;
                }
            } else {
                tracing::info!(
                    task_id = task.task_id(),
                    elapsed_minutes = %format!("{:.2}", decision.elapsed_minutes),
                    "task within threshold"
                );
            }
            report.decisions.push(decision);
        }

        tracing::info!(
            terminated = report.terminated_count,
            evaluated = report.evaluated,
            skipped = report.skipped,
            failed = report.failed,
            "task cleanup completed"
        );
        report
    }

    async fn snapshot(&self) -> Result<Vec<RunningTaskSnapshot>, SluiceError> {
        let cluster = &self.config.cluster_name;
        let arns = self.orchestrator.list_running_tasks(cluster).await?;
        if arns.is_empty() {
            tracing::info!(cluster = %cluster, "no running tasks found");
            return Ok(Vec::new());
        }
        self.orchestrator.describe_tasks(cluster, &arns).await
    }

    /// true なら停止済み（dry-run では停止したとみなす）
    async fn terminate(&self, task: &RunningTaskSnapshot, decision: &TerminationDecision) -> bool {
        let task_id = task.task_id();
        let containers = task.container_summary();
        tracing::warn!(
            task_id,
            elapsed_minutes = %format!("{:.2}", decision.elapsed_minutes),
            threshold_minutes = decision.threshold_minutes,
            "task exceeded runtime threshold"
        );

        let reason = decision.reason();
        if decision.dry_run {
            tracing::info!(
                task_arn = %task.task_arn,
                reason = %reason,
                containers = %containers,
                "DRY RUN: would terminate task"
            );
            return true;
        }

        match self
            .orchestrator
            .stop_task(&self.config.cluster_name, &task.task_arn, &reason)
            .await
        {
            Ok(()) => {
                tracing::info!(task_id, containers = %containers, "terminated task");
                true
            }
            Err(err) => {
                tracing::error!(
                    task_arn = %task.task_arn,
                    error = %err,
                    "error terminating task"
                );
                false
            }
        }
    }
}
