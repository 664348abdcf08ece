//! TriggerPipeline - 1 invocation 分の通知バッチを処理する
//!
//! # フロー
//! 1. filter: eventSource / bucket・key / source prefix / ignored prefix
//! 2. resolve: key → コンテナディレクトリ
//! 3. dedup: 同じ invocation で既出のディレクトリは skip
//! 4. verify: ディレクトリが空なら skip（fail-closed）
//! 5. claim: 他の invocation が dispatch 済みなら skip
//! 6. dispatch: 失敗したら残りを処理せず 500
//!
//! 通知は受け取った順に処理し、ディレクトリは初出順に最大 1 回だけ dispatch します。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::app::dedup::BatchDedupSet;
use crate::app::dispatcher::Dispatcher;
use crate::app::filter::filter_records;
use crate::app::resolver::resolve_directory;
use crate::app::verifier::ExistenceVerifier;
use crate::config::WatchConfig;
use crate::domain::errors::SluiceError;
use crate::domain::ids::TriggerRunId;
use crate::domain::record::ChangeNotification;
use crate::domain::response::InvocationResponse;
use crate::domain::trigger::ContainerTrigger;
use crate::observability::{TriggerCounts, trigger_span};
use crate::ports::{IdGenerator, IdempotencyStore};

/// batch を止めた段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// idempotency store の claim が失敗した
    Claim,
    /// EventBridge への put が失敗した
    Dispatch,
}

impl FailureStage {
    pub fn message(self) -> &'static str {
        match self {
            FailureStage::Claim => "Failed to claim directory for dispatch",
            FailureStage::Dispatch => "Failed to put event to EventBridge",
        }
    }
}

/// batch を止めたディレクトリ
#[derive(Debug, Clone, Serialize)]
pub struct TriggerFailure {
    pub stage: FailureStage,
    pub bucket: String,
    pub directory: String,
    pub error: String,
}

/// 1 invocation の処理結果
#[derive(Debug, Clone, Serialize)]
pub struct TriggerReport {
    pub run_id: TriggerRunId,
    pub counts: TriggerCounts,
    /// dispatch したディレクトリ（dispatch 順）
    pub dispatched: Vec<String>,
    pub failure: Option<TriggerFailure>,
}

impl TriggerReport {
    fn new(run_id: TriggerRunId) -> Self {
        Self {
            run_id,
            counts: TriggerCounts::default(),
            dispatched: Vec::new(),
            failure: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn into_response(self) -> InvocationResponse {
        match self.failure {
            None => InvocationResponse::ok("Successfully processed S3 events")
                .with("run_id", self.run_id.to_string())
                .with("dispatched", &self.dispatched)
                .with("counts", &self.counts),
            Some(failure) => InvocationResponse::internal_error(failure.stage.message())
                .with("run_id", self.run_id.to_string())
                .with("stage", failure.stage)
                .with("bucket", &failure.bucket)
                .with("directory", &failure.directory)
                .with("error", &failure.error)
                .with("dispatched", &self.dispatched),
        }
    }
}

pub struct TriggerPipeline {
    config: Arc<WatchConfig>,
    verifier: ExistenceVerifier,
    dispatcher: Dispatcher,
    idempotency: Arc<dyn IdempotencyStore>,
    claim_ttl: Duration,
    ids: Arc<dyn IdGenerator>,
}

impl TriggerPipeline {
    pub fn new(
        config: Arc<WatchConfig>,
        verifier: ExistenceVerifier,
        dispatcher: Dispatcher,
        idempotency: Arc<dyn IdempotencyStore>,
        claim_ttl: Duration,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            config,
            verifier,
            dispatcher,
            idempotency,
            claim_ttl,
            ids,
        }
    }

    /// 生の JSON payload の入口
    ///
    /// JSON オブジェクトでない payload は 400。中身はレコード単位で扱い、
    /// 壊れたレコードは skip するだけで batch は続行する。
    pub async fn handle_payload(&self, payload: Value) -> InvocationResponse {
        if !payload.is_object() {
            tracing::warn!("trigger payload is not a JSON object");
            return InvocationResponse::bad_request("Trigger payload must be a JSON object");
        }
        let notification: ChangeNotification = match serde_json::from_value(payload) {
            Ok(notification) => notification,
            Err(err) => {
                let err = SluiceError::from(err);
                tracing::warn!(error = %err, "trigger payload could not be decoded");
                return InvocationResponse::bad_request(err.to_string());
            }
        };
        self.run(&notification).await.into_response()
    }

    pub async fn run(&self, notification: &ChangeNotification) -> TriggerReport {
        let run_id = self.ids.trigger_run_id();
        let span = trigger_span(run_id, notification.records.len());
        self.run_batch(run_id, notification).instrument(span).await
    }

    async fn run_batch(&self, run_id: TriggerRunId, notification: &ChangeNotification) -> TriggerReport {
        let mut report = TriggerReport::new(run_id);
        report.counts.received = notification.records.len();
        tracing::info!(records = report.counts.received, "received change notification");

        let changes = filter_records(&notification.records, &self.config, &mut report.counts);
        let owner = run_id.to_string();
        let mut dedup = BatchDedupSet::new();

        for change in changes {
            let directory = resolve_directory(&change.key, &self.config.source_prefix);

            if !dedup.should_process(&directory) {
                report.counts.duplicate += 1;
                tracing::debug!(key = %change.key, directory = %directory, "directory already handled in this batch");
                continue;
            }

            if !self.verifier.exists(&change.bucket, &directory).await {
                report.counts.missing += 1;
                tracing::warn!(
                    bucket = %change.bucket,
                    directory = %directory,
                    "container is empty or could not be checked; not dispatching"
                );
                continue;
            }

            match self.idempotency.try_claim(&directory, &owner, self.claim_ttl).await {
                Ok(true) => {}
                Ok(false) => {
                    report.counts.already_claimed += 1;
                    tracing::info!(
                        directory = %directory,
                        "directory was dispatched recently by another invocation"
                    );
                    continue;
                }
                Err(err) => {
                    tracing::error!(
                        bucket = %change.bucket,
                        directory = %directory,
                        error = %err,
                        "could not claim directory; aborting batch"
                    );
                    report.failure = Some(TriggerFailure {
                        stage: FailureStage::Claim,
                        bucket: change.bucket,
                        directory,
                        error: err.to_string(),
                    });
                    return report;
                }
            }

            let trigger = ContainerTrigger::new(change.bucket, directory);
            match self.dispatcher.dispatch(&trigger).await {
                Ok(receipt) => {
                    report.counts.dispatched += 1;
                    report.dispatched.push(receipt.directory);
                }
                Err(err) => {
                    if let Err(release_err) = self.idempotency.release(&trigger.directory, &owner).await {
                        tracing::warn!(
                            directory = %trigger.directory,
                            error = %release_err,
                            "could not release claim after failed dispatch"
                        );
                    }
                    report.failure = Some(TriggerFailure {
                        stage: FailureStage::Dispatch,
                        bucket: trigger.bucket,
                        directory: trigger.directory,
                        error: err.to_string(),
                    });
                    return report;
                }
            }
        }

        tracing::info!(
            dispatched = report.counts.dispatched,
            duplicate = report.counts.duplicate,
            missing = report.counts.missing,
            "trigger batch complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::RawChangeRecord;
    use crate::impls::{
        InMemoryIdempotencyStore, InMemoryObjectStore, NoopIdempotencyStore, RecordingEventBus,
    };
    use crate::ports::{FixedClock, SystemClock, UlidGenerator};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::collections::BTreeSet;

    struct Fixture {
        store: Arc<InMemoryObjectStore>,
        bus: Arc<RecordingEventBus>,
        pipeline: TriggerPipeline,
    }

    fn fixture_with(idempotency: Arc<dyn IdempotencyStore>) -> Fixture {
        fixture_from(WatchConfig::default(), idempotency)
    }

    fn fixture_from(config: WatchConfig, idempotency: Arc<dyn IdempotencyStore>) -> Fixture {
        let config = Arc::new(config);
        let store = Arc::new(InMemoryObjectStore::new());
        let bus = Arc::new(RecordingEventBus::new());
        let pipeline = TriggerPipeline::new(
            config.clone(),
            ExistenceVerifier::new(store.clone()),
            Dispatcher::new(bus.clone(), config),
            idempotency,
            Duration::from_secs(300),
            Arc::new(UlidGenerator::new(SystemClock)),
        );
        Fixture { store, bus, pipeline }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(NoopIdempotencyStore))
    }

    fn batch(keys: &[&str]) -> ChangeNotification {
        ChangeNotification {
            records: keys.iter().map(|key| RawChangeRecord::s3("b", *key)).collect(),
        }
    }

    fn sent_directories(bus: &RecordingEventBus) -> Vec<String> {
        bus.sent().into_iter().map(|event| event.detail.key).collect()
    }

    #[tokio::test]
    async fn collapses_files_into_one_dispatch_per_directory() {
        let f = fixture();
        f.store.put("b", "knowledge_base/x/f1.txt");
        f.store.put("b", "knowledge_base/x/f2.txt");
        f.store.put("b", "knowledge_base/y/f3.txt");

        let report = f
            .pipeline
            .run(&batch(&[
                "knowledge_base/x/f1.txt",
                "knowledge_base/x/f2.txt",
                "knowledge_base/y/f3.txt",
            ]))
            .await;

        assert!(report.is_success());
        assert_eq!(report.dispatched, vec!["knowledge_base/x/", "knowledge_base/y/"]);
        assert_eq!(sent_directories(&f.bus), vec!["knowledge_base/x/", "knowledge_base/y/"]);
        assert_eq!(report.counts.duplicate, 1);
    }

    #[tokio::test]
    async fn n_directories_times_m_records_dispatch_n_times() {
        let f = fixture();
        let mut keys = Vec::new();
        for dir in ["a", "b", "c", "d"] {
            f.store.put("b", &format!("knowledge_base/{dir}/seed.txt"));
        }
        for i in 0..5 {
            for dir in ["a", "b", "c", "d"] {
                keys.push(format!("knowledge_base/{dir}/file-{i}.txt"));
            }
        }
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();

        let report = f.pipeline.run(&batch(&keys)).await;

        assert_eq!(f.bus.sent().len(), 4);
        assert_eq!(report.counts.duplicate, 16);
        assert_eq!(f.store.probes(), 4);
    }

    #[tokio::test]
    async fn ignored_output_is_never_dispatched() {
        let f = fixture();
        f.store.put("b", ".write/out.txt");

        let response = f
            .pipeline
            .handle_payload(json!({
                "Records": [{
                    "eventSource": "aws:s3",
                    "s3": { "bucket": { "name": "b" }, "object": { "key": ".write/out.txt" } }
                }]
            }))
            .await;

        assert_eq!(response.status_code, 200);
        assert!(f.bus.sent().is_empty());
    }

    #[tokio::test]
    async fn filtered_keys_never_reach_the_verifier() {
        let config = WatchConfig {
            ignored_prefixes: BTreeSet::from([
                ".write/".to_string(),
                "knowledge_base/.write/".to_string(),
            ]),
            ..WatchConfig::default()
        };
        let f = fixture_from(config, Arc::new(NoopIdempotencyStore));

        let report = f
            .pipeline
            .run(&batch(&["outside/x/f.txt", ".write/f.txt", "knowledge_base/.write/f.txt"]))
            .await;

        assert_eq!(f.store.probes(), 0);
        assert!(f.bus.sent().is_empty());
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn nested_write_dir_is_probed_under_default_ignores() {
        let f = fixture();

        let report = f.pipeline.run(&batch(&["knowledge_base/.write/f.txt"])).await;

        assert_eq!(f.store.probes(), 1);
        assert_eq!(report.counts.ignored, 0);
        assert_eq!(report.counts.missing, 1);
        assert!(f.bus.sent().is_empty());
    }

    #[tokio::test]
    async fn wrongly_typed_records_are_skipped_and_the_rest_dispatched() {
        let f = fixture();
        f.store.put("b", "knowledge_base/x/f1.txt");

        let response = f
            .pipeline
            .handle_payload(json!({
                "Records": [
                    {
                        "eventSource": "aws:s3",
                        "s3": { "bucket": { "name": "b" }, "object": { "key": "knowledge_base/x/f1.txt" } }
                    },
                    {
                        "eventSource": "aws:s3",
                        "s3": { "bucket": { "name": "b" }, "object": { "key": 42 } }
                    },
                    null
                ]
            }))
            .await;

        assert_eq!(response.status_code, 200);
        assert_eq!(sent_directories(&f.bus), vec!["knowledge_base/x/"]);
        assert_eq!(response.body["counts"]["malformed"], 2);
        assert!(response.body["run_id"].as_str().unwrap().starts_with("trigger-"));
    }

    #[tokio::test]
    async fn empty_container_is_skipped_without_error() {
        let f = fixture();
        f.store.put("b", "knowledge_base/y/f3.txt");

        let report = f
            .pipeline
            .run(&batch(&["knowledge_base/x/deleted.txt", "knowledge_base/y/f3.txt"]))
            .await;

        assert!(report.is_success());
        assert_eq!(report.counts.missing, 1);
        assert_eq!(sent_directories(&f.bus), vec!["knowledge_base/y/"]);
    }

    #[tokio::test]
    async fn dispatch_failure_stops_the_batch() {
        let f = fixture();
        for key in ["knowledge_base/x/f1.txt", "knowledge_base/y/f2.txt", "knowledge_base/z/f3.txt"] {
            f.store.put("b", key);
        }
        f.bus.reject_directory("knowledge_base/y/");

        let report = f
            .pipeline
            .run(&batch(&[
                "knowledge_base/x/f1.txt",
                "knowledge_base/y/f2.txt",
                "knowledge_base/z/f3.txt",
            ]))
            .await;

        assert_eq!(sent_directories(&f.bus), vec!["knowledge_base/x/"]);
        let failure = report.failure.clone().unwrap();
        assert_eq!(failure.directory, "knowledge_base/y/");

        let response = report.into_response();
        assert_eq!(response.status_code, 500);
        assert_eq!(response.message(), Some("Failed to put event to EventBridge"));
        assert_eq!(response.body["stage"], "dispatch");
        assert_eq!(response.body["directory"], "knowledge_base/y/");
    }

    #[tokio::test]
    async fn non_object_payload_is_a_bad_request() {
        let f = fixture();
        let response = f.pipeline.handle_payload(json!(["not", "an", "object"])).await;
        assert_eq!(response.status_code, 400);
    }

    #[tokio::test]
    async fn payload_without_records_is_nothing_to_do() {
        let f = fixture();
        let response = f.pipeline.handle_payload(json!({})).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body["dispatched"], json!([]));
    }

    #[tokio::test]
    async fn claim_held_by_another_invocation_suppresses_dispatch() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
        let claims = Arc::new(InMemoryIdempotencyStore::new(clock));
        claims
            .try_claim("knowledge_base/x/", "trigger-other", Duration::from_secs(300))
            .await
            .unwrap();
        let f = fixture_with(claims);
        f.store.put("b", "knowledge_base/x/f1.txt");
        f.store.put("b", "knowledge_base/y/f2.txt");

        let report = f
            .pipeline
            .run(&batch(&["knowledge_base/x/f1.txt", "knowledge_base/y/f2.txt"]))
            .await;

        assert!(report.is_success());
        assert_eq!(report.counts.already_claimed, 1);
        assert_eq!(sent_directories(&f.bus), vec!["knowledge_base/y/"]);
    }

    #[tokio::test]
    async fn failed_dispatch_releases_its_claim() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
        let claims = Arc::new(InMemoryIdempotencyStore::new(clock));
        let f = fixture_with(claims.clone());
        f.store.put("b", "knowledge_base/x/f1.txt");
        f.bus.fail_calls(true);

        let report = f.pipeline.run(&batch(&["knowledge_base/x/f1.txt"])).await;

        assert!(!report.is_success());
        assert!(!claims.is_claimed("knowledge_base/x/"));
    }

    #[tokio::test]
    async fn claim_store_errors_abort_the_batch() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
        let claims = Arc::new(InMemoryIdempotencyStore::new(clock));
        claims.fail_calls(true);
        let f = fixture_with(claims);
        f.store.put("b", "knowledge_base/x/f1.txt");

        let report = f.pipeline.run(&batch(&["knowledge_base/x/f1.txt"])).await;
        assert_eq!(report.failure.as_ref().map(|failure| failure.stage), Some(FailureStage::Claim));

        let response = report.into_response();
        assert_eq!(response.status_code, 500);
        assert_eq!(response.message(), Some("Failed to claim directory for dispatch"));
        assert_eq!(response.body["stage"], "claim");
        assert!(f.bus.sent().is_empty());
    }
}
