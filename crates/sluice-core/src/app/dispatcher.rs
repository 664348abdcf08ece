//! Dispatcher - 1 コンテナにつき 1 件の DispatchEvent を送る
//!
//! 内部リトライはしません。再試行は event bus の再配送か、
//! invocation を起動した側の責任です。

use std::sync::Arc;

use crate::config::WatchConfig;
use crate::domain::errors::SluiceError;
use crate::domain::trigger::{ContainerTrigger, DispatchEvent};
use crate::ports::EventBus;

/// 1 コンテナ分の送信成功
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub directory: String,
    pub event_id: Option<String>,
}

#[derive(Clone)]
pub struct Dispatcher {
    bus: Arc<dyn EventBus>,
    config: Arc<WatchConfig>,
}

impl Dispatcher {
    pub fn new(bus: Arc<dyn EventBus>, config: Arc<WatchConfig>) -> Self {
        Self { bus, config }
    }

    /// 単一エントリのバッチとして送信する
    ///
    /// # エラー
    ///
    /// 呼び出し自体が失敗した場合、または bus が 1 件でも失敗エントリを返した場合。
    pub async fn dispatch(&self, trigger: &ContainerTrigger) -> Result<DispatchReceipt, SluiceError> {
        let event = DispatchEvent::for_container(trigger, &self.config);
        tracing::info!(
            bucket = %trigger.bucket,
            directory = %trigger.directory,
            event_bus = %event.event_bus_name,
            detail_type = %event.detail_type,
            "putting dispatch event"
        );

        let outcome = match self.bus.put_events(std::slice::from_ref(&event)).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(
                    bucket = %trigger.bucket,
                    directory = %trigger.directory,
                    error = %err,
                    "put events call failed"
                );
                return Err(err);
            }
        };

        if outcome.failed_entry_count > 0 {
            tracing::error!(
                bucket = %trigger.bucket,
                directory = %trigger.directory,
                response = ?outcome,
                "event bus rejected the dispatch event"
            );
            let detail = outcome
                .entries
                .iter()
                .find_map(|entry| entry.error_code.clone())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(SluiceError::EventBus(format!(
                "{} failed entries for {} ({detail})",
                outcome.failed_entry_count, trigger.directory
            )));
        }

        let event_id = outcome.entries.first().and_then(|entry| entry.event_id.clone());
        tracing::info!(
            directory = %trigger.directory,
            event_id = ?event_id,
            "dispatch event accepted"
        );
        Ok(DispatchReceipt {
            directory: trigger.directory.clone(),
            event_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::RecordingEventBus;

    fn dispatcher(bus: Arc<RecordingEventBus>) -> Dispatcher {
        Dispatcher::new(bus, Arc::new(WatchConfig::default()))
    }

    #[tokio::test]
    async fn publishes_exactly_one_event() {
        let bus = Arc::new(RecordingEventBus::new());
        let trigger = ContainerTrigger::new("b", "knowledge_base/x/");

        let receipt = dispatcher(bus.clone()).dispatch(&trigger).await.unwrap();

        assert_eq!(receipt.directory, "knowledge_base/x/");
        assert!(receipt.event_id.is_some());
        let sent = bus.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].detail.key, "knowledge_base/x/");
        assert_eq!(sent[0].detail.bucket, "b");
    }

    #[tokio::test]
    async fn rejected_entries_are_failures() {
        let bus = Arc::new(RecordingEventBus::new());
        bus.reject_directory("knowledge_base/x/");
        let trigger = ContainerTrigger::new("b", "knowledge_base/x/");

        let err = dispatcher(bus.clone()).dispatch(&trigger).await.unwrap_err();

        assert!(matches!(err, SluiceError::EventBus(_)));
        assert!(bus.sent().is_empty());
    }

    #[tokio::test]
    async fn call_errors_are_failures() {
        let bus = Arc::new(RecordingEventBus::new());
        bus.fail_calls(true);
        let trigger = ContainerTrigger::new("b", "knowledge_base/x/");

        assert!(dispatcher(bus).dispatch(&trigger).await.is_err());
    }
}
