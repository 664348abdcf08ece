//! RecordingEventBus - 送られたイベントを記録する開発用 bus

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use super::lock;
use crate::domain::errors::SluiceError;
use crate::domain::trigger::DispatchEvent;
use crate::ports::{EventBus, PutEntryResult, PutEventsOutcome};

#[derive(Default)]
pub struct RecordingEventBus {
    sent: Mutex<Vec<DispatchEvent>>,
    rejected_directories: Mutex<HashSet<String>>,
    fail_calls: AtomicBool,
    next_id: AtomicU64,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 受け付けたイベント（送信順）
    pub fn sent(&self) -> Vec<DispatchEvent> {
        lock(&self.sent).clone()
    }

    /// このディレクトリ宛てのエントリは失敗エントリとして返す
    pub fn reject_directory(&self, directory: impl Into<String>) {
        lock(&self.rejected_directories).insert(directory.into());
    }

    /// put 呼び出し自体をエラーにする
    pub fn fail_calls(&self, fail: bool) {
        self.fail_calls.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl EventBus for RecordingEventBus {
    async fn put_events(&self, events: &[DispatchEvent]) -> Result<PutEventsOutcome, SluiceError> {
        if self.fail_calls.load(Ordering::Relaxed) {
            return Err(SluiceError::EventBus("connection reset".to_string()));
        }

        let rejected = lock(&self.rejected_directories).clone();
        let mut outcome = PutEventsOutcome::default();
        for event in events {
            if rejected.contains(&event.detail.key) {
                outcome.failed_entry_count += 1;
                outcome
                    .entries
                    .push(PutEntryResult::rejected("InternalFailure", "rejected by test bus"));
            } else {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                lock(&self.sent).push(event.clone());
                outcome.entries.push(PutEntryResult::accepted(format!("evt-{id}")));
            }
        }
        Ok(outcome)
    }
}
