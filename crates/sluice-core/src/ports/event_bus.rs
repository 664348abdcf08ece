//! EventBus port - DispatchEvent の送信
//!
//! 本番実装は `sluice-aws` の EventBridgeBus。

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::errors::SluiceError;
use crate::domain::trigger::DispatchEvent;

/// bus が返すエントリごとの結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PutEntryResult {
    pub event_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl PutEntryResult {
    pub fn accepted(event_id: impl Into<String>) -> Self {
        Self {
            event_id: Some(event_id.into()),
            ..Self::default()
        }
    }

    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event_id: None,
            error_code: Some(code.into()),
            error_message: Some(message.into()),
        }
    }
}

/// 1 回の put 呼び出しの応答全体。失敗時はそのままログに出す
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PutEventsOutcome {
    pub failed_entry_count: u32,
    pub entries: Vec<PutEntryResult>,
}

#[async_trait]
pub trait EventBus: Send + Sync {
    /// `events` を 1 バッチとして送信する
    ///
    /// `Err` は呼び出し自体の失敗。エントリ単位の拒否は
    /// `failed_entry_count` が 0 でない `Ok(PutEventsOutcome)` で返る。
    async fn put_events(&self, events: &[DispatchEvent]) -> Result<PutEventsOutcome, SluiceError>;
}
