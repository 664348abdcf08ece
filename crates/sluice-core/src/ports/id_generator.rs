//! IdGenerator port - 実行 ID の生成
//!
//! Clock を使って現在時刻ベースの ULID を生成します。
//! FixedClock を使えば timestamp 部分が決定的になります。

use crate::domain::ids::{ReapRunId, TriggerRunId};
use crate::ports::Clock;
use ulid::Ulid;

pub trait IdGenerator: Send + Sync {
    fn trigger_run_id(&self) -> TriggerRunId;

    fn reap_run_id(&self) -> ReapRunId;
}

pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn trigger_run_id(&self) -> TriggerRunId {
        TriggerRunId::from(self.next())
    }

    fn reap_run_id(&self) -> ReapRunId {
        ReapRunId::from(self.next())
    }
}
