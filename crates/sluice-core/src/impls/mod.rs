//! Impls - ports の開発用・テスト用実装
//!
//! # 含まれる実装
//! - **InMemoryObjectStore**: bucket ごとの key 集合
//! - **RecordingEventBus**: 送ったイベントを記録する bus
//! - **InMemoryOrchestrator**: 台本どおりに動く orchestrator
//! - **InMemoryIdempotencyStore**: TTL 付き claim（Clock で期限判定）
//! - **NoopIdempotencyStore**: 常に claim 成功（invocation 内の dedup だけになる）
//!
//! # 本番用実装
//! AWS 実装は `sluice-aws` クレートに置きます。

pub mod inmem_idempotency;
pub mod inmem_orchestrator;
pub mod inmem_store;
pub mod recording_bus;

pub use self::inmem_idempotency::{InMemoryIdempotencyStore, NoopIdempotencyStore};
pub use self::inmem_orchestrator::InMemoryOrchestrator;
pub use self::inmem_store::InMemoryObjectStore;
pub use self::recording_bus::RecordingEventBus;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// poison は別のテストスレッドが panic しただけなので、データはそのまま使う
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
