//! Ports - 抽象化レイヤー
//!
//! 外部システム（S3, EventBridge, ECS, DynamoDB）と時刻・ID 生成を trait にしています。
//! 各 component はこれらを引数で受け取り、グローバルなクライアントは持ちません。
//! クライアントの生成と寿命は invocation host（`sluice-cli`）が持ちます。

pub mod clock;
pub mod event_bus;
pub mod id_generator;
pub mod idempotency;
pub mod object_store;
pub mod orchestrator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_bus::{EventBus, PutEntryResult, PutEventsOutcome};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::idempotency::IdempotencyStore;
pub use self::object_store::ObjectStore;
pub use self::orchestrator::TaskOrchestrator;
