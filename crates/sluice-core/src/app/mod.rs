//! App - アプリケーション層
//!
//! ports を組み合わせて 2 つの独立した経路を実装します。
//!
//! # Trigger 経路（通知バッチごと）
//! filter → resolver → dedup → verifier → (idempotency claim) → dispatcher
//!
//! # Reaper 経路（スケジュール実行）
//! list → describe → decide → stop

pub mod builder;
pub mod dedup;
pub mod dispatcher;
pub mod filter;
pub mod reaper_loop;
pub mod resolver;
pub mod trigger;
pub mod verifier;

pub use self::builder::{AppBuilder, BuildError};
pub use self::dedup::BatchDedupSet;
pub use self::dispatcher::{DispatchReceipt, Dispatcher};
pub use self::filter::{SkipReason, classify, filter_records, is_ignored};
pub use self::reaper_loop::{ReapReport, TaskReaper};
pub use self::resolver::resolve_directory;
pub use self::trigger::{FailureStage, TriggerFailure, TriggerPipeline, TriggerReport};
pub use self::verifier::ExistenceVerifier;
