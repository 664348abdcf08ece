//! 実行 ID（型付き ID）
//!
//! trigger / reaper の 1 回の実行ごとに ULID ベースの ID を振ります。
//! ログの span と idempotency claim の owner に使います。
//!
//! ## Phantom Type パターン
//! `RunId<T>` で共通実装を持ち、`T` はマーカー型としてコンパイル時にだけ使います。
//! TriggerRunId と ReapRunId は混同できません。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// Display で使うプレフィックス（例: "trigger-", "reap-"）
    fn prefix() -> &'static str;
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> RunId<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for RunId<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for RunId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Trigger 実行のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriggerRun {}

impl IdMarker for TriggerRun {
    fn prefix() -> &'static str {
        "trigger-"
    }
}

/// Reaper 実行のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReapRun {}

impl IdMarker for ReapRun {
    fn prefix() -> &'static str {
        "reap-"
    }
}

/// trigger 1 invocation（通知 1 batch）の ID
pub type TriggerRunId = RunId<TriggerRun>;

/// reaper 1 run の ID
pub type ReapRunId = RunId<ReapRun>;
