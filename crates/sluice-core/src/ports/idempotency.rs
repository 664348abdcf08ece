//! IdempotencyStore port - invocation をまたいだ重複排除
//!
//! BatchDedupSet は 1 invocation の中でしか効きません。
//! 同じディレクトリの通知が並行 invocation に届くと両方が dispatch してしまうので、
//! 共有 KV に TTL 付きの claim を条件付き書き込みで置きます。
//!
//! 本番実装は `sluice-aws` の DynamoIdempotencyStore。

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::SluiceError;

#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// `directory` の claim を取る
    ///
    /// 有効な claim が他にあれば `Ok(false)`。期限切れの claim は上書きしてよい。
    async fn try_claim(
        &self,
        directory: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, SluiceError>;

    /// 自分（`owner`）の claim だけを消す。dispatch 失敗時に再配送で再試行できるようにするため。
    async fn release(&self, directory: &str, owner: &str) -> Result<(), SluiceError>;
}
