//! ObjectStore port - コンテナの存在確認
//!
//! 本番実装は `sluice-aws` の S3ObjectStore。

use async_trait::async_trait;

use crate::domain::errors::SluiceError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// `prefix` 配下にオブジェクトが 1 件以上あるか
    ///
    /// 全件 listing ではなく、最大 1 件だけ取る probe として実装すること。
    async fn has_objects(&self, bucket: &str, prefix: &str) -> Result<bool, SluiceError>;
}
