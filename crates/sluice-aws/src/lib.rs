//! sluice-aws
//!
//! sluice-core の ports を AWS SDK で実装したもの。
//!
//! - **S3ObjectStore**: `ListObjectsV2` で prefix の存在確認
//! - **EventBridgeBus**: `PutEvents`
//! - **EcsOrchestrator**: `ListTasks` / `DescribeTasks` / `StopTask`
//! - **DynamoIdempotencyStore**: 条件付き書き込みによる claim
//!
//! クライアントはプロセス起動時に 1 回だけ作り、invocation をまたいで使い回します。

pub mod dynamodb;
pub mod ecs;
pub mod eventbridge;
pub mod s3;

pub use self::dynamodb::DynamoIdempotencyStore;
pub use self::ecs::EcsOrchestrator;
pub use self::eventbridge::EventBridgeBus;
pub use self::s3::S3ObjectStore;

pub use aws_config::SdkConfig;

/// リージョンと認証情報を環境から解決する
pub async fn load_sdk_config() -> SdkConfig {
    aws_config::load_from_env().await
}
