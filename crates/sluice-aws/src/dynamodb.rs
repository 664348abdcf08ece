//! DynamoIdempotencyStore - invocation をまたいだ重複 dispatch を防ぐ claim
//!
//! テーブルのパーティションキーは `directory`（文字列）。
//! 各 item は `owner`（claim した run の ID）と `expires_at`（epoch 秒）を持ちます。
//! `expires_at` を TTL 属性に設定しておけば期限切れの item は自動で消えますが、
//! 消えるまでの間も条件式で期限切れとして扱います。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;

use sluice_core::domain::SluiceError;
use sluice_core::ports::{Clock, IdempotencyStore, SystemClock};

const CLAIM_CONDITION: &str = "attribute_not_exists(#directory) OR #expires_at < :now";
const RELEASE_CONDITION: &str = "#owner = :owner";

pub struct DynamoIdempotencyStore {
    client: Client,
    table_name: String,
    clock: Arc<dyn Clock>,
}

impl DynamoIdempotencyStore {
    pub fn new(config: &aws_config::SdkConfig, table_name: impl Into<String>) -> Self {
        Self::from_client(Client::new(config), table_name, Arc::new(SystemClock))
    }

    pub fn from_client(
        client: Client,
        table_name: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            clock,
        }
    }
}

fn seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

#[async_trait]
impl IdempotencyStore for DynamoIdempotencyStore {
    async fn try_claim(
        &self,
        directory: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, SluiceError> {
        let now = self.clock.now().timestamp();
        let expires_at = now.saturating_add(seconds(ttl));

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("directory", AttributeValue::S(directory.to_string()))
            .item("owner", AttributeValue::S(owner.to_string()))
            .item("expires_at", AttributeValue::N(expires_at.to_string()))
            .condition_expression(CLAIM_CONDITION)
            .expression_attribute_names("#directory", "directory")
            .expression_attribute_names("#expires_at", "expires_at")
            .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                tracing::debug!(directory, "claim held by another run");
                Ok(false)
            }
            Err(err) => Err(SluiceError::Idempotency(format!(
                "PutItem {}: {}",
                self.table_name,
                DisplayErrorContext(&err)
            ))),
        }
    }

    async fn release(&self, directory: &str, owner: &str) -> Result<(), SluiceError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("directory", AttributeValue::S(directory.to_string()))
            .condition_expression(RELEASE_CONDITION)
            .expression_attribute_names("#owner", "owner")
            .expression_attribute_values(":owner", AttributeValue::S(owner.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            // 期限切れ後に別の run が取り直した claim は消さない
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(())
            }
            Err(err) => Err(SluiceError::Idempotency(format!(
                "DeleteItem {}: {}",
                self.table_name,
                DisplayErrorContext(&err)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::five_minutes(Duration::from_secs(300), 300)]
    #[case::zero(Duration::ZERO, 0)]
    #[case::huge(Duration::from_secs(u64::MAX), i64::MAX)]
    fn ttl_converts_to_epoch_seconds(#[case] ttl: Duration, #[case] expected: i64) {
        assert_eq!(seconds(ttl), expected);
    }
}
