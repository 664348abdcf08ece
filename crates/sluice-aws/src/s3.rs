//! S3ObjectStore - prefix の下にオブジェクトが 1 件でもあるかを調べる

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;

use sluice_core::domain::SluiceError;
use sluice_core::ports::ObjectStore;

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self::from_client(Client::new(config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn has_objects(&self, bucket: &str, prefix: &str) -> Result<bool, SluiceError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(1)
            .send()
            .await
            .map_err(|e| {
                SluiceError::ObjectStore(format!(
                    "ListObjectsV2 s3://{bucket}/{prefix}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let found = !output.contents().is_empty();
        tracing::debug!(bucket, prefix, found, "probed prefix");
        Ok(found)
    }
}
