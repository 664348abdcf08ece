//! ContainerTrigger と DispatchEvent
//!
//! DispatchEvent の `detail` は下流の launcher が読む契約です。
//! フィールド名（bucket / key / cluster / taskDefinition / containerName）は変えないこと。

use serde::{Deserialize, Serialize};

use crate::config::WatchConfig;

/// 重複排除と配送の単位（bucket + ディレクトリ）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContainerTrigger {
    pub bucket: String,
    pub directory: String,
}

impl ContainerTrigger {
    pub fn new(bucket: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            directory: directory.into(),
        }
    }
}

/// launcher が読む部分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchDetail {
    pub bucket: String,
    /// コンテナのディレクトリ（必ず末尾スラッシュ付き）
    pub key: String,
    pub cluster: String,
    pub task_definition: String,
    pub container_name: String,
}

/// event bus の 1 エントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DispatchEvent {
    pub source: String,
    pub detail_type: String,
    pub event_bus_name: String,
    pub detail: DispatchDetail,
}

impl DispatchEvent {
    /// WatchConfig の値から 1 件のイベントを組み立てる
    pub fn for_container(trigger: &ContainerTrigger, config: &WatchConfig) -> Self {
        Self {
            source: config.event_source.clone(),
            detail_type: config.event_detail_type.clone(),
            event_bus_name: config.event_bus_name.clone(),
            detail: DispatchDetail {
                bucket: trigger.bucket.clone(),
                key: trigger.directory.clone(),
                cluster: config.cluster_name.clone(),
                task_definition: config.task_definition_name.clone(),
                container_name: config.container_name.clone(),
            },
        }
    }

    /// EventBridge は Detail を JSON 文字列で受け取る
    pub fn detail_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.detail)
    }
}
