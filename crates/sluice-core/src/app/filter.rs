//! Event Filter - 生の通知レコードを `(bucket, key)` に正規化する
//!
//! 純粋関数です。I/O はしません。
//!
//! # 判定順
//! 0. レコードが JSON オブジェクトですらない → skip
//! 1. eventSource が `aws:s3` でない → skip
//! 2. bucket / key が欠けている・空 → skip
//! 3. key が source prefix で始まらない → skip
//! 4. key が ignored prefix のどれかで始まる → skip
//!    （パイプライン自身の出力を同じ namespace に書き戻したときのループ防止）

use std::collections::BTreeSet;

use crate::config::WatchConfig;
use crate::domain::record::{ChangeRecord, RawChangeRecord, S3_EVENT_SOURCE};
use crate::observability::TriggerCounts;

/// filter がレコードを落とした理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    WrongSource,
    Malformed,
    OutsidePrefix,
    Ignored,
}

impl SkipReason {
    fn count(self, counts: &mut TriggerCounts) {
        match self {
            SkipReason::WrongSource => counts.wrong_source += 1,
            SkipReason::Malformed => counts.malformed += 1,
            SkipReason::OutsidePrefix => counts.outside_prefix += 1,
            SkipReason::Ignored => counts.ignored += 1,
        }
    }
}

/// key 全体に対する文字列 prefix の一致。空のエントリは何にも一致しない
pub fn is_ignored(key: &str, ignored_prefixes: &BTreeSet<String>) -> bool {
    ignored_prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && key.starts_with(prefix.as_str()))
}

/// 1 件のレコードを検査する
pub fn classify(record: &RawChangeRecord, config: &WatchConfig) -> Result<ChangeRecord, SkipReason> {
    if record.undecodable {
        return Err(SkipReason::Malformed);
    }
    let Some(event_source) = record
        .event_source
        .as_deref()
        .filter(|source| *source == S3_EVENT_SOURCE)
    else {
        return Err(SkipReason::WrongSource);
    };

    let (Some(bucket), Some(key)) = (record.bucket_name(), record.object_key()) else {
        return Err(SkipReason::Malformed);
    };

    if !key.starts_with(config.source_prefix.as_str()) {
        return Err(SkipReason::OutsidePrefix);
    }
    if is_ignored(key, &config.ignored_prefixes) {
        return Err(SkipReason::Ignored);
    }

    Ok(ChangeRecord {
        event_source: event_source.to_string(),
        bucket: bucket.to_string(),
        key: key.to_string(),
    })
}

/// 順序を保ったまま batch を絞り込む。skip はログに出してカウントする
pub fn filter_records(
    records: &[RawChangeRecord],
    config: &WatchConfig,
    counts: &mut TriggerCounts,
) -> Vec<ChangeRecord> {
    let mut accepted = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match classify(record, config) {
            Ok(change) => {
                if change.bucket != config.source_bucket {
                    tracing::debug!(
                        bucket = %change.bucket,
                        expected = %config.source_bucket,
                        "record from a bucket other than the watched one"
                    );
                }
                accepted.push(change);
            }
            Err(reason) => {
                reason.count(counts);
                match reason {
                    SkipReason::WrongSource => tracing::warn!(
                        index,
                        event_source = ?record.event_source,
                        "skipping non-S3 record"
                    ),
                    SkipReason::Malformed => tracing::warn!(
                        index,
                        bucket = ?record.bucket_name(),
                        key = ?record.object_key(),
                        "skipping record with missing bucket or key"
                    ),
                    SkipReason::OutsidePrefix => tracing::info!(
                        key = ?record.object_key(),
                        prefix = %config.source_prefix,
                        "skipping key outside the watched prefix"
                    ),
                    SkipReason::Ignored => tracing::info!(
                        key = ?record.object_key(),
                        "ignoring key under an ignored prefix"
                    ),
                }
            }
        }
    }
    accepted
}
