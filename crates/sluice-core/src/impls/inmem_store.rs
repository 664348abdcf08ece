//! InMemoryObjectStore - 開発用のオブジェクトストア

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::lock;
use crate::domain::errors::SluiceError;
use crate::ports::ObjectStore;

#[derive(Default)]
pub struct InMemoryObjectStore {
    /// bucket → keys
    objects: Mutex<BTreeMap<String, BTreeSet<String>>>,
    failing_buckets: Mutex<HashSet<String>>,
    probes: AtomicUsize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: impl Into<String>, key: impl Into<String>) {
        lock(&self.objects)
            .entry(bucket.into())
            .or_default()
            .insert(key.into());
    }

    pub fn delete(&self, bucket: &str, key: &str) {
        if let Some(keys) = lock(&self.objects).get_mut(bucket) {
            keys.remove(key);
        }
    }

    /// `bucket` への probe をすべてエラーにする
    pub fn fail_bucket(&self, bucket: impl Into<String>) {
        lock(&self.failing_buckets).insert(bucket.into());
    }

    /// これまでの `has_objects` 呼び出し回数
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn has_objects(&self, bucket: &str, prefix: &str) -> Result<bool, SluiceError> {
        self.probes.fetch_add(1, Ordering::Relaxed);
        if lock(&self.failing_buckets).contains(bucket) {
            return Err(SluiceError::ObjectStore(format!("access denied to {bucket}")));
        }
        let objects = lock(&self.objects);
        // key はソート済みなので prefix 以上の最初の key だけ見ればよい
        Ok(objects.get(bucket).is_some_and(|keys| {
            keys.range(prefix.to_string()..)
                .next()
                .is_some_and(|key| key.starts_with(prefix))
        }))
    }
}
