//! Existence Verifier
//!
//! Fail-closed: 問い合わせエラーは「存在しない」と同じに扱い、dispatch を抑止します。
//! 取りこぼした trigger は次の書き込みで回復しますが、空コンテナへの trigger は
//! 下流の計算資源を無駄にします。

use std::sync::Arc;

use crate::ports::ObjectStore;

#[derive(Clone)]
pub struct ExistenceVerifier {
    store: Arc<dyn ObjectStore>,
}

impl ExistenceVerifier {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// `directory` 配下にオブジェクトが 1 件以上あれば true
    pub async fn exists(&self, bucket: &str, directory: &str) -> bool {
        match self.store.has_objects(bucket, directory).await {
            Ok(found) => {
                if !found {
                    tracing::debug!(bucket, directory, "no objects under directory");
                }
                found
            }
            Err(err) => {
                tracing::warn!(
                    bucket,
                    directory,
                    error = %err,
                    kind = ?err.kind(),
                    "existence check failed; treating directory as missing"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryObjectStore;

    #[tokio::test]
    async fn finds_objects_under_directory() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("b", "knowledge_base/x/f1.txt");
        let verifier = ExistenceVerifier::new(store);

        assert!(verifier.exists("b", "knowledge_base/x/").await);
        assert!(!verifier.exists("b", "knowledge_base/y/").await);
        assert!(!verifier.exists("other", "knowledge_base/x/").await);
    }

    #[tokio::test]
    async fn store_errors_fail_closed() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("b", "knowledge_base/x/f1.txt");
        store.fail_bucket("b");
        let verifier = ExistenceVerifier::new(store);

        assert!(!verifier.exists("b", "knowledge_base/x/").await);
    }
}
