//! InMemoryIdempotencyStore / NoopIdempotencyStore
//!
//! InMemory は単一プロセス内でしか共有されません。並行 invocation 間の
//! 重複排除には `sluice-aws` の DynamoIdempotencyStore を使うこと。

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::lock;
use crate::domain::errors::SluiceError;
use crate::ports::{Clock, IdempotencyStore};

#[derive(Debug, Clone)]
struct Claim {
    owner: String,
    expires_at: DateTime<Utc>,
}

pub struct InMemoryIdempotencyStore<C> {
    claims: Mutex<HashMap<String, Claim>>,
    clock: C,
    fail_calls: AtomicBool,
}

impl<C: Clock> InMemoryIdempotencyStore<C> {
    pub fn new(clock: C) -> Self {
        Self {
            claims: Mutex::new(HashMap::new()),
            clock,
            fail_calls: AtomicBool::new(false),
        }
    }

    /// 有効な claim があるか
    pub fn is_claimed(&self, directory: &str) -> bool {
        let now = self.clock.now();
        lock(&self.claims)
            .get(directory)
            .is_some_and(|claim| claim.expires_at > now)
    }

    pub fn fail_calls(&self, fail: bool) {
        self.fail_calls.store(fail, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), SluiceError> {
        if self.fail_calls.load(Ordering::Relaxed) {
            return Err(SluiceError::Idempotency("throttled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<C: Clock> IdempotencyStore for InMemoryIdempotencyStore<C> {
    async fn try_claim(
        &self,
        directory: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, SluiceError> {
        self.check_available()?;
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| SluiceError::Idempotency(format!("ttl out of range: {e}")))?;

        let mut claims = lock(&self.claims);
        if let Some(existing) = claims.get(directory)
            && existing.expires_at > now
        {
            return Ok(false);
        }
        claims.insert(
            directory.to_string(),
            Claim {
                owner: owner.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn release(&self, directory: &str, owner: &str) -> Result<(), SluiceError> {
        self.check_available()?;
        let mut claims = lock(&self.claims);
        if claims.get(directory).is_some_and(|claim| claim.owner == owner) {
            claims.remove(directory);
        }
        Ok(())
    }
}

/// 常に claim 成功。idempotency table が設定されていないときに使う。
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIdempotencyStore;

#[async_trait]
impl IdempotencyStore for NoopIdempotencyStore {
    async fn try_claim(&self, _directory: &str, _owner: &str, _ttl: Duration) -> Result<bool, SluiceError> {
        Ok(true)
    }

    async fn release(&self, _directory: &str, _owner: &str) -> Result<(), SluiceError> {
        Ok(())
    }
}
