//! Deadlines and bounded retries around remote calls
//!
//! Only idempotent calls (`exists`, `download`) are retried. Uploads are
//! check-then-act and deletes are reported as-is, so neither is repeated here.

use crate::error::{DepCacheError, DepCacheResult};
use crate::store::ObjectStore;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default pause before the first retry; grows linearly per attempt
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Per-call limits applied to every remote operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Deadline for a single call (None = wait indefinitely)
    pub timeout: Option<Duration>,
    /// Extra attempts for idempotent calls after a retryable failure
    pub retries: u32,
    /// Base delay between attempts
    pub backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: None,
            retries: 0,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl CallPolicy {
    /// Build a policy from CLI-style values, where a zero timeout means none
    pub fn new(timeout_secs: u64, retries: u32) -> Self {
        Self {
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            retries,
            ..Self::default()
        }
    }
}

/// Object store handle that enforces a [`CallPolicy`]
#[derive(Clone)]
pub struct GuardedStore {
    inner: Arc<dyn ObjectStore>,
    policy: CallPolicy,
}

impl GuardedStore {
    pub fn new(inner: Arc<dyn ObjectStore>, policy: CallPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn location(&self) -> String {
        self.inner.location()
    }

    pub async fn exists(&self, key: &str) -> DepCacheResult<bool> {
        self.retrying("exists", key, || self.inner.exists(key)).await
    }

    pub async fn download(&self, key: &str, dest: &Path) -> DepCacheResult<()> {
        self.retrying("download", key, || self.inner.download(key, dest))
            .await
    }

    pub async fn upload(&self, key: &str, source: &Path) -> DepCacheResult<()> {
        self.bounded("upload", key, self.inner.upload(key, source))
            .await
    }

    pub async fn delete(&self, key: &str) -> DepCacheResult<()> {
        self.bounded("delete", key, self.inner.delete(key)).await
    }

    async fn retrying<T, F, Fut>(
        &self,
        operation: &'static str,
        key: &str,
        call: F,
    ) -> DepCacheResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = DepCacheResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match self.bounded(operation, key, call()).await {
                Err(e) if e.is_retryable() && attempt < self.policy.retries => {
                    attempt += 1;
                    warn!(
                        "{}: {} failed ({}), retry {}/{}",
                        key, operation, e, attempt, self.policy.retries
                    );
                    tokio::time::sleep(self.policy.backoff * attempt).await;
                }
                result => return result,
            }
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        key: &str,
        call: impl Future<Output = DepCacheResult<T>>,
    ) -> DepCacheResult<T> {
        match self.policy.timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| DepCacheError::StoreTimeout {
                    operation,
                    key: key.to_string(),
                    timeout,
                })?,
            None => call.await,
        }
    }
}
