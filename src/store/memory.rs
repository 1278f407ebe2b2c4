//! In-memory object store for tests

use crate::error::{DepCacheError, DepCacheResult};
use crate::store::ObjectStore;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Per-operation call counters
#[derive(Debug, Default)]
pub struct CallCounts {
    pub exists: AtomicUsize,
    pub upload: AtomicUsize,
    pub download: AtomicUsize,
    pub delete: AtomicUsize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.exists.load(Ordering::SeqCst)
            + self.upload.load(Ordering::SeqCst)
            + self.download.load(Ordering::SeqCst)
            + self.delete.load(Ordering::SeqCst)
    }
}

/// Object store keeping blobs in a map, with knobs for failure injection
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failing_keys: Mutex<HashSet<String>>,
    hanging_keys: Mutex<HashSet<String>>,
    exists_failures: AtomicUsize,
    upload_failures: AtomicBool,
    pub calls: CallCounts,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Every operation on `key` fails with a store error
    pub fn fail_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// Every operation on `key` blocks for an hour
    pub fn hang_on(&self, key: &str) {
        self.hanging_keys.lock().unwrap().insert(key.to_string());
    }

    /// The next `n` existence checks fail regardless of key
    pub fn fail_next_exists(&self, n: usize) {
        self.exists_failures.store(n, Ordering::SeqCst);
    }

    /// Every upload fails after the body has been read
    pub fn fail_uploads(&self) {
        self.upload_failures.store(true, Ordering::SeqCst);
    }

    async fn check(&self, operation: &'static str, key: &str) -> DepCacheResult<()> {
        let hangs = self.hanging_keys.lock().unwrap().contains(key);
        if hangs {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(DepCacheError::store(operation, key, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn exists(&self, key: &str) -> DepCacheResult<bool> {
        self.calls.exists.fetch_add(1, Ordering::SeqCst);
        let pending = self.exists_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.exists_failures.store(pending - 1, Ordering::SeqCst);
            return Err(DepCacheError::store("exists", key, "transient failure"));
        }
        self.check("exists", key).await?;
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn upload(&self, key: &str, source: &Path) -> DepCacheResult<()> {
        self.calls.upload.fetch_add(1, Ordering::SeqCst);
        self.check("upload", key).await?;
        let data = tokio::fs::read(source)
            .await
            .map_err(|e| DepCacheError::store("upload", key, e.to_string()))?;
        if self.upload_failures.load(Ordering::SeqCst) {
            return Err(DepCacheError::store("upload", key, "injected upload failure"));
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn download(&self, key: &str, dest: &Path) -> DepCacheResult<()> {
        self.calls.download.fetch_add(1, Ordering::SeqCst);
        self.check("download", key).await?;
        let data = self
            .get(key)
            .ok_or_else(|| DepCacheError::store("download", key, "NoSuchKey"))?;
        tokio::fs::write(dest, data)
            .await
            .map_err(|e| DepCacheError::io(format!("writing {}", dest.display()), e))
    }

    async fn delete(&self, key: &str) -> DepCacheResult<()> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.check("delete", key).await?;
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn location(&self) -> String {
        "memory://test".to_string()
    }
}
