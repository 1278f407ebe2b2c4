//! Remote object store access
//!
//! The sync engine talks to the store only through [`ObjectStore`], so tests
//! can substitute an in-memory implementation for S3.

mod guarded;
#[cfg(test)]
pub(crate) mod memory;
mod s3;

pub use guarded::{CallPolicy, GuardedStore};
pub use s3::S3Store;

use crate::error::DepCacheResult;
use async_trait::async_trait;
use std::path::Path;

/// Abstract object store interface
///
/// One instance is shared read-only by every concurrent cache task.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether an object named `key` exists
    async fn exists(&self, key: &str) -> DepCacheResult<bool>;

    /// Store the file at `source` under `key`
    async fn upload(&self, key: &str, source: &Path) -> DepCacheResult<()>;

    /// Write the object named `key` to the file at `dest`
    async fn download(&self, key: &str, dest: &Path) -> DepCacheResult<()>;

    /// Remove the object named `key`; missing objects are not an error
    async fn delete(&self, key: &str) -> DepCacheResult<()>;

    /// Human-readable location for log lines (e.g. `s3://bucket`)
    fn location(&self) -> String;
}
