//! Concurrent per-entry execution of sync operations

use crate::cache::{self, CacheEntry, CacheKey, Platform, ScratchArchive};
use crate::config::CacheEntryConfig;
use crate::error::{DepCacheError, DepCacheResult};
use crate::store::GuardedStore;
use crate::sync::report::{EntryReport, Outcome, RunReport, SkipReason};
use crate::sync::Operation;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Runs one operation across many cache entries, one task per entry
#[derive(Clone)]
pub struct SyncEngine {
    store: GuardedStore,
    scratch_dir: PathBuf,
    platform: Platform,
}

impl SyncEngine {
    /// Create an engine writing scratch archives into `scratch_dir`
    pub fn new(store: GuardedStore, scratch_dir: PathBuf) -> Self {
        Self {
            store,
            scratch_dir,
            platform: Platform::current(),
        }
    }

    /// Override the platform embedded in derived keys
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Run `operation` for every entry and wait for all of them
    ///
    /// Never returns early: every entry reaches a terminal state and appears in
    /// the report, in the order it was configured.
    pub async fn run(&self, operation: Operation, entries: &[CacheEntryConfig]) -> RunReport {
        info!(
            "Running {} for {} cache entries against {}",
            operation,
            entries.len(),
            self.store.location()
        );

        let mut tasks = JoinSet::new();
        for (index, config) in entries.iter().cloned().enumerate() {
            let engine = self.clone();
            tasks.spawn(async move { (index, engine.run_entry(operation, config).await) });
        }

        let mut slots: Vec<Option<EntryReport>> = entries.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(report);
                    }
                }
                Err(e) => error!("Cache task ended abnormally: {}", e),
            }
        }

        let reports = slots
            .into_iter()
            .zip(entries)
            .map(|(slot, config)| {
                slot.unwrap_or_else(|| EntryReport {
                    prefix: config.prefix.clone(),
                    manifest: config.manifest.clone(),
                    path: config.path.clone(),
                    key: None,
                    result: Err(DepCacheError::Internal("cache task panicked".to_string())),
                })
            })
            .collect();

        RunReport::new(reports)
    }

    async fn run_entry(&self, operation: Operation, config: CacheEntryConfig) -> EntryReport {
        let mut key = None;
        let result = self.drive(operation, &config, &mut key).await;

        let report = EntryReport {
            prefix: config.prefix,
            manifest: config.manifest,
            path: config.path,
            key,
            result,
        };
        if let Err(e) = &report.result {
            error!("{}: {} failed: {}", report.label(), operation, e);
        }
        report
    }

    /// Validate, prepare, then perform the operation for one entry
    async fn drive(
        &self,
        operation: Operation,
        config: &CacheEntryConfig,
        key_slot: &mut Option<String>,
    ) -> DepCacheResult<Outcome> {
        let entry = CacheEntry::validate(config)?;
        let entry = self.prepare(entry).await?;
        let key = entry.key()?.to_string();
        *key_slot = Some(key.clone());

        match operation {
            Operation::Status => self.status(&key).await,
            Operation::Upload => self.upload(&entry, &key).await,
            Operation::Download => self.download(&entry, &key).await,
            Operation::Reset => self.reset(&key).await,
        }
    }

    async fn prepare(&self, mut entry: CacheEntry) -> DepCacheResult<CacheEntry> {
        let platform = self.platform;
        tokio::task::spawn_blocking(move || -> DepCacheResult<CacheEntry> {
            let key = entry.prepare(platform)?.clone();
            debug!("{}: derived from {}", key, entry.manifest().display());
            Ok(entry)
        })
        .await?
    }

    async fn status(&self, key: &str) -> DepCacheResult<Outcome> {
        debug!("Checking {}", key);
        if self.store.exists(key).await? {
            info!("{}: cache exists", key);
            Ok(Outcome::Found)
        } else {
            info!("{}: cache does not exist", key);
            Ok(Outcome::Missing)
        }
    }

    async fn upload(&self, entry: &CacheEntry, key: &str) -> DepCacheResult<Outcome> {
        debug!("Checking {}", key);
        if self.store.exists(key).await? {
            info!("{}: cache exists, skipping upload", key);
            return Ok(Outcome::Skipped(SkipReason::AlreadyUploaded));
        }

        let scratch = self.scratch_for(entry.key()?).await?;
        info!("{}: archiving {}", key, entry.path().display());
        run_blocking(entry.path(), scratch.path(), cache::pack).await?;

        info!("{}: uploading to {}", key, self.store.location());
        self.store.upload(key, scratch.path()).await?;

        info!("{}: upload complete", key);
        Ok(Outcome::Uploaded)
    }

    async fn download(&self, entry: &CacheEntry, key: &str) -> DepCacheResult<Outcome> {
        let populated = {
            let entry = entry.clone();
            tokio::task::spawn_blocking(move || entry.local_directory_populated()).await?
        };
        if populated {
            info!(
                "{}: {} is not empty, skipping download",
                key,
                entry.path().display()
            );
            return Ok(Outcome::Skipped(SkipReason::LocalDirectoryPopulated));
        }

        debug!("Checking {}", key);
        if !self.store.exists(key).await? {
            info!("{}: cache not found, nothing to restore", key);
            return Ok(Outcome::Skipped(SkipReason::NotInStore));
        }

        let scratch = self.scratch_for(entry.key()?).await?;
        info!("{}: downloading from {}", key, self.store.location());
        self.store.download(key, scratch.path()).await?;

        info!("{}: extracting into {}", key, entry.path().display());
        run_blocking(scratch.path(), entry.path(), cache::unpack).await?;

        info!("{}: restore complete", key);
        Ok(Outcome::Restored)
    }

    /// Reserve a scratch archive unique to this call
    async fn scratch_for(&self, key: &CacheKey) -> DepCacheResult<ScratchArchive> {
        let (dir, key) = (self.scratch_dir.clone(), key.clone());
        tokio::task::spawn_blocking(move || ScratchArchive::create(&dir, &key)).await?
    }

    async fn reset(&self, key: &str) -> DepCacheResult<Outcome> {
        info!("{}: deleting from {}", key, self.store.location());
        self.store.delete(key).await?;
        Ok(Outcome::Deleted)
    }
}

/// Run a filesystem-heavy archive step on the blocking pool
async fn run_blocking(
    from: &Path,
    to: &Path,
    step: fn(&Path, &Path) -> DepCacheResult<()>,
) -> DepCacheResult<()> {
    let (from, to) = (from.to_path_buf(), to.to_path_buf());
    tokio::task::spawn_blocking(move || step(&from, &to)).await?
}
