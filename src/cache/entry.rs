//! Cache entries: one manifest, one directory, one prefix
//!
//! An entry is validated from its configuration, then prepared once per run
//! to compute its key. Every transfer requires a prepared entry.

use crate::cache::key::{derive_key, CacheKey, Platform};
use crate::config::schema::CacheEntryConfig;
use crate::error::{DepCacheError, DepCacheResult};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Rule deciding whether a download may be skipped based on local state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DownloadPolicy {
    /// Always consult the store
    #[default]
    Default,
    /// Skip the download entirely when the target directory has any content.
    ///
    /// This only checks emptiness, not freshness: a stale but non-empty
    /// directory is never refreshed under this policy.
    SkipNotEmpty,
}

impl FromStr for DownloadPolicy {
    type Err = DepCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "default" => Ok(Self::Default),
            "skip_not_empty" => Ok(Self::SkipNotEmpty),
            other => Err(DepCacheError::InvalidDownloadPolicy {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DownloadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::SkipNotEmpty => write!(f, "skip_not_empty"),
        }
    }
}

/// A validated cache entry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    manifest: PathBuf,
    path: PathBuf,
    prefix: String,
    download_policy: DownloadPolicy,
    key: Option<CacheKey>,
}

impl CacheEntry {
    /// Validate an entry's configuration
    ///
    /// An absent or empty download policy means [`DownloadPolicy::Default`].
    pub fn validate(config: &CacheEntryConfig) -> DepCacheResult<Self> {
        if config.manifest.as_os_str().is_empty() {
            return Err(DepCacheError::MissingSetting("cache.manifest"));
        }
        if config.path.as_os_str().is_empty() {
            return Err(DepCacheError::MissingSetting("cache.path"));
        }
        if config.prefix.is_empty() {
            return Err(DepCacheError::MissingSetting("cache.prefix"));
        }

        let download_policy = config
            .download_policy
            .as_deref()
            .map(str::parse::<DownloadPolicy>)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            manifest: config.manifest.clone(),
            path: config.path.clone(),
            prefix: config.prefix.clone(),
            download_policy,
            key: None,
        })
    }

    /// Compute this entry's key from the manifest on disk
    ///
    /// Safe to call repeatedly; the key is recomputed each time.
    pub fn prepare(&mut self, platform: Platform) -> DepCacheResult<&CacheKey> {
        let key = derive_key(&self.manifest, &self.prefix, platform)?;
        Ok(self.key.insert(key))
    }

    /// The derived key, or an error if [`CacheEntry::prepare`] has not run
    pub fn key(&self) -> DepCacheResult<&CacheKey> {
        self.key.as_ref().ok_or_else(|| {
            DepCacheError::Internal(format!("cache entry {} used before prepare", self.prefix))
        })
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn download_policy(&self) -> DownloadPolicy {
        self.download_policy
    }

    /// Whether a download can be skipped without asking the store
    pub fn local_directory_populated(&self) -> bool {
        self.download_policy == DownloadPolicy::SkipNotEmpty && dir_has_entries(&self.path)
    }
}

/// True when `path` is a directory containing at least one entry
fn dir_has_entries(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
