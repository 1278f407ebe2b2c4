//! Configuration schema for depcache
//!
//! Configuration is a JSON document, by default `./depcache.json`.

use crate::error::{DepCacheError, DepCacheResult};
use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Object store settings
    pub s3: S3Config,

    /// Cache entries to synchronize
    pub cache: Vec<CacheEntryConfig>,
}

impl Config {
    /// Setup-time checks; failures here are fatal for the whole run
    pub fn validate(&self) -> DepCacheResult<()> {
        if self.cache.is_empty() {
            return Err(DepCacheError::NoCacheEntries);
        }
        self.s3.validate()
    }
}

/// S3 bucket and credential settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// Access key ID (empty = ambient credentials)
    pub key: String,

    /// Secret access key (empty = ambient credentials)
    pub secret: String,

    /// AWS region
    pub region: String,

    /// Bucket holding cache archives
    pub bucket: String,

    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,

    /// Use path-style addressing (`endpoint/bucket/key`)
    pub force_path_style: bool,
}

impl S3Config {
    /// Check the settings required before any store call is made
    pub fn validate(&self) -> DepCacheResult<()> {
        if self.bucket.is_empty() {
            return Err(DepCacheError::MissingSetting("s3.bucket"));
        }
        if self.region.is_empty() {
            return Err(DepCacheError::MissingSetting("s3.region"));
        }
        match (self.key.is_empty(), self.secret.is_empty()) {
            (true, false) => Err(DepCacheError::MissingSetting("s3.key")),
            (false, true) => Err(DepCacheError::MissingSetting("s3.secret")),
            _ => Ok(()),
        }
    }

    /// Whether credentials come from the environment rather than the config
    pub fn uses_ambient_credentials(&self) -> bool {
        self.key.is_empty() && self.secret.is_empty()
    }
}

/// One configured cache entry, as written in the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheEntryConfig {
    /// File whose contents determine cache validity (Gemfile.lock, etc.)
    pub manifest: PathBuf,

    /// Directory holding the cached dependencies
    pub path: PathBuf,

    /// Namespace for this entry's keys
    pub prefix: String,

    /// "default" or "skip_not_empty"
    pub download_policy: Option<String>,
}
