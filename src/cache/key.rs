//! Manifest hashing and cache key derivation
//!
//! A cache key is derived from the manifest's contents, the entry prefix and
//! the platform the cache was built on. Same manifest bytes = same key.

use crate::error::{DepCacheError, DepCacheResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

/// Platform tags embedded in every cache key
///
/// Names follow the Go convention (`darwin`, `amd64`, `arm64`) so keys written
/// by earlier releases of the tool remain valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    /// Detect the current platform
    pub fn current() -> Self {
        Self {
            os: os_tag(std::env::consts::OS),
            arch: arch_tag(std::env::consts::ARCH),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

fn os_tag(os: &'static str) -> &'static str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn arch_tag(arch: &'static str) -> &'static str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "powerpc64" => "ppc64",
        other => other,
    }
}

/// Opaque object name for one cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from its parts: `{prefix}_{checksum}_{os}_{arch}.tar.gz`
    pub fn new(prefix: &str, checksum: &str, platform: Platform) -> Self {
        Self(format!(
            "{}_{}_{}_{}.tar.gz",
            prefix, checksum, platform.os, platform.arch
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name usable for a scratch archive of this key
    pub fn scratch_file_name(&self) -> String {
        self.0.replace('/', "_")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hash a manifest's full contents using SHA256, returning lower-case hex
pub fn manifest_checksum(path: &Path) -> DepCacheResult<String> {
    let read_err = |source| DepCacheError::ManifestRead {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_err)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(read_err)?;

    Ok(hex::encode(hasher.finalize()))
}

/// Derive the cache key for a manifest under `prefix` on `platform`
pub fn derive_key(manifest: &Path, prefix: &str, platform: Platform) -> DepCacheResult<CacheKey> {
    let checksum = manifest_checksum(manifest)?;
    Ok(CacheKey::new(prefix, &checksum, platform))
}
