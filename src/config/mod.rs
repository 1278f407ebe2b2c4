//! Configuration management for depcache
//!
//! Loading resolves two kinds of indirection before the config is handed to
//! the rest of the program:
//!
//! - `$NAME` inside any string value is replaced by the environment
//!   variable's value (empty when unset)
//! - `s3.key` / `s3.secret` written as `file://<path>` are read from that file
//!   and trimmed

pub mod schema;

pub use schema::{CacheEntryConfig, Config, S3Config};

use crate::error::{DepCacheError, DepCacheResult};
use regex::{Captures, Regex};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;
use tracing::debug;

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "depcache.json";

const SECRET_FILE_SCHEME: &str = "file://";

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$([a-z0-9_]+)").expect("environment variable pattern is valid")
});

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Pick the config file: explicit path, then `./depcache.json`, then the
    /// user config directory
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        if let Some(path) = explicit {
            return Self::with_path(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            debug!("Found local config: {}", local.display());
            return Self::with_path(local);
        }

        Self::with_path(Self::default_config_path())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("depcache")
            .join("config.json")
    }

    /// Load and resolve the configuration file
    pub async fn load(&self) -> DepCacheResult<Config> {
        let path = &self.config_path;
        if !path.exists() {
            return Err(DepCacheError::ConfigNotFound(path.clone()));
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| DepCacheError::io(format!("reading config from {}", path.display()), e))?;

        let mut config = parse_config(path, &content, |name| std::env::var(name).ok())?;
        resolve_secret(&mut config.s3.key).await?;
        resolve_secret(&mut config.s3.secret).await?;

        debug!(
            "Loaded {} cache entries from {}",
            config.cache.len(),
            path.display()
        );
        Ok(config)
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

/// Parse a config document, substituting environment variables in its strings
fn parse_config(
    path: &Path,
    content: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> DepCacheResult<Config> {
    let invalid = |e: serde_json::Error| DepCacheError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut document: Value = serde_json::from_str(content).map_err(invalid)?;
    substitute_in_value(&mut document, &lookup);
    serde_json::from_value(document).map_err(invalid)
}

fn substitute_in_value(value: &mut Value, lookup: &impl Fn(&str) -> Option<String>) {
    match value {
        Value::String(s) => {
            if ENV_VAR.is_match(s) {
                *s = substitute_env_vars(s, lookup);
            }
        }
        Value::Array(items) => items
            .iter_mut()
            .for_each(|item| substitute_in_value(item, lookup)),
        Value::Object(map) => map
            .values_mut()
            .for_each(|item| substitute_in_value(item, lookup)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Replace every `$NAME` in `input`; unset variables become empty strings
pub fn substitute_env_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    ENV_VAR
        .replace_all(input, |caps: &Captures<'_>| {
            lookup(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// Replace a `file://<path>` value with the trimmed contents of that file
async fn resolve_secret(value: &mut String) -> DepCacheResult<()> {
    let Some(secret_path) = value.strip_prefix(SECRET_FILE_SCHEME) else {
        return Ok(());
    };

    let contents = fs::read_to_string(secret_path)
        .await
        .map_err(|e| DepCacheError::io(format!("reading secret file {}", secret_path), e))?;

    *value = contents.trim().to_string();
    Ok(())
}
