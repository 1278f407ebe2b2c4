//! Per-entry results of a sync run

use crate::error::{DepCacheError, DepCacheResult};
use std::fmt;
use std::path::PathBuf;

/// Why an entry finished without transferring anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Upload: the key is already stored
    AlreadyUploaded,
    /// Download: nothing stored under the key
    NotInStore,
    /// Download: `skip_not_empty` policy and the directory has content
    LocalDirectoryPopulated,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::AlreadyUploaded => "already uploaded",
            Self::NotInStore => "not in store",
            Self::LocalDirectoryPopulated => "local directory not empty",
        };
        write!(f, "{}", reason)
    }
}

/// Terminal state of a successful entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Status: archive exists remotely
    Found,
    /// Status: archive does not exist remotely
    Missing,
    /// Upload: archive packed and stored
    Uploaded,
    /// Download: archive fetched and extracted
    Restored,
    /// Reset: deletion requested
    Deleted,
    Skipped(SkipReason),
}

impl Outcome {
    /// Short status word for reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::Missing => "missing",
            Self::Uploaded => "uploaded",
            Self::Restored => "restored",
            Self::Deleted => "deleted",
            Self::Skipped(_) => "skipped",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped(reason) => write!(f, "skipped ({})", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// What happened to one cache entry
#[derive(Debug)]
pub struct EntryReport {
    pub prefix: String,
    pub manifest: PathBuf,
    pub path: PathBuf,
    /// Derived key, absent when validation or preparation failed
    pub key: Option<String>,
    pub result: DepCacheResult<Outcome>,
}

impl EntryReport {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }

    /// Key if known, otherwise the prefix; used to tag log and report lines
    pub fn label(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.prefix)
    }
}

/// Results of one run, in configuration order
#[derive(Debug, Default)]
pub struct RunReport {
    entries: Vec<EntryReport>,
}

impl RunReport {
    pub fn new(entries: Vec<EntryReport>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[EntryReport] {
        &self.entries
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_failure()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(EntryReport::is_failure)
    }

    /// Ok when every entry succeeded, otherwise an `EntriesFailed` summary
    pub fn into_result(self) -> DepCacheResult<()> {
        let failed = self.failed_count();
        if failed == 0 {
            Ok(())
        } else {
            Err(DepCacheError::EntriesFailed {
                failed,
                total: self.entries.len(),
            })
        }
    }
}
