//! Cache synchronization engine
//!
//! Each configured cache entry runs through its own state machine on its own
//! task:
//!
//! | Step | Failure effect |
//! |------|----------------|
//! | Validate config | entry fails, no key derived |
//! | Prepare key | entry fails, no remote call made |
//! | Operation | entry ends Skipped / transferred / Deleted / Failed |
//!
//! A failing entry never stops its siblings; the run reports every entry.

mod engine;
mod report;

pub use engine::SyncEngine;
pub use report::{EntryReport, Outcome, RunReport, SkipReason};

use std::fmt;

/// Operation applied to every configured cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Report whether each entry's archive exists remotely
    Status,
    /// Archive and upload entries whose key is not yet stored
    Upload,
    /// Download and extract entries whose key is stored
    Download,
    /// Delete each entry's archive from the store
    Reset,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Status => "status",
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Reset => "reset",
        };
        write!(f, "{}", name)
    }
}
