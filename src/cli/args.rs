//! CLI argument definitions using clap derive

use crate::sync::Operation;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// depcache - Dependency cache synchronizer
///
/// Uploads and restores dependency directories to S3, keyed by the checksum
/// of their manifest files.
#[derive(Parser, Debug)]
#[command(name = "depcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DEPCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Format of the final report
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Deadline in seconds for each remote call (0 = none)
    #[arg(long, global = true, env = "DEPCACHE_TIMEOUT", default_value = "0")]
    pub timeout: u64,

    /// Retries for existence checks and downloads
    #[arg(long, global = true, env = "DEPCACHE_RETRIES", default_value = "0")]
    pub retries: u32,

    /// Directory for temporary archives (defaults to the system temp dir)
    #[arg(long, global = true)]
    pub scratch_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Check whether each cache exists in the bucket
    Status,

    /// Archive and upload caches that are not in the bucket yet
    Upload,

    /// Download and extract caches into their directories
    Download,

    /// Delete each cache from the bucket
    Reset,

    /// Print version information
    Version,
}

impl Commands {
    /// The sync operation for this command, if it runs one
    pub fn operation(self) -> Option<Operation> {
        match self {
            Self::Status => Some(Operation::Status),
            Self::Upload => Some(Operation::Upload),
            Self::Download => Some(Operation::Download),
            Self::Reset => Some(Operation::Reset),
            Self::Version => None,
        }
    }
}

/// Output format for the run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// JSON output
    Json,
}
