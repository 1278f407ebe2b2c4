//! depcache - Dependency cache synchronizer
//!
//! Archives dependency directories, stores them in S3 under a key derived
//! from the manifest checksum and platform, and restores them on later runs.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod store;
pub mod sync;

pub use error::{DepCacheError, DepCacheResult};
