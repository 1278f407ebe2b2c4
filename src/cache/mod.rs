//! Cache entries, key derivation and archive packing
//!
//! Keys are content-addressed: a cache entry's key is derived from the SHA256
//! of its manifest, so a changed manifest always maps to a new remote object.
//!
//! # Key Format
//!
//! ```text
//! {prefix}_{sha256 hex}_{os}_{arch}.tar.gz
//! ```

pub mod archive;
pub mod entry;
pub mod key;

pub use archive::{pack, unpack, ScratchArchive};
pub use entry::{CacheEntry, DownloadPolicy};
pub use key::{derive_key, manifest_checksum, CacheKey, Platform};
