//! Gzip-compressed tar archives of cache directories
//!
//! Archives are rooted at `.` so extracting into any directory restores the
//! same relative tree. Extraction overwrites files already present.

use crate::cache::key::CacheKey;
use crate::error::{DepCacheError, DepCacheResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Pack everything under `source_dir` into a `.tar.gz` at `output`
pub fn pack(source_dir: &Path, output: &Path) -> DepCacheResult<()> {
    if !source_dir.is_dir() {
        return Err(DepCacheError::archive(
            source_dir,
            "source is not a readable directory",
        ));
    }

    let file = File::create(output).map_err(|e| DepCacheError::archive(output, e))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    builder
        .append_dir_all(".", source_dir)
        .map_err(|e| DepCacheError::archive(source_dir, e))?;

    let mut writer = builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .map_err(|e| DepCacheError::archive(output, e))?;
    writer
        .flush()
        .map_err(|e| DepCacheError::archive(output, e))?;

    debug!("Packed {} into {}", source_dir.display(), output.display());
    Ok(())
}

/// Extract the `.tar.gz` at `archive` into `dest_dir`, creating it if needed
pub fn unpack(archive: &Path, dest_dir: &Path) -> DepCacheResult<()> {
    fs::create_dir_all(dest_dir).map_err(|e| DepCacheError::archive(dest_dir, e))?;

    let file = File::open(archive).map_err(|e| DepCacheError::archive(archive, e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.set_overwrite(true);
    tar.set_preserve_permissions(true);
    tar.set_preserve_mtime(true);

    tar.unpack(dest_dir)
        .map_err(|e| DepCacheError::archive(archive, e))?;

    debug!("Extracted {} into {}", archive.display(), dest_dir.display());
    Ok(())
}

/// A scratch archive path that is removed when dropped
///
/// The file name starts with the entry's key and ends with a random suffix,
/// so entries sharing a key (or concurrent runs sharing a scratch directory)
/// never write to the same file.
#[derive(Debug)]
pub struct ScratchArchive {
    path: PathBuf,
}

impl ScratchArchive {
    /// Create an empty, uniquely named scratch file for `key` in `scratch_dir`
    pub fn create(scratch_dir: &Path, key: &CacheKey) -> DepCacheResult<Self> {
        let context = || format!("creating scratch archive in {}", scratch_dir.display());
        let path = tempfile::Builder::new()
            .prefix(&format!("{}.", key.scratch_file_name()))
            .tempfile_in(scratch_dir)
            .map_err(|e| DepCacheError::io(context(), e))?
            .into_temp_path()
            .keep()
            .map_err(|e| DepCacheError::io(context(), e.error))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchArchive {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed scratch archive {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove scratch archive {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
