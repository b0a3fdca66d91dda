//! Temporary per-segment artifact storage.

use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension used for segment artifacts.
pub const SEGMENT_EXTENSION: &str = "wav";

/// Naming and lifecycle of segment artifacts under one directory.
///
/// The directory is created on first use; deletions are idempotent.
#[derive(Debug, Clone)]
pub struct SegmentStore {
    dir: PathBuf,
}

impl SegmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `index`, creating the directory if needed.
    pub fn segment_path(&self, index: usize) -> io::Result<PathBuf> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
            debug!("Created segment directory {}", self.dir.display());
        }
        Ok(self.path_for(index))
    }

    /// Whether an artifact for `index` exists on disk.
    pub fn exists(&self, index: usize) -> bool {
        self.path_for(index).is_file()
    }

    /// Delete the artifact for `index`. Missing files are not an error.
    pub fn remove_segment(&self, index: usize) -> io::Result<()> {
        remove_file_if_exists(&self.path_for(index))
    }

    /// Delete the whole directory. A missing directory is not an error.
    pub fn purge(&self) -> io::Result<()> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                debug!("Purged segment directory {}", self.dir.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.{}", index, SEGMENT_EXTENSION))
    }
}

/// Remove a file, treating "not found" as success.
pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
