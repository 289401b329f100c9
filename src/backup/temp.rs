//! Scoped temporary files
//!
//! Every intermediate file of a run (the compressed archive, the encrypted
//! archive) is allocated through a [`TempFileRegistry`]. The registry owns the
//! files; stages only get a [`ManagedTempFile`] handle carrying the path.
//! [`TempFileRegistry::release_all`] deletes them in allocation order at the
//! end of the run, and anything still registered is deleted when the registry
//! is dropped (early return, panic unwinding).

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};

use crate::error::{BackupError, BackupResult};
use crate::logging::RunLog;

const TEMP_PREFIX: &str = "lbkup-tmp-";

/// Handle to a file owned by a [`TempFileRegistry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedTempFile {
    path: PathBuf,
}

impl ManagedTempFile {
    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file for writing, truncating whatever it holds
    pub fn open_write(&self) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Allocates temporary files and releases all of them together
#[derive(Debug, Default)]
pub struct TempFileRegistry {
    /// Directory for new files; the system temp dir when `None`
    dir: Option<PathBuf>,
    /// Live files, in allocation order
    files: Vec<TempPath>,
}

impl TempFileRegistry {
    /// Registry creating files in the system temp directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry creating files in `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            files: Vec::new(),
        }
    }

    /// Create a new uniquely named, empty file ending in `suffix`
    pub fn allocate(&mut self, suffix: &str) -> BackupResult<ManagedTempFile> {
        let mut builder = Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(suffix);

        let file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| BackupError::Io(format!("Failed to create temporary file: {}", e)))?;

        let temp_path = file.into_temp_path();
        let handle = ManagedTempFile {
            path: temp_path.to_path_buf(),
        };
        self.files.push(temp_path);
        Ok(handle)
    }

    /// Number of files currently registered
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Delete every registered file, oldest first. Never fails: a file that is
    /// already gone or cannot be removed is logged and skipped.
    pub fn release_all(&mut self, log: &dyn RunLog) {
        log.info("Cleaning up...");
        for temp_path in self.files.drain(..) {
            let path = temp_path.to_path_buf();
            log.info(&format!("Removing {}", path.display()));
            if let Err(e) = temp_path.close() {
                if e.kind() == io::ErrorKind::NotFound {
                    log.info(&format!("{} was already removed", path.display()));
                } else {
                    log.error(&format!("Failed to remove {}: {}", path.display(), e));
                }
            }
        }
    }
}
