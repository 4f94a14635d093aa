//! Advisory lock held next to the document for the duration of a run.
//!
//! The lock is an OS file lock on `<document>.lock`, so the kernel releases it
//! when the process dies. A lock file left behind by a killed run is simply
//! locked again by the next one.

use crate::error::SyncError;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

// A finishing run unlinks the lock file; a run that opened it just before
// that retries on the fresh file.
const ACQUIRE_ATTEMPTS: usize = 3;

/// An exclusive lock on `<document>.lock`. The file is removed on drop.
#[derive(Debug)]
pub struct DocumentLock {
    path: PathBuf,
    file: File,
}

impl DocumentLock {
    /// Locks `document`, failing if another live run holds the lock.
    pub fn acquire(document: &Path) -> Result<Self, SyncError> {
        let path = lock_path(document);
        let lock_error = |source: io::Error| SyncError::Lock {
            path: path.clone(),
            source,
        };
        let locked = || SyncError::Locked {
            document: document.to_path_buf(),
            lock: path.clone(),
        };

        for _ in 0..ACQUIRE_ATTEMPTS {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)
                .map_err(lock_error)?;

            match file.try_lock() {
                Ok(()) => {}
                Err(TryLockError::WouldBlock) => return Err(locked()),
                Err(TryLockError::Error(source)) => return Err(lock_error(source)),
            }

            if !is_same_file(&file, &path).map_err(lock_error)? {
                log::debug!("Lock file {} was replaced, retrying", path.display());
                continue;
            }

            let mut lock = Self { path, file };
            lock.record_pid();
            log::debug!("Acquired lock {}", lock.path.display());
            return Ok(lock);
        }

        Err(locked())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // The pid is informational only.
    fn record_pid(&mut self) {
        let written = self
            .file
            .set_len(0)
            .and_then(|()| self.file.rewind())
            .and_then(|()| writeln!(self.file, "{}", std::process::id()));
        if let Err(err) = written {
            log::debug!("Failed to record pid in {}: {err}", self.path.display());
        }
    }
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        // Unlink while still holding the lock; closing the file releases it.
        if let Err(err) = fs::remove_file(&self.path) {
            log::warn!("Failed to remove lock file {}: {err}", self.path.display());
        }
    }
}

fn lock_path(document: &Path) -> PathBuf {
    let mut name = document
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".lock");
    document.with_file_name(name)
}

/// Whether `path` still names the file we locked.
#[cfg(unix)]
fn is_same_file(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file.metadata()?;
    match fs::metadata(path) {
        Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

// Open files cannot be unlinked here, so the path cannot change under us.
#[cfg(not(unix))]
fn is_same_file(_file: &File, _path: &Path) -> io::Result<bool> {
    Ok(true)
}
