//! Advisory lock serializing ledger writers across processes.

use crate::error::{LedgerError, LedgerResult};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Lock file created inside the ledger directory.
pub const LOCK_FILE_NAME: &str = ".tidemark.lock";

/// Held lock; the file is removed when the guard drops.
#[derive(Debug)]
pub struct LedgerLock {
    path: PathBuf,
}

impl LedgerLock {
    /// Take the lock in `dir`, failing immediately if it is held.
    pub fn acquire(dir: &Path) -> LedgerResult<Self> {
        let path = dir.join(LOCK_FILE_NAME);
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => LedgerError::Locked {
                    path: path.display().to_string(),
                },
                _ => LedgerError::IoWithPath {
                    path: path.display().to_string(),
                    source: e,
                },
            })?;

        // Constructed before writing so a failed write still cleans up.
        let lock = Self { path };
        writeln!(file, "pid={}", std::process::id()).map_err(|e| LedgerError::IoWithPath {
            path: lock.path.display().to_string(),
            source: e,
        })?;
        log::debug!("Acquired ledger lock {}", lock.path.display());
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
