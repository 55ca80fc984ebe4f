//! Advisory lock serialising runs over the same subtree.
//!
//! A run creates `.dupelink.lock` at its root with `create_new`, so a second
//! run over the same root fails immediately. Ancestors are checked too: a run
//! over `/data/photos` refuses to start while `/data` is locked. The lock is
//! removed when [`SubtreeLock`] is dropped. A lock left behind by a killed run
//! must be removed by hand.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Name of the lock file placed at the root of a run.
pub const LOCK_FILE_NAME: &str = ".dupelink.lock";

/// Error acquiring the subtree lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another run holds a lock on this root or an ancestor.
    #[error("another dupelink run holds {0} (remove it if no run is active)")]
    Held(PathBuf),

    /// The lock file could not be created.
    #[error("cannot create lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Held lock on a directory tree. Released on drop.
#[derive(Debug)]
pub struct SubtreeLock {
    path: PathBuf,
}

impl SubtreeLock {
    /// Lock `root` for the lifetime of the returned guard.
    ///
    /// # Errors
    ///
    /// [`LockError::Held`] if `root` or any ancestor is locked,
    /// [`LockError::Io`] if the lock file cannot be written.
    pub fn acquire(root: &Path) -> Result<Self, LockError> {
        if let Some(held) = locked_ancestor(root) {
            return Err(LockError::Held(held));
        }

        let path = root.join(LOCK_FILE_NAME);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| {
                if source.kind() == io::ErrorKind::AlreadyExists {
                    LockError::Held(path.clone())
                } else {
                    LockError::Io {
                        path: path.clone(),
                        source,
                    }
                }
            })?;

        let lock = Self { path };
        writeln!(file, "{}", std::process::id()).map_err(|source| LockError::Io {
            path: lock.path.clone(),
            source,
        })?;

        log::debug!("Acquired lock {}", lock.path.display());
        Ok(lock)
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SubtreeLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Released lock {}", self.path.display()),
            Err(e) => log::warn!("Failed to remove lock {}: {}", self.path.display(), e),
        }
    }
}

/// First lock file found in a strict ancestor of `root`.
fn locked_ancestor(root: &Path) -> Option<PathBuf> {
    let absolute = fs::canonicalize(root).ok()?;
    absolute
        .ancestors()
        .skip(1)
        .map(|dir| dir.join(LOCK_FILE_NAME))
        .find(|candidate| candidate.is_file())
}
