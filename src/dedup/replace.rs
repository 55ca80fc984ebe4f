//! Atomic hardlink replacement.
//!
//! # Overview
//!
//! Replaces a duplicate file with a hardlink to its canonical copy without a
//! window in which the duplicate's path has no content:
//!
//! 1. Hardlink the canonical file under a unique hidden name next to the
//!    duplicate.
//! 2. Rename that link over the duplicate. On one filesystem this swaps the
//!    directory entry atomically.
//! 3. If the rename fails, remove the temporary link. The duplicate is
//!    untouched.
//!
//! Nothing is unlinked before the new link exists.
//!
//! # Safety
//!
//! [`FileSnapshot`] captures size, modification time and inode when a file is
//! enumerated; [`FileSnapshot::verify`] re-checks them right before
//! replacement so a file rewritten during the scan is left alone.
//!
//! # Example
//!
//! ```no_run
//! use dupelink::dedup::replace::replace_duplicate;
//! use std::path::Path;
//!
//! match replace_duplicate(Path::new("/data/b.txt"), Path::new("/data/a.txt")) {
//!     Ok(()) => println!("linked"),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use thiserror::Error;

use super::index::IndexEntry;
use crate::scanner::{FileEntry, InodeKey};

/// How many temporary names are tried before giving up.
const MAX_TEMP_ATTEMPTS: u32 = 16;

/// Infix marking temporary link names.
pub const TEMP_MARKER: &str = ".dupelink-";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Error type for replacement operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Duplicate and canonical live on different filesystems.
    #[error("cannot link across filesystems: {duplicate} -> {canonical}")]
    CrossDevice {
        duplicate: PathBuf,
        canonical: PathBuf,
    },

    /// Both paths already name the same inode.
    #[error("already the same file: {duplicate} -> {canonical}")]
    SameFile {
        duplicate: PathBuf,
        canonical: PathBuf,
    },

    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when creating the link or renaming.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Not a regular file any more.
    #[error("not a regular file: {0}")]
    NotRegularFile(PathBuf),

    /// File was modified since it was scanned.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// Byte comparison disagreed with the fingerprint.
    #[error("contents differ despite matching fingerprint: {duplicate} vs {canonical}")]
    ContentMismatch {
        duplicate: PathBuf,
        canonical: PathBuf,
    },

    /// Every candidate temporary name was taken.
    #[error("no free temporary name next to {0}")]
    TempNameExhausted(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LinkError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Snapshot of file state for modification detection.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: Option<SystemTime>,
    /// Storage identity.
    pub inode: Option<InodeKey>,
}

impl FileSnapshot {
    /// Capture a snapshot of a file's current state (without following
    /// symlinks).
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist, can't be accessed, or is not a
    /// regular file.
    pub fn capture(path: &Path) -> Result<Self, LinkError> {
        let metadata = fs::symlink_metadata(path).map_err(|e| LinkError::from_io(path, e))?;
        if !metadata.is_file() {
            return Err(LinkError::NotRegularFile(path.to_path_buf()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mtime: metadata.modified().ok(),
            inode: InodeKey::from_metadata(&metadata),
        })
    }

    /// Snapshot from what the walker recorded at enumeration time.
    #[must_use]
    pub fn from_entry(entry: &FileEntry) -> Self {
        Self {
            path: entry.path.clone(),
            size: entry.size,
            mtime: entry.modified,
            inode: entry.inode,
        }
    }

    /// Snapshot of a canonical file as it was when it was indexed.
    #[must_use]
    pub fn from_index_entry(entry: &IndexEntry) -> Self {
        Self {
            path: entry.path.clone(),
            size: entry.size,
            mtime: entry.modified,
            inode: entry.inode,
        }
    }

    /// Verify that the file still matches this snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if file was modified, replaced, deleted, or can't be
    /// accessed.
    pub fn verify(&self) -> Result<(), LinkError> {
        let current = Self::capture(&self.path)?;

        if let (Some(orig), Some(curr)) = (self.mtime, current.mtime) {
            if orig != curr {
                log::warn!(
                    "File modified since scan: {} (mtime changed)",
                    self.path.display()
                );
                return Err(LinkError::Modified(self.path.clone()));
            }
        }

        if self.size != current.size {
            log::warn!(
                "File modified since scan: {} (size changed from {} to {})",
                self.path.display(),
                self.size,
                current.size
            );
            return Err(LinkError::Modified(self.path.clone()));
        }

        if self.inode != current.inode {
            log::warn!("File replaced since scan: {}", self.path.display());
            return Err(LinkError::Modified(self.path.clone()));
        }

        Ok(())
    }
}

/// Whether a file name is one of our temporary links:
/// `.<name>.dupelink-<pid>-<counter>-<attempt>`.
#[must_use]
pub fn is_temp_name(name: &std::ffi::OsStr) -> bool {
    let name = name.to_string_lossy();
    if !name.starts_with('.') {
        return false;
    }
    let Some(idx) = name.rfind(TEMP_MARKER) else {
        return false;
    };
    let suffix = &name[idx + TEMP_MARKER.len()..];
    let parts: Vec<&str> = suffix.split('-').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

/// Build the `n`th candidate temporary path next to `duplicate`.
fn temp_path(duplicate: &Path, attempt: u32) -> Option<PathBuf> {
    let parent = duplicate.parent()?;
    let file_name = duplicate.file_name()?;

    let mut name = OsString::from(".");
    name.push(file_name);
    name.push(format!(
        "{}{}-{}-{}",
        TEMP_MARKER,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
        attempt
    ));
    Some(parent.join(name))
}

/// Replace `duplicate` with a hardlink to `canonical`.
///
/// On success both paths name the same inode. On any error the duplicate is
/// left exactly as it was and no temporary file remains.
///
/// # Errors
///
/// - `NotRegularFile` / `NotFound` if either side is not a regular file
/// - `SameFile` if both already share an inode
/// - `CrossDevice` if they live on different filesystems
/// - `TempNameExhausted`, `PermissionDenied` or `Io` if linking or renaming
///   fails
pub fn replace_duplicate(duplicate: &Path, canonical: &Path) -> Result<(), LinkError> {
    let dup = FileSnapshot::capture(duplicate)?;
    let canon = FileSnapshot::capture(canonical)?;

    if let (Some(d), Some(c)) = (dup.inode, canon.inode) {
        if d == c {
            return Err(LinkError::SameFile {
                duplicate: duplicate.to_path_buf(),
                canonical: canonical.to_path_buf(),
            });
        }
        if !d.same_device(&c) {
            return Err(LinkError::CrossDevice {
                duplicate: duplicate.to_path_buf(),
                canonical: canonical.to_path_buf(),
            });
        }
    }

    let temp = link_to_temp(duplicate, canonical)?;
    log::trace!(
        "Linked {} -> {} (temporary)",
        temp.display(),
        canonical.display()
    );

    rename_over(&temp, duplicate)?;

    log::debug!(
        "Replaced {} with link to {}",
        duplicate.display(),
        canonical.display()
    );
    Ok(())
}

/// Move `temp` over `duplicate`, removing `temp` if that fails.
fn rename_over(temp: &Path, duplicate: &Path) -> Result<(), LinkError> {
    if let Err(e) = fs::rename(temp, duplicate) {
        if let Err(cleanup) = fs::remove_file(temp) {
            log::error!(
                "Failed to remove temporary link {}: {}",
                temp.display(),
                cleanup
            );
        }
        return Err(LinkError::from_io(duplicate, e));
    }
    Ok(())
}

/// Create a hardlink to `canonical` under a fresh hidden name beside
/// `duplicate`.
fn link_to_temp(duplicate: &Path, canonical: &Path) -> Result<PathBuf, LinkError> {
    for attempt in 0..MAX_TEMP_ATTEMPTS {
        let temp = temp_path(duplicate, attempt)
            .ok_or_else(|| LinkError::NotRegularFile(duplicate.to_path_buf()))?;

        match fs::hard_link(canonical, &temp) {
            Ok(()) => return Ok(temp),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                log::trace!("Temporary name taken: {}", temp.display());
            }
            Err(e) => return Err(LinkError::from_io(duplicate, e)),
        }
    }
    Err(LinkError::TempNameExhausted(duplicate.to_path_buf()))
}
