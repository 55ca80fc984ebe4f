//! Inode identity for files that already share storage.
//!
//! # Overview
//!
//! Hardlinks are multiple directory entries pointing to the same inode on disk.
//! Two names for one inode are never "duplicates" of each other: relinking
//! them would reclaim nothing. This module provides:
//!
//! - [`InodeKey`]: the `(device, inode)` identity of a file
//! - [`HardlinkTracker`]: remembers the digest already computed for each
//!   inode, so later names for the same inode skip re-hashing
//!
//! # Platform Support
//!
//! - **Unix**: Uses (device_id, inode) pairs from file metadata
//! - **Other**: Identity unavailable; every name is treated as distinct and
//!   the cross-device check is left to the link call itself
//!
//! # Example
//!
//! ```no_run
//! use dupelink::scanner::hardlink::{HardlinkTracker, InodeKey};
//! use std::path::Path;
//!
//! let tracker = HardlinkTracker::new();
//! let meta = std::fs::symlink_metadata(Path::new("file.txt")).unwrap();
//! let key = InodeKey::from_metadata(&meta);
//!
//! if let Some(digest) = tracker.cached_digest(key.as_ref()) {
//!     println!("already hashed this inode: {:?}", digest);
//! }
//! ```

use std::collections::HashMap;
use std::fs::Metadata;

use super::hasher::Hash;

/// Platform-specific identity of the storage behind a path.
///
/// On Unix, this is (device_id, inode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InodeKey {
    dev: u64,
    ino: u64,
}

impl InodeKey {
    /// Build a key from metadata.
    ///
    /// Returns `None` on platforms without inode information.
    #[cfg(unix)]
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    #[must_use]
    pub fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }

    /// Device the file lives on.
    #[must_use]
    pub fn device(&self) -> u64 {
        self.dev
    }

    /// Whether both keys live on the same filesystem.
    #[must_use]
    pub fn same_device(&self, other: &Self) -> bool {
        self.dev == other.dev
    }
}

/// Tracks digests already computed per inode.
///
/// # Thread Safety
///
/// `HardlinkTracker` is NOT thread-safe. It belongs to a single engine run.
#[derive(Debug, Default)]
pub struct HardlinkTracker {
    seen: HashMap<InodeKey, Hash>,
}

impl HardlinkTracker {
    /// Create a new hardlink tracker.
    ///
    /// # Example
    ///
    /// ```
    /// use dupelink::scanner::hardlink::HardlinkTracker;
    ///
    /// let tracker = HardlinkTracker::new();
    /// assert_eq!(tracker.seen_count(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen: HashMap::new(),
        }
    }

    /// Digest previously recorded for this inode, if any.
    ///
    /// `None` keys (platform without inode identity) never hit.
    #[must_use]
    pub fn cached_digest(&self, key: Option<&InodeKey>) -> Option<Hash> {
        key.and_then(|key| self.seen.get(key).copied())
    }

    /// Record the digest computed for an inode.
    ///
    /// Returns `true` if the inode was newly recorded, `false` if already
    /// present or if the key is unavailable.
    pub fn record(&mut self, key: Option<&InodeKey>, digest: Hash) -> bool {
        match key {
            Some(key) => self.seen.insert(*key, digest).is_none(),
            None => false,
        }
    }

    /// Drop the digest of an inode that no longer holds the content it was
    /// hashed with, e.g. a duplicate whose last name was just relinked. Its
    /// inode number may be reused later in the walk.
    ///
    /// Returns `true` if a digest was removed.
    pub fn forget(&mut self, key: Option<&InodeKey>) -> bool {
        key.is_some_and(|key| self.seen.remove(key).is_some())
    }

    /// Get the number of unique inodes tracked.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Check if inode identity is supported on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}
