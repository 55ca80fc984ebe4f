//! Per-run duplicate index.
//!
//! Maps a content [`Hash`] to the canonical file that first produced it.
//! The index is a plain value owned by one engine run; nothing about it is
//! process-wide, so independent runs never see each other's entries.
//!
//! # Example
//!
//! ```
//! use dupelink::dedup::{DuplicateIndex, IndexEntry, Registration};
//! use std::path::PathBuf;
//!
//! let mut index = DuplicateIndex::new();
//! let entry = IndexEntry::new([1u8; 32], PathBuf::from("/data/a.txt"), 5);
//!
//! assert_eq!(index.register(entry.clone()), Registration::Inserted);
//! assert_eq!(index.register(entry), Registration::AlreadyPresent);
//! assert_eq!(index.lookup(&[1u8; 32]).unwrap().path, PathBuf::from("/data/a.txt"));
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::scanner::{Hash, InodeKey};

/// The canonical representative of one digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Content digest
    pub digest: Hash,
    /// First path (in traversal order) that produced the digest
    pub path: PathBuf,
    /// Storage identity of the canonical file, when available
    pub inode: Option<InodeKey>,
    /// Size of the canonical file in bytes
    pub size: u64,
    /// Modification time when the canonical file was enumerated
    pub modified: Option<SystemTime>,
}

impl IndexEntry {
    #[must_use]
    pub fn new(digest: Hash, path: PathBuf, size: u64) -> Self {
        Self {
            digest,
            path,
            inode: None,
            size,
            modified: None,
        }
    }

    #[must_use]
    pub fn with_inode(mut self, inode: Option<InodeKey>) -> Self {
        self.inode = inode;
        self
    }

    #[must_use]
    pub fn with_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }
}

/// Outcome of [`DuplicateIndex::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First time this digest was seen; the entry is now canonical.
    Inserted,
    /// The digest already has a canonical entry. The existing one is kept.
    AlreadyPresent,
    /// The index is at its entry limit; nothing was recorded.
    Full,
}

/// Digest -> canonical entry map with an optional size bound.
///
/// Registration is first-writer-wins. Once a bound is reached, new digests
/// are refused; existing entries are never evicted.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    entries: HashMap<Hash, IndexEntry>,
    max_entries: Option<usize>,
}

impl DuplicateIndex {
    /// Create an unbounded, empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index that holds at most `max_entries` digests.
    /// `None` means unbounded.
    #[must_use]
    pub fn with_max_entries(max_entries: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
        }
    }

    /// Find the canonical entry for a digest.
    #[must_use]
    pub fn lookup(&self, digest: &Hash) -> Option<&IndexEntry> {
        self.entries.get(digest)
    }

    /// Record `entry` as canonical for its digest unless one already exists.
    pub fn register(&mut self, entry: IndexEntry) -> Registration {
        if self.entries.contains_key(&entry.digest) {
            return Registration::AlreadyPresent;
        }
        if self.is_full() {
            return Registration::Full;
        }
        self.entries.insert(entry.digest, entry);
        Registration::Inserted
    }

    /// Number of distinct digests recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured bound, if any.
    #[must_use]
    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Whether no further digests can be registered.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.max_entries
            .is_some_and(|max| self.entries.len() >= max)
    }
}
