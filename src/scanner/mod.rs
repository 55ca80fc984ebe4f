//! Scanner module for directory traversal and file fingerprinting.
//!
//! This module provides functionality for:
//! - Sorted, single-threaded directory walking using walkdir
//! - Content fingerprints (BLAKE3, or the legacy rolling checksum)
//! - Byte-for-byte verification of fingerprint matches
//! - Inode identity for files that are already hardlinked
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and entry classification
//! - [`hasher`]: Streaming fingerprints
//! - [`checksum`]: The two-accumulator rolling checksum
//! - [`compare`]: Byte-for-byte comparison
//! - [`hardlink`]: `(device, inode)` identity
//!
//! # Example
//!
//! ```no_run
//! use dupelink::scanner::{EntryKind, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     min_size: Some(1),  // Skip empty files
//!     skip_hidden: true,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) if file.kind == EntryKind::File => {
//!             println!("{}: {} bytes", file.path.display(), file.size)
//!         }
//!         Ok(_) => {}
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod checksum;
pub mod compare;
pub mod hardlink;
pub mod hasher;
pub mod walker;

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

// Re-export main types
pub use compare::files_identical;
pub use hardlink::{HardlinkTracker, InodeKey};
pub use hasher::{fingerprint, hash_to_hex, hex_to_hash, Algorithm, Hash, Hasher};
pub use walker::Walker;

/// What kind of filesystem object an entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file: the only kind that gets deduplicated.
    File,
    /// Directory: descended into.
    Directory,
    /// Symbolic link: never followed, never replaced.
    Symlink,
    /// Device, socket, FIFO or anything else.
    Other,
}

impl EntryKind {
    fn from_metadata(metadata: &Metadata) -> Self {
        let ft = metadata.file_type();
        if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_dir() {
            Self::Directory
        } else if ft.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// A path discovered during the walk, with what was known about it at the
/// time it was enumerated.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path to the entry (root joined with relative components)
    pub path: PathBuf,
    /// Entry kind from `lstat`
    pub kind: EntryKind,
    /// Size in bytes (zero for non-files)
    pub size: u64,
    /// Last modification time
    pub modified: Option<SystemTime>,
    /// Storage identity, where the platform provides one
    pub inode: Option<InodeKey>,
}

impl FileEntry {
    /// Create a regular-file entry without metadata lookups.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            kind: EntryKind::File,
            size,
            modified: Some(modified),
            inode: None,
        }
    }

    /// Build an entry from `lstat` metadata.
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let kind = EntryKind::from_metadata(metadata);
        Self {
            path,
            kind,
            size: if kind == EntryKind::File {
                metadata.len()
            } else {
                0
            },
            modified: metadata.modified().ok(),
            inode: InodeKey::from_metadata(metadata),
        }
    }
}

/// Configuration for directory walking.
///
/// Controls filtering and traversal boundaries.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Minimum file size to include (in bytes).
    /// Files smaller than this are skipped.
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    /// Files larger than this are skipped.
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (gitignore-style).
    pub ignore_patterns: Vec<String>,

    /// Do not descend into directories on a different device than the root.
    pub same_file_system: bool,

    /// Exact paths never yielded (e.g. the run's own lock file).
    pub exclude_paths: Vec<PathBuf>,

    /// Directories containing a file with this name are not descended into.
    pub lock_marker: Option<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            skip_hidden: false,
            min_size: None,
            max_size: None,
            ignore_patterns: Vec::new(),
            same_file_system: true,
            exclude_paths: Vec::new(),
            lock_marker: None,
        }
    }
}

impl WalkerConfig {
    /// Set the minimum file size.
    #[must_use]
    pub fn with_min_size(mut self, min_size: Option<u64>) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set the maximum file size.
    #[must_use]
    pub fn with_max_size(mut self, max_size: Option<u64>) -> Self {
        self.max_size = max_size;
        self
    }

    /// Skip hidden entries.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }

    /// Add gitignore-style patterns.
    #[must_use]
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Exclude an exact path from the walk.
    #[must_use]
    pub fn with_excluded_path(mut self, path: PathBuf) -> Self {
        self.exclude_paths.push(path);
        self
    }

    /// Skip subdirectories holding a file named `marker`.
    #[must_use]
    pub fn with_lock_marker(mut self, marker: &str) -> Self {
        self.lock_marker = Some(marker.to_string());
        self
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error by kind.
    #[must_use]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// The path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::NotADirectory(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// Classify an I/O error by kind.
    #[must_use]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
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
