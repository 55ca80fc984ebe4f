//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory
//! tree depth-first and classifying every entry. Entries within a directory
//! are visited in file-name order, so which of several identical files is
//! seen first does not depend on the filesystem's enumeration order.
//!
//! # Features
//!
//! - Sorted, depth-first traversal (directories before their contents)
//! - Symlinks reported but never followed
//! - Stays on the root's filesystem (hardlinks cannot cross devices)
//! - Gitignore-style pattern matching via the `ignore` crate
//! - Size filtering (min/max) for regular files
//! - Hidden file filtering
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use dupelink::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{:?} {}", file.kind, file.path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::{DirEntry, WalkDir};

use super::{EntryKind, FileEntry, ScanError, WalkerConfig};

/// Directory walker for sequential file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dupelink::scanner::{Walker, WalkerConfig};
    /// use std::path::Path;
    ///
    /// let walker = Walker::new(Path::new("."), WalkerConfig::default());
    /// ```
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root this walker starts from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that the root exists and is a directory.
    ///
    /// # Errors
    ///
    /// [`ScanError::NotFound`], [`ScanError::PermissionDenied`],
    /// [`ScanError::NotADirectory`] or [`ScanError::Io`].
    pub fn validate_root(&self) -> Result<(), ScanError> {
        let metadata =
            std::fs::metadata(&self.root).map_err(|e| ScanError::from_io(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }
        std::fs::read_dir(&self.root).map_err(|e| ScanError::from_io(&self.root, e))?;
        Ok(())
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build gitignore matcher from config patterns.
    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Check if a path should be ignored based on configured patterns.
    fn should_ignore(&self, path: &Path, is_dir: bool, gitignore: Option<&Gitignore>) -> bool {
        let Some(gi) = gitignore else {
            return false;
        };
        let relative_path = path.strip_prefix(&self.root).unwrap_or(path);
        gi.matched(relative_path, is_dir).is_ignore()
    }

    /// Whether an enumerated entry should be yielded (and, for directories,
    /// descended into).
    fn keep_entry(&self, entry: &DirEntry, gitignore: Option<&Gitignore>) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        if self.config.exclude_paths.iter().any(|p| p == entry.path()) {
            log::trace!("Excluded: {}", entry.path().display());
            return false;
        }

        if self.config.skip_hidden && entry.file_name().to_string_lossy().starts_with('.') {
            log::trace!("Skipping hidden: {}", entry.path().display());
            return false;
        }

        let is_dir = entry.file_type().is_dir();

        if self.should_ignore(entry.path(), is_dir, gitignore) {
            log::trace!("Ignoring: {}", entry.path().display());
            return false;
        }

        if is_dir {
            if let Some(marker) = &self.config.lock_marker {
                if entry.path().join(marker).is_file() {
                    log::warn!(
                        "Skipping {}: locked by another run",
                        entry.path().display()
                    );
                    return false;
                }
            }
        }

        true
    }

    /// Check if a file passes size filters.
    fn passes_size_filter(&self, size: u64) -> bool {
        if let Some(min) = self.config.min_size {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.config.max_size {
            if size > max {
                return false;
            }
        }
        true
    }

    /// Walk the directory tree, yielding classified entries.
    ///
    /// Directories, symlinks and special files are yielded too (with their
    /// [`EntryKind`]) so callers can account for them; regular files that
    /// fail the size filter are not. Errors are yielded as [`ScanError`]
    /// values rather than stopping iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        let gitignore = self.build_gitignore();

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .same_file_system(self.config.same_file_system)
            .min_depth(1)
            .sort_by_file_name();

        walk_dir
            .into_iter()
            .filter_entry(move |entry| self.keep_entry(entry, gitignore.as_ref()))
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => self.process_entry(&entry),
                Err(e) => Some(Err(self.handle_walkdir_error(e))),
            })
    }

    /// Turn an enumerated entry into a [`FileEntry`] if it passes filters.
    fn process_entry(&self, entry: &DirEntry) -> Option<Result<FileEntry, ScanError>> {
        let path = entry.path();

        // follow_links(false) means this is lstat
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => return Some(Err(self.handle_walkdir_error(e))),
        };

        let file = FileEntry::from_metadata(path.to_path_buf(), &metadata);

        if file.kind == EntryKind::File && !self.passes_size_filter(file.size) {
            log::trace!(
                "Skipping file due to size filter ({}): {}",
                file.size,
                path.display()
            );
            return None;
        }

        Some(Ok(file))
    }

    /// Convert a walkdir error into a [`ScanError`].
    fn handle_walkdir_error(&self, e: walkdir::Error) -> ScanError {
        let path = e
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        let scan_err = match e.into_io_error() {
            Some(io_err) => ScanError::from_io(&path, io_err),
            None => ScanError::Io {
                path,
                source: io::Error::other("filesystem loop detected"),
            },
        };

        log::debug!("Walker error: {}", scan_err);
        scan_err
    }
}
