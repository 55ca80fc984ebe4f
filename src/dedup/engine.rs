//! The deduplication engine.
//!
//! # Overview
//!
//! [`DedupEngine::run`] walks one directory tree and, for every regular file:
//!
//! 1. Fingerprints it (reusing the digest of an inode already seen this run)
//! 2. Looks the digest up in a fresh [`DuplicateIndex`]
//! 3. Registers it as canonical if the digest is new, or
//! 4. Verifies it against the canonical file and replaces it with a hardlink
//!
//! Per-file problems are written to the [`LogSink`] as `Error:` lines and
//! counted in the [`DedupSummary`]; they never stop the walk. Only an
//! invalid root is fatal.
//!
//! # Example
//!
//! ```no_run
//! use dupelink::dedup::{DedupEngine, EngineConfig};
//! use dupelink::report::MemorySink;
//! use std::path::Path;
//!
//! let engine = DedupEngine::new(EngineConfig::default());
//! let mut sink = MemorySink::new();
//! let summary = engine.run(Path::new("/data"), &mut sink).unwrap();
//!
//! println!("{} duplicates linked", summary.duplicates_linked);
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytesize::ByteSize;
use serde::Serialize;

use super::index::{DuplicateIndex, IndexEntry, Registration};
use super::replace::{is_temp_name, replace_duplicate, FileSnapshot, LinkError};
use crate::lock::LOCK_FILE_NAME;
use crate::progress::ProgressCallback;
use crate::report::LogSink;
use crate::scanner::{
    files_identical, Algorithm, EntryKind, FileEntry, HardlinkTracker, Hash, Hasher, ScanError,
    Walker, WalkerConfig,
};

/// Name of the single progress phase reported by the engine.
pub const PHASE_DEDUP: &str = "dedup";

/// Configuration for a deduplication run.
#[derive(Clone)]
pub struct EngineConfig {
    /// Traversal filters. Empty files are skipped unless `min_size` is lowered.
    pub walker: WalkerConfig,
    /// Fingerprint algorithm.
    pub algorithm: Algorithm,
    /// Compare bytes before every replacement.
    pub verify: bool,
    /// Decide but never touch the filesystem.
    pub dry_run: bool,
    /// Upper bound on distinct digests held by the index.
    pub max_index_entries: Option<usize>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("walker", &self.walker)
            .field("algorithm", &self.algorithm)
            .field("verify", &self.verify)
            .field("dry_run", &self.dry_run)
            .field("max_index_entries", &self.max_index_entries)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            walker: WalkerConfig::default().with_min_size(Some(1)),
            algorithm: Algorithm::default(),
            verify: false,
            dry_run: false,
            max_index_entries: None,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl EngineConfig {
    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker(mut self, walker: WalkerConfig) -> Self {
        self.walker = walker;
        self
    }

    /// Set the fingerprint algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Enable byte-for-byte verification.
    #[must_use]
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Enable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Bound the number of distinct digests.
    #[must_use]
    pub fn with_max_index_entries(mut self, max: Option<usize>) -> Self {
        self.max_index_entries = max;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Whether matches are compared byte-for-byte before linking.
    ///
    /// Always true for a fingerprint that is not collision resistant.
    #[must_use]
    pub fn verifies_bytes(&self) -> bool {
        self.verify || !self.algorithm.is_collision_resistant()
    }
}

/// Counters describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupSummary {
    /// Root that was walked
    pub root: PathBuf,
    /// Fingerprint algorithm used
    pub algorithm: Algorithm,
    /// Whether the run was a dry run
    pub dry_run: bool,
    /// Directories descended into
    pub directories: usize,
    /// Regular files examined
    pub files_scanned: usize,
    /// Files registered as canonical
    pub unique_files: usize,
    /// Files already sharing the canonical inode
    pub already_linked: usize,
    /// Files replaced with a hardlink
    pub duplicates_linked: usize,
    /// Files that would have been replaced (dry run)
    pub would_link: usize,
    /// Bytes no longer stored separately
    pub bytes_reclaimed: u64,
    /// New digests refused because the index was full
    pub unindexed: usize,
    /// Fingerprint matches whose bytes differed
    pub collisions: usize,
    /// Symbolic links left alone
    pub skipped_symlinks: usize,
    /// Devices, sockets, FIFOs and stale temporary links left alone
    pub skipped_special: usize,
    /// Entries that could not be enumerated
    pub scan_errors: usize,
    /// Files that could not be read
    pub hash_errors: usize,
    /// Replacements that failed
    pub link_errors: usize,
    /// Whether the run stopped early on a shutdown request
    pub interrupted: bool,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

impl DedupSummary {
    /// Total per-file errors.
    #[must_use]
    pub fn errors(&self) -> usize {
        self.scan_errors + self.hash_errors + self.link_errors
    }

    /// Reclaimed space as a human-readable string.
    #[must_use]
    pub fn bytes_reclaimed_display(&self) -> String {
        ByteSize::b(self.bytes_reclaimed).to_string()
    }
}

/// Fatal errors: the run did not start and nothing was modified.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root could not be opened.
    #[error(transparent)]
    ScanError(#[from] ScanError),
}

/// Walks a tree and replaces duplicate files with hardlinks.
pub struct DedupEngine {
    config: EngineConfig,
    hasher: Hasher,
}

impl DedupEngine {
    /// Create an engine with the given configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let hasher = Hasher::new().with_algorithm(config.algorithm);
        Self { config, hasher }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Deduplicate everything under `root`, reporting to `sink`.
    ///
    /// The duplicate index is created empty for this call and dropped when it
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` only if `root` is missing, not a directory, or
    /// unreadable. Per-file failures are reported to `sink` instead.
    pub fn run(&self, root: &Path, sink: &mut dyn LogSink) -> Result<DedupSummary, EngineError> {
        let start = Instant::now();

        let walker_config = self
            .config
            .walker
            .clone()
            .with_excluded_path(root.join(LOCK_FILE_NAME))
            .with_lock_marker(LOCK_FILE_NAME);
        let mut walker = Walker::new(root, walker_config);
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        walker.validate_root().map_err(|e| match e {
            ScanError::NotFound(p) => EngineError::PathNotFound(p),
            ScanError::NotADirectory(p) => EngineError::NotADirectory(p),
            other => EngineError::ScanError(other),
        })?;

        log::info!(
            "Deduplicating {} ({}{})",
            root.display(),
            self.config.algorithm,
            if self.config.dry_run { ", dry run" } else { "" }
        );

        let mut run = Run::new(&self.config, &self.hasher, root);

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_phase_start(PHASE_DEDUP, 0);
        }

        for entry in walker.walk() {
            match entry {
                Ok(entry) => run.process_entry(entry, sink),
                Err(e) => {
                    log::warn!("{}", e);
                    sink.error(&e.to_string());
                    run.summary.scan_errors += 1;
                }
            }
        }

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_phase_end(PHASE_DEDUP);
        }

        let mut summary = run.finish();
        summary.interrupted = self.is_shutdown_requested();
        summary.elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        if summary.interrupted {
            log::warn!("Run interrupted after {} files", summary.files_scanned);
        }
        log::info!(
            "Done: {} files, {} linked, {} already linked, {} errors",
            summary.files_scanned,
            summary.duplicates_linked,
            summary.already_linked,
            summary.errors()
        );

        Ok(summary)
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.config
            .shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// State owned by one call to [`DedupEngine::run`].
struct Run<'a> {
    config: &'a EngineConfig,
    hasher: &'a Hasher,
    index: DuplicateIndex,
    tracker: HardlinkTracker,
    summary: DedupSummary,
}

impl<'a> Run<'a> {
    fn new(config: &'a EngineConfig, hasher: &'a Hasher, root: &Path) -> Self {
        Self {
            config,
            hasher,
            index: DuplicateIndex::with_max_entries(config.max_index_entries),
            tracker: HardlinkTracker::new(),
            summary: DedupSummary {
                root: root.to_path_buf(),
                algorithm: config.algorithm,
                dry_run: config.dry_run,
                ..DedupSummary::default()
            },
        }
    }

    fn finish(self) -> DedupSummary {
        self.summary
    }

    fn process_entry(&mut self, entry: FileEntry, sink: &mut dyn LogSink) {
        match entry.kind {
            EntryKind::Directory => {
                log::trace!("Entering {}", entry.path.display());
                self.summary.directories += 1;
            }
            EntryKind::Symlink => {
                log::trace!("Skipping symlink {}", entry.path.display());
                self.summary.skipped_symlinks += 1;
            }
            EntryKind::Other => {
                log::trace!("Skipping special file {}", entry.path.display());
                self.summary.skipped_special += 1;
            }
            EntryKind::File => {
                if entry.path.file_name().is_some_and(is_temp_name) {
                    log::warn!("Skipping leftover temporary link {}", entry.path.display());
                    self.summary.skipped_special += 1;
                    return;
                }
                self.process_file(entry, sink);
            }
        }
    }

    fn process_file(&mut self, file: FileEntry, sink: &mut dyn LogSink) {
        self.summary.files_scanned += 1;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_progress(self.summary.files_scanned, &file.path.to_string_lossy());
        }

        let Some(digest) = self.digest_of(&file, sink) else {
            return;
        };

        let Some(canonical) = self.index.lookup(&digest).cloned() else {
            self.register(digest, &file);
            return;
        };

        if file.inode.is_some() && file.inode == canonical.inode {
            log::trace!(
                "Already linked: {} -> {}",
                file.path.display(),
                canonical.path.display()
            );
            self.summary.already_linked += 1;
            return;
        }

        if self.config.verifies_bytes() {
            match files_identical(&file.path, &canonical.path) {
                Ok(true) => {}
                Ok(false) => {
                    let err = LinkError::ContentMismatch {
                        duplicate: file.path.clone(),
                        canonical: canonical.path.clone(),
                    };
                    log::warn!("{}", err);
                    sink.error(&err.to_string());
                    self.summary.collisions += 1;
                    return;
                }
                Err(e) => {
                    log::warn!("{}", e);
                    sink.error(&e.to_string());
                    self.summary.hash_errors += 1;
                    return;
                }
            }
        }

        if self.config.dry_run {
            sink.would_link(&file.path, &canonical.path);
            self.summary.would_link += 1;
            self.summary.bytes_reclaimed += file.size;
            return;
        }

        match link(&file, &canonical) {
            Ok(()) => {
                self.tracker.forget(file.inode.as_ref());
                sink.duplicate(&file.path, &canonical.path);
                self.summary.duplicates_linked += 1;
                self.summary.bytes_reclaimed += file.size;
            }
            Err(e) => {
                log::warn!("{}", e);
                sink.error(&e.to_string());
                self.summary.link_errors += 1;
            }
        }
    }

    /// Fingerprint `file`, reusing the digest of an inode hashed earlier.
    fn digest_of(&mut self, file: &FileEntry, sink: &mut dyn LogSink) -> Option<Hash> {
        if let Some(digest) = self.tracker.cached_digest(file.inode.as_ref()) {
            log::trace!("Reusing digest for {}", file.path.display());
            return Some(digest);
        }

        match self.hasher.full_hash(&file.path) {
            Ok(digest) => {
                self.tracker.record(file.inode.as_ref(), digest);
                Some(digest)
            }
            Err(e) => {
                log::warn!("{}", e);
                sink.error(&e.to_string());
                self.summary.hash_errors += 1;
                None
            }
        }
    }

    fn register(&mut self, digest: Hash, file: &FileEntry) {
        let entry = IndexEntry::new(digest, file.path.clone(), file.size)
            .with_inode(file.inode)
            .with_modified(file.modified);
        match self.index.register(entry) {
            Registration::Inserted => {
                log::trace!("Canonical: {}", file.path.display());
                self.summary.unique_files += 1;
            }
            Registration::AlreadyPresent => {}
            Registration::Full => {
                log::warn!(
                    "Index full ({} entries), not indexing {}",
                    self.index.len(),
                    file.path.display()
                );
                self.summary.unindexed += 1;
            }
        }
    }
}

/// Re-check both files against what was recorded, then replace.
fn link(file: &FileEntry, canonical: &IndexEntry) -> Result<(), LinkError> {
    FileSnapshot::from_entry(file).verify()?;
    FileSnapshot::from_index_entry(canonical).verify()?;

    replace_duplicate(&file.path, &canonical.path)
}
