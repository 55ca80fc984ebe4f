//! The replacement report log.
//!
//! Every replacement is recorded as one line of plain text,
//! `Duplicate: <duplicate> -> <canonical>`, in a file that is truncated at
//! the start of each run. Per-file problems are recorded as `Error: ...`
//! lines in the same file, which is the only per-file error channel a
//! front-end reading the log needs to display.
//!
//! The engine writes through the [`LogSink`] trait so tests and library
//! callers can capture lines in memory with [`MemorySink`].

use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use yansi::Paint;

/// Default report file name, created in the current working directory.
pub const DEFAULT_LOG_FILE: &str = "duplicate_log.txt";

/// Receives the human-readable record of a run.
pub trait LogSink {
    /// A duplicate was replaced by a link to `canonical`.
    fn duplicate(&mut self, duplicate: &Path, canonical: &Path);

    /// Dry run: `duplicate` would have been replaced.
    fn would_link(&mut self, duplicate: &Path, canonical: &Path);

    /// A per-file problem that did not stop the walk.
    fn error(&mut self, message: &str);
}

/// `Duplicate: <duplicate> -> <canonical>`
#[must_use]
pub fn format_duplicate(duplicate: &Path, canonical: &Path) -> String {
    format!(
        "Duplicate: {} -> {}",
        duplicate.display(),
        canonical.display()
    )
}

/// `Would link: <duplicate> -> <canonical>`
#[must_use]
pub fn format_would_link(duplicate: &Path, canonical: &Path) -> String {
    format!(
        "Would link: {} -> {}",
        duplicate.display(),
        canonical.display()
    )
}

/// `Error: <message>`
#[must_use]
pub fn format_error(message: &str) -> String {
    format!("Error: {message}")
}

/// Error opening or writing the report file.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report file could not be created or truncated.
    #[error("cannot create log file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing or flushing failed.
    #[error("cannot write log file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// File-backed [`LogSink`].
///
/// Lines are flushed as they are written, so a killed run leaves every
/// completed replacement on disk. Replacement lines are optionally echoed to
/// stdout.
#[derive(Debug)]
pub struct ReportLog {
    path: PathBuf,
    writer: LineWriter<File>,
    echo: bool,
    lines: usize,
    write_error: Option<io::Error>,
}

impl ReportLog {
    /// Create (or truncate) the report file.
    ///
    /// # Errors
    ///
    /// [`ReportError::Create`] if the file cannot be opened for writing.
    pub fn create(path: &Path) -> Result<Self, ReportError> {
        let file = File::create(path).map_err(|source| ReportError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Report log truncated: {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            writer: LineWriter::new(file),
            echo: false,
            lines: 0,
            write_error: None,
        })
    }

    /// Echo duplicate lines to stdout as they are written.
    #[must_use]
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Path of the report file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines written so far.
    #[must_use]
    pub fn lines_written(&self) -> usize {
        self.lines
    }

    /// Flush and surface the first write error, if any occurred.
    ///
    /// # Errors
    ///
    /// [`ReportError::Write`] if any line failed to be written.
    pub fn finish(mut self) -> Result<usize, ReportError> {
        if let Some(source) = self.write_error.take() {
            return Err(ReportError::Write {
                path: self.path,
                source,
            });
        }
        self.writer.flush().map_err(|source| ReportError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.lines)
    }

    fn write_line(&mut self, line: &str) {
        if self.write_error.is_some() {
            return;
        }
        match writeln!(self.writer, "{line}") {
            Ok(()) => self.lines += 1,
            Err(e) => {
                log::error!("Failed to write to {}: {}", self.path.display(), e);
                self.write_error = Some(e);
            }
        }
    }
}

impl LogSink for ReportLog {
    fn duplicate(&mut self, duplicate: &Path, canonical: &Path) {
        let line = format_duplicate(duplicate, canonical);
        if self.echo {
            println!(
                "{} {} -> {}",
                "Duplicate:".green(),
                duplicate.display(),
                canonical.display()
            );
        }
        self.write_line(&line);
    }

    fn would_link(&mut self, duplicate: &Path, canonical: &Path) {
        let line = format_would_link(duplicate, canonical);
        if self.echo {
            println!(
                "{} {} -> {}",
                "Would link:".yellow(),
                duplicate.display(),
                canonical.display()
            );
        }
        self.write_line(&line);
    }

    fn error(&mut self, message: &str) {
        self.write_line(&format_error(message));
    }
}

/// In-memory [`LogSink`] collecting formatted lines.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub lines: Vec<String>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines starting with `Duplicate:`.
    #[must_use]
    pub fn duplicates(&self) -> Vec<&str> {
        self.with_prefix("Duplicate: ")
    }

    /// Lines starting with `Error:`.
    #[must_use]
    pub fn errors(&self) -> Vec<&str> {
        self.with_prefix("Error: ")
    }

    fn with_prefix(&self, prefix: &str) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| l.starts_with(prefix))
            .map(String::as_str)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn duplicate(&mut self, duplicate: &Path, canonical: &Path) {
        self.lines.push(format_duplicate(duplicate, canonical));
    }

    fn would_link(&mut self, duplicate: &Path, canonical: &Path) {
        self.lines.push(format_would_link(duplicate, canonical));
    }

    fn error(&mut self, message: &str) {
        self.lines.push(format_error(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_duplicate() {
        assert_eq!(
            format_duplicate(Path::new("/r/sub/b.txt"), Path::new("/r/a.txt")),
            "Duplicate: /r/sub/b.txt -> /r/a.txt"
        );
    }

    #[test]
    fn test_report_log_writes_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");

        let mut log = ReportLog::create(&path).unwrap();
        log.duplicate(Path::new("/b"), Path::new("/a"));
        log.error("Permission denied: /c");
        assert_eq!(log.lines_written(), 2);
        assert_eq!(log.finish().unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Duplicate: /b -> /a\nError: Permission denied: /c\n");
    }

    #[test]
    fn test_report_log_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "stale line\n").unwrap();

        let log = ReportLog::create(&path).unwrap();
        log.finish().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_report_log_create_fails_in_missing_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no/such/dir/log.txt");
        assert!(matches!(
            ReportLog::create(&path),
            Err(ReportError::Create { .. })
        ));
    }

    #[test]
    fn test_memory_sink_filters() {
        let mut sink = MemorySink::new();
        sink.duplicate(Path::new("/b"), Path::new("/a"));
        sink.would_link(Path::new("/d"), Path::new("/c"));
        sink.error("boom");

        assert_eq!(sink.lines.len(), 3);
        assert_eq!(sink.duplicates(), vec!["Duplicate: /b -> /a"]);
        assert_eq!(sink.errors(), vec!["Error: boom"]);
        assert_eq!(sink.lines[1], "Would link: /d -> /c");
    }
}
