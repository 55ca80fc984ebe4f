//! JSON summary for scripting.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "summary": {
//!     "root": "/data",
//!     "algorithm": "blake3",
//!     "dry_run": false,
//!     "files_scanned": 100,
//!     "duplicates_linked": 10,
//!     "bytes_reclaimed": 51200,
//!     "elapsed_ms": 1234,
//!     "interrupted": false,
//!     ...
//!   },
//!   "log_file": "duplicate_log.txt",
//!   "exit_code": 0,
//!   "exit_code_name": "DL000"
//! }
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::dedup::DedupSummary;
use crate::error::ExitCode;

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Run counters
    pub summary: &'a DedupSummary,
    /// Report log written by the run, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<&'a Path>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DL000")
    pub exit_code_name: &'static str,
}

impl<'a> JsonOutput<'a> {
    /// Wrap a summary with the exit code of the run.
    ///
    /// # Example
    ///
    /// ```
    /// use dupelink::dedup::DedupSummary;
    /// use dupelink::error::ExitCode;
    /// use dupelink::output::JsonOutput;
    ///
    /// let summary = DedupSummary::default();
    /// let json = JsonOutput::new(&summary, ExitCode::Success).to_json().unwrap();
    /// assert!(json.contains("\"exit_code_name\":\"DL000\""));
    /// ```
    #[must_use]
    pub fn new(summary: &'a DedupSummary, exit_code: ExitCode) -> Self {
        Self {
            summary,
            log_file: None,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }

    /// Include the report log path.
    #[must_use]
    pub fn with_log_file(mut self, path: &'a Path) -> Self {
        self.log_file = Some(path);
        self
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let json = self.to_json_pretty().map_err(std::io::Error::other)?;
        writeln!(writer, "{json}")
    }
}
