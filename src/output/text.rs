//! Human-readable summary printed after a run.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use yansi::Paint;

use crate::dedup::DedupSummary;

/// Renders a [`DedupSummary`] as a short block of text.
#[derive(Debug, Clone)]
pub struct TextOutput<'a> {
    summary: &'a DedupSummary,
    log_file: Option<&'a Path>,
}

impl<'a> TextOutput<'a> {
    #[must_use]
    pub fn new(summary: &'a DedupSummary) -> Self {
        Self {
            summary,
            log_file: None,
        }
    }

    /// Mention where the report log was written.
    #[must_use]
    pub fn with_log_file(mut self, path: &'a Path) -> Self {
        self.log_file = Some(path);
        self
    }

    /// Render the summary.
    #[must_use]
    pub fn render(&self) -> String {
        let s = self.summary;
        let mut out = String::new();

        let title = if s.dry_run {
            "Dry run complete"
        } else {
            "Deduplication complete"
        };
        let _ = writeln!(out, "{}", title.bold());
        if s.interrupted {
            let _ = writeln!(out, "{}", "Interrupted: results are partial".yellow().bold());
        }

        let _ = writeln!(out, "  Root:            {}", s.root.display());
        let _ = writeln!(out, "  Algorithm:       {}", s.algorithm);
        let _ = writeln!(out, "  Directories:     {}", s.directories);
        let _ = writeln!(out, "  Files scanned:   {}", s.files_scanned);
        let _ = writeln!(out, "  Unique:          {}", s.unique_files);
        let _ = writeln!(out, "  Already linked:  {}", s.already_linked);

        if s.dry_run {
            let _ = writeln!(out, "  Would link:      {}", s.would_link.yellow());
            let _ = writeln!(
                out,
                "  Reclaimable:     {}",
                s.bytes_reclaimed_display().yellow()
            );
        } else {
            let _ = writeln!(out, "  Linked:          {}", s.duplicates_linked.green());
            let _ = writeln!(
                out,
                "  Reclaimed:       {}",
                s.bytes_reclaimed_display().green()
            );
        }

        if s.skipped_symlinks + s.skipped_special > 0 {
            let _ = writeln!(
                out,
                "  Skipped:         {} symlinks, {} special",
                s.skipped_symlinks, s.skipped_special
            );
        }
        if s.unindexed > 0 {
            let _ = writeln!(
                out,
                "  Not indexed:     {} (index limit reached)",
                s.unindexed.yellow()
            );
        }
        if s.collisions > 0 {
            let _ = writeln!(out, "  Collisions:      {}", s.collisions.yellow());
        }
        if s.errors() > 0 {
            let _ = writeln!(
                out,
                "  Errors:          {} (scan {}, read {}, link {})",
                s.errors().red(),
                s.scan_errors,
                s.hash_errors,
                s.link_errors
            );
        }

        let _ = writeln!(
            out,
            "  Elapsed:         {:.2?}",
            Duration::from_millis(s.elapsed_ms)
        );
        if let Some(path) = self.log_file {
            let _ = writeln!(out, "  Log:             {}", path.display());
        }

        out
    }

    /// Write the rendered summary.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.render().as_bytes())
    }
}
