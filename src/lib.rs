//! dupelink - replace duplicate files with hardlinks
//!
//! Walks a directory tree, fingerprints every regular file by content, and
//! collapses byte-identical files into one physical copy shared through
//! hardlinks. Every logical path keeps its content; only the storage is
//! shared. Each replacement is recorded as `Duplicate: <dup> -> <canonical>`
//! in a plain-text report log.

pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod lock;
pub mod logging;
pub mod output;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod signal;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::dedup::DedupEngine;
use crate::error::ExitCode;
use crate::lock::SubtreeLock;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::Progress;
use crate::report::ReportLog;
use crate::scanner::{Walker, WalkerConfig};

/// Run dupelink with parsed command-line arguments.
///
/// Fatal problems (bad root, unwritable log, held lock, bad config) are
/// returned as errors before anything on disk is modified. Per-file
/// problems end up in the report log and the summary.
///
/// # Errors
///
/// Returns an error if the run cannot start or the report log cannot be
/// written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet, cli.no_color);
    if cli.no_color {
        yansi::disable();
    }

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    config.apply_cli(&cli);
    log::debug!("Effective configuration: {:?}", config);
    if let Some(ref path) = cli.save_config {
        config
            .save(path)
            .with_context(|| format!("failed to save configuration to {}", path.display()))?;
        log::info!("Configuration saved to {}", path.display());
    }

    let root = cli.path.as_path();
    Walker::new(root, WalkerConfig::default())
        .validate_root()
        .with_context(|| format!("cannot deduplicate {}", root.display()))?;

    let _lock = if config.lock && !config.dry_run {
        Some(SubtreeLock::acquire(root)?)
    } else {
        None
    };

    let text_output = config.output == OutputFormat::Text;
    let mut report = ReportLog::create(&config.log_file)?.with_echo(text_output && !cli.quiet);

    let handler = signal::install_handler()?;
    let mut engine_config = config.engine_config().with_shutdown_flag(handler.get_flag());
    if let Some(inside) = path_inside_root(root, report.path()) {
        log::debug!("Report log is inside the tree, excluding {}", inside.display());
        engine_config.walker = engine_config.walker.with_excluded_path(inside);
    }
    if !cli.quiet {
        engine_config = engine_config.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let summary = DedupEngine::new(engine_config).run(root, &mut report)?;
    let lines = report.finish()?;
    log::debug!("Wrote {} lines to {}", lines, config.log_file.display());

    let exit_code = if summary.interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::Success
    };

    let mut stdout = io::stdout().lock();
    match config.output {
        OutputFormat::Json => JsonOutput::new(&summary, exit_code)
            .with_log_file(&config.log_file)
            .write_to(&mut stdout)?,
        OutputFormat::Text if !cli.quiet => TextOutput::new(&summary)
            .with_log_file(&config.log_file)
            .write_to(&mut stdout)?,
        OutputFormat::Text => {}
    }

    Ok(exit_code)
}

/// `path` spelled the way the walker will see it under `root`, if it lies
/// inside that tree.
fn path_inside_root(root: &Path, path: &Path) -> Option<PathBuf> {
    let canonical_root = fs::canonicalize(root).ok()?;
    let canonical_path = fs::canonicalize(path).ok()?;
    let relative = canonical_path.strip_prefix(&canonical_root).ok()?;
    Some(root.join(relative))
}
