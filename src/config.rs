//! Application configuration management.
//!
//! Settings are layered with figment, later layers overriding earlier ones:
//!
//! 1. [`Config::default()`]
//! 2. A TOML file (the platform config directory, or `--config`)
//! 3. `DUPELINK_`-prefixed environment variables
//! 4. Command-line flags ([`Config::apply_cli`])
//!
//! # Example
//!
//! ```toml
//! # ~/.config/dupelink/config.toml
//! algorithm = "blake3"
//! verify = true
//! min_size = 4096
//! ignore_patterns = ["*.tmp", "node_modules/"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::{Cli, OutputFormat};
use crate::dedup::EngineConfig;
use crate::report::DEFAULT_LOG_FILE;
use crate::scanner::{Algorithm, WalkerConfig};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DUPELINK_";

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer held a value of the wrong shape.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// The platform has no config directory.
    #[error("cannot determine configuration directory")]
    NoConfigDir,

    /// Writing the config file failed.
    #[error("cannot write config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config could not be rendered as TOML.
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Report log file.
    pub log_file: PathBuf,
    /// Fingerprint algorithm.
    pub algorithm: Algorithm,
    /// Compare bytes before every replacement.
    pub verify: bool,
    /// Decide without modifying anything.
    pub dry_run: bool,
    /// Merge zero-byte files too.
    pub include_empty: bool,
    /// Minimum file size in bytes.
    pub min_size: Option<u64>,
    /// Maximum file size in bytes.
    pub max_size: Option<u64>,
    /// Gitignore-style patterns to skip.
    pub ignore_patterns: Vec<String>,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Bound on distinct fingerprints held in memory.
    pub max_index_entries: Option<usize>,
    /// Create the subtree lock file.
    pub lock: bool,
    /// Summary format.
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            algorithm: Algorithm::default(),
            verify: false,
            dry_run: false,
            include_empty: false,
            min_size: None,
            max_size: None,
            ignore_patterns: Vec::new(),
            skip_hidden: false,
            max_index_entries: None,
            lock: true,
            output: OutputFormat::default(),
        }
    }
}

impl Config {
    /// Load defaults, the config file and the environment.
    ///
    /// With `explicit` set, that file must exist. Otherwise the platform
    /// default location is used if present.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotFound`] for a missing explicit file,
    /// [`ConfigError::Invalid`] if any layer fails to parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) if !path.is_file() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_path().ok(),
        };

        if let Some(ref path) = file {
            log::debug!("Config file: {}", path.display());
        }

        Self::figment(file.as_deref())
            .extract()
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// The provider stack used by [`Config::load`].
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Overlay command-line flags.
    ///
    /// Boolean flags can only switch a setting on; options replace the
    /// configured value when given.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(ref path) = cli.log_file {
            self.log_file = path.clone();
        }
        if let Some(algorithm) = cli.algorithm {
            self.algorithm = algorithm;
        }
        self.verify |= cli.verify;
        self.dry_run |= cli.dry_run;
        self.include_empty |= cli.include_empty;
        if cli.min_size.is_some() {
            self.min_size = cli.min_size;
        }
        if cli.max_size.is_some() {
            self.max_size = cli.max_size;
        }
        self.ignore_patterns.extend(cli.ignore_patterns.iter().cloned());
        self.skip_hidden |= cli.skip_hidden;
        if cli.max_index_entries.is_some() {
            self.max_index_entries = cli.max_index_entries;
        }
        if cli.no_lock {
            self.lock = false;
        }
        if let Some(output) = cli.output {
            self.output = output;
        }
    }

    /// Effective minimum size: empty files are excluded unless opted in.
    #[must_use]
    pub fn effective_min_size(&self) -> Option<u64> {
        match self.min_size {
            Some(min) => Some(min),
            None if self.include_empty => None,
            None => Some(1),
        }
    }

    /// Traversal settings derived from this config.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::default()
            .with_min_size(self.effective_min_size())
            .with_max_size(self.max_size)
            .with_skip_hidden(self.skip_hidden)
            .with_ignore_patterns(self.ignore_patterns.clone())
    }

    /// Engine settings derived from this config.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_walker(self.walker_config())
            .with_algorithm(self.algorithm)
            .with_verify(self.verify)
            .with_dry_run(self.dry_run)
            .with_max_index_entries(self.max_index_entries)
    }

    /// Write this configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoConfigDir`] when no home directory can be found.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let project_dirs =
            ProjectDirs::from("com", "dupelink", "dupelink").ok_or(ConfigError::NoConfigDir)?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }
}
