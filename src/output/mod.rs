//! Output formatters for the end-of-run summary.
//!
//! - [`text`]: human-readable, colored with yansi
//! - [`json`]: machine-readable, for scripting
//!
//! # Example
//!
//! ```no_run
//! use dupelink::dedup::{DedupEngine, EngineConfig};
//! use dupelink::error::ExitCode;
//! use dupelink::output::JsonOutput;
//! use dupelink::report::MemorySink;
//! use std::path::Path;
//!
//! let engine = DedupEngine::new(EngineConfig::default());
//! let summary = engine.run(Path::new("."), &mut MemorySink::new()).unwrap();
//!
//! let output = JsonOutput::new(&summary, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::JsonOutput;
pub use text::TextOutput;
