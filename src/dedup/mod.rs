//! Deduplication: the per-run index, the replacement primitive and the
//! engine that drives them.

pub mod engine;
pub mod index;
pub mod replace;

pub use engine::{DedupEngine, DedupSummary, EngineConfig, EngineError};
pub use index::{DuplicateIndex, IndexEntry, Registration};
pub use replace::{replace_duplicate, FileSnapshot, LinkError};
