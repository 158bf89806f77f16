//! Pairwise conflict detection between open pull requests

pub mod engine;
pub mod report;

pub use engine::{ConflictEngine, ConflictMatrix, PreparedPull};
pub use report::{conflicts_section, summary_table};
