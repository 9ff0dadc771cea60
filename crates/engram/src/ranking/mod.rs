//! Value scoring and final ranking

pub mod rerank;
pub mod scorer;

pub use rerank::{rerank, RankedMemory, ScoreBreakdown};
pub use scorer::{MvnCheckpoint, ScoreSource, ValueScorer};
