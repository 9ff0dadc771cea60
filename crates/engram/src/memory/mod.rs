//! Core memory data model

pub mod types;

pub use types::{FeedbackRecord, GraphMetrics, Memory, MemoryDraft, MemorySource, MemoryType};
