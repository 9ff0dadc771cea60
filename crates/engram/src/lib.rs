//! Engram: a long-term memory layer for AI agents
//!
//! Engram stores extracted memories, answers queries through hybrid retrieval
//! (vector, lexical, and graph channels fused with a learned value score),
//! and consolidates episodic memories into semantic knowledge in a background
//! "sleep" phase. The embedding model, memory store, graph store, and cluster
//! summarizer are injected collaborators; in-process reference backends ship
//! for tests and single-process hosts.
//!
//! Entry point: [`MemoryEngine`].

pub mod config;
pub mod consolidation;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod graph;
pub mod memory;
pub mod ranking;
pub mod retrieval;
pub mod storage;
pub mod summarize;
pub mod testing;

pub use config::Config;
pub use consolidation::{ConsolidationReport, RunState};
pub use engine::{MemoryEngine, RetrievalResponse};
pub use error::{EngramError, Result};
pub use memory::{FeedbackRecord, Memory, MemoryDraft, MemorySource, MemoryType};
pub use ranking::{RankedMemory, ScoreBreakdown, ScoreSource};
pub use retrieval::ChannelKind;
