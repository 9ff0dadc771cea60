//! Background consolidation: the engine's "sleep" phase

pub mod clustering;
pub mod decay;
pub mod worker;

pub use worker::{ConsolidationReport, ConsolidationWorker, RunState};
