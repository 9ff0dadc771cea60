//! Storage contract for memories, metrics, and feedback
//!
//! The relational store (with vector-similarity indexing) is an external
//! collaborator; Engram owns only the contract below. The crate ships an
//! in-memory reference backend used by tests and single-process hosts.

pub mod memstore;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::memory::types::{FeedbackRecord, GraphMetrics, Memory, MemoryType};

pub use memstore::InMemoryStore;

/// Read/write contract Engram needs from the memory store.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Insert or replace a memory row.
    async fn insert(&self, memory: &Memory) -> Result<()>;

    /// Fetch one memory by id.
    async fn get(&self, id: Uuid) -> Result<Option<Memory>>;

    /// Delete a memory. Returns true if a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Memories for a user, newest first, optionally filtered by type.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        type_filter: Option<MemoryType>,
        limit: usize,
    ) -> Result<Vec<Memory>>;

    /// Top-k memories for a user by cosine similarity to the query embedding,
    /// descending. Scores are raw similarities.
    async fn search(&self, user_id: Uuid, embedding: &[f32], k: usize)
        -> Result<Vec<(Memory, f32)>>;

    /// Increment usage_count and set last_used for the given memories.
    /// Called once per query, only for memories surfaced in the final ranking.
    async fn record_use(&self, ids: &[Uuid], now: DateTime<Utc>) -> Result<()>;

    /// Persist decayed importance/value_score for a memory.
    async fn apply_decay(&self, id: Uuid, importance: f32, value_score: Option<f32>)
        -> Result<()>;

    /// Cached centrality rows for the given memories; absent ids are omitted.
    async fn graph_metrics(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, GraphMetrics>>;

    /// Batch-upsert centrality rows (consolidation step 4).
    async fn upsert_graph_metrics(&self, rows: &HashMap<Uuid, GraphMetrics>) -> Result<()>;

    /// Append one feedback row. Append-only: rows are never mutated or
    /// deleted by the engine.
    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<()>;

    /// Number of feedback rows recorded so far (observability).
    async fn feedback_count(&self) -> Result<usize>;
}
