//! In-memory reference implementation of the memory store contract
//!
//! Brute-force cosine search over `RwLock`-guarded maps. Deterministic:
//! listings and search results carry a stable tie-break on id so repeated
//! calls without intervening writes return identical results.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::embedding::cosine_similarity;
use crate::error::Result;
use crate::memory::types::{FeedbackRecord, GraphMetrics, Memory, MemoryType};
use crate::storage::MemoryStore;

/// Reference memory store over in-process maps.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    memories: RwLock<HashMap<Uuid, Memory>>,
    metrics: RwLock<HashMap<Uuid, GraphMetrics>>,
    feedback: RwLock<Vec<FeedbackRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all feedback rows, oldest first. Test/trainer convenience;
    /// not part of the `MemoryStore` contract.
    pub async fn feedback_rows(&self) -> Vec<FeedbackRecord> {
        self.feedback.read().await.clone()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn insert(&self, memory: &Memory) -> Result<()> {
        self.memories
            .write()
            .await
            .insert(memory.id, memory.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Memory>> {
        Ok(self.memories.read().await.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.memories.write().await.remove(&id).is_some())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        type_filter: Option<MemoryType>,
        limit: usize,
    ) -> Result<Vec<Memory>> {
        let memories = self.memories.read().await;
        let mut out: Vec<Memory> = memories
            .values()
            .filter(|m| m.user_id == user_id)
            .filter(|m| type_filter.is_none_or(|t| m.memory_type == t))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        out.truncate(limit);
        Ok(out)
    }

    async fn search(
        &self,
        user_id: Uuid,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(Memory, f32)>> {
        let memories = self.memories.read().await;
        let mut scored: Vec<(Memory, f32)> = memories
            .values()
            .filter(|m| m.user_id == user_id && !m.embedding.is_empty())
            .map(|m| {
                let score = cosine_similarity(embedding, &m.embedding);
                (m.clone(), score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
        scored.truncate(k);
        Ok(scored)
    }

    async fn record_use(&self, ids: &[Uuid], now: DateTime<Utc>) -> Result<()> {
        let mut memories = self.memories.write().await;
        for id in ids {
            if let Some(memory) = memories.get_mut(id) {
                memory.mark_used(now);
            }
        }
        Ok(())
    }

    async fn apply_decay(
        &self,
        id: Uuid,
        importance: f32,
        value_score: Option<f32>,
    ) -> Result<()> {
        let mut memories = self.memories.write().await;
        if let Some(memory) = memories.get_mut(&id) {
            memory.importance = importance.clamp(0.0, 1.0);
            memory.value_score = value_score.map(|v| v.clamp(0.0, 1.0));
        }
        Ok(())
    }

    async fn graph_metrics(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, GraphMetrics>> {
        let metrics = self.metrics.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| metrics.get(id).map(|m| (*id, *m)))
            .collect())
    }

    async fn upsert_graph_metrics(&self, rows: &HashMap<Uuid, GraphMetrics>) -> Result<()> {
        let mut metrics = self.metrics.write().await;
        for (id, row) in rows {
            metrics.insert(*id, *row);
        }
        Ok(())
    }

    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        self.feedback.write().await.push(record.clone());
        Ok(())
    }

    async fn feedback_count(&self) -> Result<usize> {
        Ok(self.feedback.read().await.len())
    }
}
