//! `MemoryEngine`: the facade the host agent talks to
//!
//! Wires the candidate builder, feature store, scorer, reranker,
//! consolidation worker, and feedback accumulator over the injected
//! collaborator backends. Queries are independent and may run concurrently;
//! consolidation is serialized per user by the worker.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::consolidation::{ConsolidationReport, ConsolidationWorker, RunState};
use crate::embedding::EmbeddingProvider;
use crate::error::{EngramError, Result};
use crate::feedback::FeedbackAccumulator;
use crate::graph::{EdgeKind, GraphStore, NodeRef};
use crate::memory::types::{FeedbackRecord, Memory, MemoryDraft};
use crate::ranking::{rerank, RankedMemory, ScoreSource, ValueScorer};
use crate::retrieval::{compute_features, CandidateBuilder, ChannelKind};
use crate::storage::MemoryStore;
use crate::summarize::Summarizer;

/// Final answer to one retrieval query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResponse {
    /// Top-k ranked memories, best first
    pub results: Vec<RankedMemory>,
    /// Optional channels that contributed nothing to this query
    pub degraded_channels: Vec<ChannelKind>,
    /// Whether value scores came from the trained model or the fallback
    pub value_score_source: ScoreSource,
}

/// The long-term memory engine.
pub struct MemoryEngine {
    store: Arc<dyn MemoryStore>,
    graph: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    candidates: CandidateBuilder,
    scorer: ValueScorer,
    consolidation: ConsolidationWorker,
    feedback: FeedbackAccumulator,
    config: Config,
}

impl MemoryEngine {
    /// Assemble an engine over the given backends. Validates the config and
    /// loads the scorer checkpoint (falling back to the heuristic if absent).
    pub fn new(
        store: Arc<dyn MemoryStore>,
        graph: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        summarizer: Arc<dyn Summarizer>,
        config: Config,
    ) -> Result<Self> {
        config.validate()?;
        let scorer = ValueScorer::from_config(&config.scorer);
        let candidates = CandidateBuilder::new(
            store.clone(),
            graph.clone(),
            embedder.clone(),
            config.retrieval.clone(),
        );
        let consolidation = ConsolidationWorker::new(
            store.clone(),
            graph.clone(),
            embedder.clone(),
            summarizer,
            config.consolidation.clone(),
        );
        let feedback = FeedbackAccumulator::new(store.clone());
        Ok(Self {
            store,
            graph,
            embedder,
            candidates,
            scorer,
            consolidation,
            feedback,
            config,
        })
    }

    /// Store one extracted memory draft: embed the summary, insert the row,
    /// and wire the graph (memory node, ownership edge, entity mentions).
    pub async fn remember(&self, draft: MemoryDraft) -> Result<Memory> {
        if draft.summary.trim().is_empty() {
            return Err(EngramError::Validation(
                "memory summary must not be empty".to_string(),
            ));
        }
        let embedding = self.embedder.embed(&draft.summary).await?;

        let mut memory = Memory::new(
            draft.user_id,
            draft.memory_type,
            draft.summary,
            embedding,
            draft.source,
        );
        memory.raw_text = draft.raw_text;
        memory.emotion = draft.emotion;
        memory.entities = draft.entities;
        memory.set_importance(draft.importance);

        self.store.insert(&memory).await?;

        let node = NodeRef::Memory(memory.id);
        self.graph.upsert_node(node.clone()).await?;
        self.graph
            .upsert_edge(NodeRef::User(memory.user_id), EdgeKind::Experienced, node.clone())
            .await?;
        for entity in &memory.entities {
            self.graph
                .upsert_edge(node.clone(), EdgeKind::Mentions, NodeRef::entity(entity))
                .await?;
        }

        tracing::debug!(memory_id = %memory.id, user_id = %memory.user_id, "memory stored");
        Ok(memory)
    }

    /// Answer a query with the top-k ranked memories for a user.
    ///
    /// Surfaced memories get their usage bookkeeping updated exactly once,
    /// after the ranking is final; candidates that are filtered out are
    /// untouched.
    pub async fn retrieve(
        &self,
        query: &str,
        user_id: Uuid,
        k: usize,
    ) -> Result<RetrievalResponse> {
        if k == 0 {
            return Ok(RetrievalResponse {
                results: Vec::new(),
                degraded_channels: Vec::new(),
                value_score_source: self.scorer.source(),
            });
        }
        let started = Instant::now();
        let set = self.candidates.build(query, user_id, k).await?;

        let ids: Vec<Uuid> = set.candidates.iter().map(|c| c.memory.id).collect();
        // Centrality is advisory: a metrics read failure degrades to zeros.
        let metrics = match self.store.graph_metrics(&ids).await {
            Ok(metrics) => metrics,
            Err(e) => {
                tracing::warn!(error = %e, "graph metrics unavailable, scoring without centrality");
                Default::default()
            }
        };

        let now = Utc::now();
        let features = compute_features(&set.candidates, &metrics, &self.config.features, now);
        let results = rerank(
            &set.candidates,
            &features,
            &self.scorer,
            &self.config.rerank,
            k,
        );

        let surfaced: Vec<Uuid> = results.iter().map(|r| r.memory_id).collect();
        if !surfaced.is_empty() {
            self.store.record_use(&surfaced, now).await?;
        }

        tracing::info!(
            %user_id,
            candidates = set.candidates.len(),
            results = results.len(),
            degraded = ?set.degraded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retrieval complete"
        );
        Ok(RetrievalResponse {
            results,
            degraded_channels: set.degraded,
            value_score_source: self.scorer.source(),
        })
    }

    /// Run the consolidation pipeline for one user. Fails fast with a
    /// conflict if a run is already in flight for that user.
    pub async fn run_consolidation(&self, user_id: Uuid) -> Result<ConsolidationReport> {
        self.consolidation.run(user_id).await
    }

    /// The user's current consolidation run state.
    pub fn consolidation_state(&self, user_id: Uuid) -> RunState {
        self.consolidation.state(user_id)
    }

    /// Record one feedback row for offline scorer training.
    pub async fn record_feedback(
        &self,
        user_id: Option<Uuid>,
        query: Option<String>,
        retrieved_memory_ids: Vec<Uuid>,
        used_memory_ids: Vec<Uuid>,
        reward: f32,
    ) -> Result<FeedbackRecord> {
        self.feedback
            .record(user_id, query, retrieved_memory_ids, used_memory_ids, reward)
            .await
    }
}
