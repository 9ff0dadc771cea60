//! Candidate Builder: three-channel hybrid retrieval fan-out
//!
//! A query fans out to the vector, lexical, and graph channels concurrently
//! and the results merge into one deduplicated candidate pool. The vector
//! channel is mandatory; the optional channels run under a bounded timeout
//! and degrade to empty sets, flagged in the result metadata.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{EngramError, Result};
use crate::graph::entities::extract_query_entities;
use crate::graph::traversal::expand_entities;
use crate::graph::GraphStore;
use crate::memory::types::Memory;
use crate::retrieval::lexical::Bm25Index;
use crate::storage::MemoryStore;

/// One retrieval channel, for degradation metadata and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Vector,
    Lexical,
    Graph,
}

/// One candidate memory with per-channel raw scores.
///
/// A score is `None` when the memory was not retrieved by that channel --
/// distinct from being retrieved with score 0.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub memory: Memory,
    pub vector_score: Option<f32>,
    pub lexical_score: Option<f32>,
    pub graph_hit: bool,
}

/// Merged output of the three channels for one query.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    /// Deduplicated candidates, sorted by memory id for reproducibility
    pub candidates: Vec<Candidate>,
    /// Optional channels that failed or timed out for this query
    pub degraded: Vec<ChannelKind>,
    /// Entity names extracted from the query (reused by feature extraction)
    pub query_entities: Vec<String>,
}

/// Fans a query out to the retrieval channels and merges the results.
pub struct CandidateBuilder {
    store: Arc<dyn MemoryStore>,
    graph: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl CandidateBuilder {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        graph: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            graph,
            embedder,
            config,
        }
    }

    /// Build the candidate pool for a query.
    ///
    /// Fails with `RetrievalUnavailable` if the embedding function or the
    /// vector search fails; optional channel failures only degrade.
    pub async fn build(&self, query: &str, user_id: Uuid, k: usize) -> Result<CandidateSet> {
        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            EngramError::RetrievalUnavailable {
                component: "embedding".to_string(),
                detail: e.to_string(),
            }
        })?;

        let timeout = Duration::from_millis(self.config.optional_channel_timeout_ms);
        let query_entities = extract_query_entities(query);

        let vector_fut = self
            .store
            .search(user_id, &query_embedding, self.config.vector_budget(k));
        let lexical_fut = self.lexical_channel(query, user_id, timeout);
        let graph_fut = self.graph_channel(&query_entities, timeout);

        let (vector_res, lexical_res, graph_res) =
            tokio::join!(vector_fut, lexical_fut, graph_fut);

        let vector_hits = vector_res.map_err(|e| EngramError::RetrievalUnavailable {
            component: "vector".to_string(),
            detail: e.to_string(),
        })?;

        let mut degraded = Vec::new();
        let lexical_hits = lexical_res.unwrap_or_else(|detail| {
            tracing::warn!(channel = "lexical", %detail, "optional channel degraded");
            degraded.push(ChannelKind::Lexical);
            Vec::new()
        });
        let graph_hits = graph_res.unwrap_or_else(|detail| {
            tracing::warn!(channel = "graph", %detail, "optional channel degraded");
            degraded.push(ChannelKind::Graph);
            Vec::new()
        });

        let mut by_id: HashMap<Uuid, Candidate> = HashMap::new();
        for (memory, similarity) in vector_hits {
            by_id.insert(
                memory.id,
                Candidate {
                    memory,
                    vector_score: Some(similarity),
                    lexical_score: None,
                    graph_hit: false,
                },
            );
        }

        for (id, score) in lexical_hits {
            if let Some(candidate) = by_id.get_mut(&id) {
                candidate.lexical_score = Some(score);
                continue;
            }
            if let Some(memory) = self.fetch_for_user(id, user_id).await? {
                by_id.insert(
                    id,
                    Candidate {
                        memory,
                        vector_score: None,
                        lexical_score: Some(score),
                        graph_hit: false,
                    },
                );
            }
        }

        for id in graph_hits {
            if let Some(candidate) = by_id.get_mut(&id) {
                candidate.graph_hit = true;
                continue;
            }
            if let Some(memory) = self.fetch_for_user(id, user_id).await? {
                by_id.insert(
                    id,
                    Candidate {
                        memory,
                        vector_score: None,
                        lexical_score: None,
                        graph_hit: true,
                    },
                );
            }
        }

        let mut candidates: Vec<Candidate> = by_id.into_values().collect();
        candidates.sort_by(|a, b| a.memory.id.cmp(&b.memory.id));

        tracing::debug!(
            candidates = candidates.len(),
            degraded = ?degraded,
            entities = query_entities.len(),
            "candidate pool built"
        );

        Ok(CandidateSet {
            candidates,
            degraded,
            query_entities,
        })
    }

    /// BM25 over the user's memories; errors stringified so the caller can
    /// degrade instead of aborting.
    async fn lexical_channel(
        &self,
        query: &str,
        user_id: Uuid,
        timeout: Duration,
    ) -> std::result::Result<Vec<(Uuid, f32)>, String> {
        if !self.config.lexical_enabled {
            return Ok(Vec::new());
        }
        let work = async {
            let memories = self
                .store
                .list_for_user(user_id, None, self.config.lexical_corpus_limit)
                .await
                .map_err(|e| e.to_string())?;
            let docs: Vec<(Uuid, String)> = memories
                .iter()
                .map(|m| (m.id, m.lexical_text()))
                .collect();
            let index = Bm25Index::build(&docs);
            Ok(index.search(query, self.config.lexical_top_n))
        };
        tokio::time::timeout(timeout, work)
            .await
            .map_err(|_| "timed out".to_string())?
    }

    /// Graph expansion from query entities; membership only, no score.
    async fn graph_channel(
        &self,
        query_entities: &[String],
        timeout: Duration,
    ) -> std::result::Result<Vec<Uuid>, String> {
        if !self.config.graph_enabled || query_entities.is_empty() {
            return Ok(Vec::new());
        }
        let work = async {
            let ids = expand_entities(self.graph.as_ref(), query_entities, self.config.graph_depth)
                .await
                .map_err(|e| e.to_string())?;
            let mut ids: Vec<Uuid> = ids.into_iter().collect();
            ids.sort();
            Ok(ids)
        };
        tokio::time::timeout(timeout, work)
            .await
            .map_err(|_| "timed out".to_string())?
    }

    /// Fetch a memory surfaced by an optional channel, discarding rows owned
    /// by other users (entity nodes are shared across users).
    async fn fetch_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Memory>> {
        let memory = self
            .store
            .get(id)
            .await
            .map_err(|e| EngramError::RetrievalUnavailable {
                component: "store".to_string(),
                detail: e.to_string(),
            })?;
        Ok(memory.filter(|m| m.user_id == user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, InMemoryGraph, NodeRef};
    use crate::memory::types::{MemorySource, MemoryType};
    use crate::storage::InMemoryStore;
    use crate::testing::MockEmbedder;

    async fn seed_memory(
        store: &InMemoryStore,
        user_id: Uuid,
        summary: &str,
        embedding: Vec<f32>,
    ) -> Memory {
        let mut memory = Memory::new(
            user_id,
            MemoryType::Episodic,
            summary.to_string(),
            embedding,
            MemorySource::Chat,
        );
        memory.entities = extract_query_entities(summary);
        store.insert(&memory).await.unwrap();
        memory
    }

    fn builder(
        store: Arc<InMemoryStore>,
        graph: Arc<InMemoryGraph>,
        config: RetrievalConfig,
    ) -> CandidateBuilder {
        CandidateBuilder::new(store, graph, Arc::new(MockEmbedder::new(8)), config)
    }

    #[tokio::test]
    async fn test_vector_and_lexical_channels_merge() {
        let store = Arc::new(InMemoryStore::new());
        let graph = Arc::new(InMemoryGraph::new());
        let user = Uuid::new_v4();
        let embedder = MockEmbedder::new(8);

        let query = "funding stress";
        let near = seed_memory(
            &store,
            user,
            "funding stress",
            embedder.embed_sync(query),
        )
        .await;
        let lexical_only =
            seed_memory(&store, user, "funding runway concerns", vec![0.0; 8]).await;

        let builder = builder(store, graph, RetrievalConfig::default());
        let set = builder.build(query, user, 5).await.unwrap();

        let near_candidate = set
            .candidates
            .iter()
            .find(|c| c.memory.id == near.id)
            .expect("vector hit present");
        assert!(near_candidate.vector_score.is_some());
        assert!(
            near_candidate.lexical_score.is_some(),
            "same doc also matches lexically"
        );

        let lex_candidate = set
            .candidates
            .iter()
            .find(|c| c.memory.id == lexical_only.id)
            .expect("lexical hit present");
        assert!(lex_candidate.lexical_score.is_some());
        assert!(set.degraded.is_empty());
    }

    #[tokio::test]
    async fn test_graph_channel_marks_membership() {
        let store = Arc::new(InMemoryStore::new());
        let graph = Arc::new(InMemoryGraph::new());
        let user = Uuid::new_v4();

        let linked = seed_memory(&store, user, "quarterly report", vec![0.0; 8]).await;
        graph
            .upsert_edge(
                NodeRef::Memory(linked.id),
                EdgeKind::Mentions,
                NodeRef::entity("Funding"),
            )
            .await
            .unwrap();

        let config = RetrievalConfig {
            lexical_enabled: false,
            ..RetrievalConfig::default()
        };
        let builder = builder(store, graph, config);
        let set = builder.build("about Funding", user, 5).await.unwrap();

        let candidate = set
            .candidates
            .iter()
            .find(|c| c.memory.id == linked.id)
            .expect("graph hit present");
        assert!(candidate.graph_hit);
        assert!(candidate.lexical_score.is_none());
    }

    #[tokio::test]
    async fn test_graph_hits_scoped_to_user() {
        let store = Arc::new(InMemoryStore::new());
        let graph = Arc::new(InMemoryGraph::new());
        let user = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let foreign = seed_memory(&store, stranger, "their secret", vec![0.0; 8]).await;
        graph
            .upsert_edge(
                NodeRef::Memory(foreign.id),
                EdgeKind::Mentions,
                NodeRef::entity("Funding"),
            )
            .await
            .unwrap();

        let config = RetrievalConfig {
            lexical_enabled: false,
            ..RetrievalConfig::default()
        };
        let builder = builder(store, graph, config);
        let set = builder.build("about Funding", user, 5).await.unwrap();
        assert!(
            !set.candidates.iter().any(|c| c.memory.id == foreign.id),
            "another user's memory must not leak through entity nodes"
        );
    }

    #[tokio::test]
    async fn test_disabled_lexical_contributes_nothing_without_degrading() {
        let store = Arc::new(InMemoryStore::new());
        let graph = Arc::new(InMemoryGraph::new());
        let user = Uuid::new_v4();
        seed_memory(&store, user, "plain event", vec![1.0; 8]).await;

        let config = RetrievalConfig {
            lexical_enabled: false,
            ..RetrievalConfig::default()
        };
        let builder = builder(store, graph, config);
        let set = builder.build("plain event", user, 5).await.unwrap();
        assert!(set.degraded.is_empty());
        assert!(set.candidates.iter().all(|c| c.lexical_score.is_none()));
    }

    #[tokio::test]
    async fn test_build_is_idempotent_without_writes() {
        let store = Arc::new(InMemoryStore::new());
        let graph = Arc::new(InMemoryGraph::new());
        let user = Uuid::new_v4();
        for i in 0..4 {
            seed_memory(&store, user, &format!("note {i} about Funding"), vec![0.5; 8]).await;
        }

        let builder = builder(store, graph, RetrievalConfig::default());
        let first = builder.build("Funding notes", user, 3).await.unwrap();
        let second = builder.build("Funding notes", user, 3).await.unwrap();

        let ids = |set: &CandidateSet| -> Vec<Uuid> {
            set.candidates.iter().map(|c| c.memory.id).collect()
        };
        assert_eq!(ids(&first), ids(&second));
        for (a, b) in first.candidates.iter().zip(second.candidates.iter()) {
            assert_eq!(a.vector_score, b.vector_score);
            assert_eq!(a.lexical_score, b.lexical_score);
            assert_eq!(a.graph_hit, b.graph_hit);
        }
    }
}
