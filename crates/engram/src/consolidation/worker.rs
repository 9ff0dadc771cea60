//! The consolidation run: cluster, summarize, decay, refresh metrics
//!
//! Runs are per-user mutually exclusive. A second trigger while a run is in
//! flight fails fast with a conflict; there is no queueing and no automatic
//! retry. Each completed cluster is fully committed before the next starts,
//! and within a cluster the semantic memory row is inserted before any edge
//! referencing it, so a failure mid-run never leaves a dangling edge.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ConsolidationConfig;
use crate::consolidation::clustering::{cluster_memories, cluster_utility, Cluster};
use crate::consolidation::decay::decayed_scores;
use crate::embedding::EmbeddingProvider;
use crate::error::{EngramError, Result};
use crate::graph::metrics::compute_graph_metrics;
use crate::graph::{EdgeKind, GraphStore, NodeRef};
use crate::memory::types::{Memory, MemoryType};
use crate::storage::MemoryStore;
use crate::summarize::Summarizer;

/// Lifecycle of a user's most recent consolidation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Outcome summary of one consolidation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub status: RunState,
    pub clusters_formed: usize,
    pub memories_decayed: usize,
}

/// Executes consolidation runs and tracks per-user run state.
pub struct ConsolidationWorker {
    store: Arc<dyn MemoryStore>,
    graph: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    summarizer: Arc<dyn Summarizer>,
    config: ConsolidationConfig,
    runs: DashMap<Uuid, RunState>,
}

impl ConsolidationWorker {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        graph: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        summarizer: Arc<dyn Summarizer>,
        config: ConsolidationConfig,
    ) -> Self {
        Self {
            store,
            graph,
            embedder,
            summarizer,
            config,
            runs: DashMap::new(),
        }
    }

    /// The user's current run state (`Idle` if never run).
    pub fn state(&self, user_id: Uuid) -> RunState {
        self.runs
            .get(&user_id)
            .map(|entry| *entry.value())
            .unwrap_or(RunState::Idle)
    }

    /// Run consolidation for one user.
    pub async fn run(&self, user_id: Uuid) -> Result<ConsolidationReport> {
        use dashmap::mapref::entry::Entry;
        match self.runs.entry(user_id) {
            Entry::Occupied(entry) if *entry.get() == RunState::Running => {
                return Err(EngramError::ConsolidationConflict { user_id });
            }
            Entry::Occupied(mut entry) => {
                entry.insert(RunState::Running);
            }
            Entry::Vacant(entry) => {
                entry.insert(RunState::Running);
            }
        }

        tracing::info!(%user_id, "consolidation run started");
        match self.run_inner(user_id).await {
            Ok((clusters_formed, memories_decayed)) => {
                self.runs.insert(user_id, RunState::Completed);
                tracing::info!(
                    %user_id,
                    clusters_formed,
                    memories_decayed,
                    "consolidation run completed"
                );
                Ok(ConsolidationReport {
                    status: RunState::Completed,
                    clusters_formed,
                    memories_decayed,
                })
            }
            Err(e) => {
                self.runs.insert(user_id, RunState::Failed);
                tracing::warn!(%user_id, error = %e, "consolidation run failed");
                Err(EngramError::ConsolidationFailure {
                    user_id,
                    detail: e.to_string(),
                })
            }
        }
    }

    async fn run_inner(&self, user_id: Uuid) -> Result<(usize, usize)> {
        let now = Utc::now();
        let memories = self
            .store
            .list_for_user(user_id, None, self.config.run_memory_limit)
            .await?;

        // Step 1: cluster the episodic memories not already consolidated.
        let provenance_checks = memories
            .iter()
            .filter(|m| m.memory_type == MemoryType::Episodic)
            .map(|memory| async move {
                let node = NodeRef::Memory(memory.id);
                let consolidated = self.graph.has_incoming(&node, EdgeKind::DerivedFrom).await?;
                Ok::<_, EngramError>((memory, consolidated))
            });
        let candidates: Vec<Memory> = futures::future::try_join_all(provenance_checks)
            .await?
            .into_iter()
            .filter(|(_, consolidated)| !consolidated)
            .map(|(memory, _)| memory.clone())
            .collect();
        let mut clusters: Vec<(Cluster, f32)> =
            cluster_memories(&candidates, self.config.cluster_similarity)
                .into_iter()
                .filter(|c| c.len() >= self.config.min_cluster_size)
                .map(|c| {
                    let utility = cluster_utility(&c, &self.config, now);
                    (c, utility)
                })
                .collect();
        clusters.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| a.0.members[0].id.cmp(&b.0.members[0].id))
        });

        // Step 2: summarize the useful clusters into semantic memories.
        let mut summarized_sources: HashSet<Uuid> = HashSet::new();
        let mut clusters_formed = 0;
        for (cluster, utility) in clusters {
            if clusters_formed >= self.config.max_clusters_per_run {
                break;
            }
            if utility < self.config.cluster_utility_threshold {
                tracing::debug!(
                    %user_id,
                    size = cluster.len(),
                    utility,
                    "skipping low-utility cluster"
                );
                continue;
            }
            self.consolidate_cluster(user_id, &cluster).await?;
            summarized_sources.extend(cluster.members.iter().map(|m| m.id));
            clusters_formed += 1;
        }

        // Step 3: decay everything the run did not just consolidate.
        let mut memories_decayed = 0;
        for memory in &memories {
            if summarized_sources.contains(&memory.id) {
                continue;
            }
            if let Some((importance, value_score)) = decayed_scores(memory, &self.config, now) {
                self.store
                    .apply_decay(memory.id, importance, value_score)
                    .await?;
                memories_decayed += 1;
            }
        }

        // Step 4: refresh cached centrality over the user's subgraph.
        let snapshot = self.graph.user_subgraph(user_id).await?;
        if !snapshot.is_empty() {
            let rows = compute_graph_metrics(
                &snapshot,
                self.config.pagerank_iterations,
                self.config.pagerank_damping,
            );
            self.store.upsert_graph_metrics(&rows).await?;
        }

        Ok((clusters_formed, memories_decayed))
    }

    /// Insert one semantic memory for a cluster, then wire its provenance.
    /// The row goes in before any edge so edges never point at a missing row.
    async fn consolidate_cluster(&self, user_id: Uuid, cluster: &Cluster) -> Result<()> {
        let summaries: Vec<String> = cluster
            .members
            .iter()
            .map(|m| m.summary.clone())
            .collect();
        let summary = self.summarizer.summarize(&summaries).await?;
        let embedding = self.embedder.embed(&summary).await?;

        let entities: BTreeSet<String> = cluster
            .members
            .iter()
            .flat_map(|m| m.entities.iter().cloned())
            .collect();

        let mut semantic = Memory::new(
            user_id,
            MemoryType::Semantic,
            summary,
            embedding,
            cluster.members[0].source,
        );
        semantic.importance = self.config.semantic_importance;
        semantic.entities = entities.into_iter().collect();

        self.store.insert(&semantic).await?;

        let semantic_node = NodeRef::Memory(semantic.id);
        self.graph.upsert_node(semantic_node.clone()).await?;
        self.graph
            .upsert_edge(
                NodeRef::User(user_id),
                EdgeKind::Experienced,
                semantic_node.clone(),
            )
            .await?;
        for entity in &semantic.entities {
            self.graph
                .upsert_edge(
                    semantic_node.clone(),
                    EdgeKind::Mentions,
                    NodeRef::entity(entity),
                )
                .await?;
        }
        for member in &cluster.members {
            self.graph
                .upsert_edge(
                    semantic_node.clone(),
                    EdgeKind::DerivedFrom,
                    NodeRef::Memory(member.id),
                )
                .await?;
        }

        tracing::debug!(
            %user_id,
            semantic_id = %semantic.id,
            sources = cluster.len(),
            "cluster consolidated"
        );
        Ok(())
    }
}
