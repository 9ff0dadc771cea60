//! Reranker: weighted fusion of channel scores and learned value
//!
//! Produces a deterministic total order: final score descending, then
//! usage_count descending, then last_used descending (never-used last),
//! then id ascending. Truncated to the caller's K.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RerankWeights;
use crate::ranking::scorer::{ScoreSource, ValueScorer};
use crate::retrieval::candidates::Candidate;
use crate::retrieval::features::Features;

/// Per-signal contributions behind one final score. Channel terms are the
/// batch-normalized values fed to the fusion; 0 for channels that did not
/// retrieve the memory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub vector: f32,
    pub lexical: f32,
    pub graph: f32,
    pub value: f32,
    pub value_source: ScoreSource,
}

/// One entry of the final ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedMemory {
    pub memory_id: Uuid,
    pub final_score: f32,
    pub breakdown: ScoreBreakdown,
}

struct RankRow {
    ranked: RankedMemory,
    usage_count: u32,
    last_used: Option<DateTime<Utc>>,
}

/// Fuse per-candidate features into final scores and return the top-k.
///
/// `features` must be parallel to `candidates` (as produced by
/// `compute_features`).
pub fn rerank(
    candidates: &[Candidate],
    features: &[Features],
    scorer: &ValueScorer,
    weights: &RerankWeights,
    k: usize,
) -> Vec<RankedMemory> {
    let mut rows: Vec<RankRow> = candidates
        .iter()
        .zip(features.iter())
        .map(|(candidate, feats)| {
            let value = scorer.score(feats);
            let breakdown = ScoreBreakdown {
                vector: feats.vector_score,
                lexical: feats.lexical_score,
                graph: feats.graph_boost,
                value,
                value_source: scorer.source(),
            };
            let final_score = weights.vector * breakdown.vector
                + weights.lexical * breakdown.lexical
                + weights.graph * breakdown.graph
                + weights.value * breakdown.value;
            RankRow {
                ranked: RankedMemory {
                    memory_id: candidate.memory.id,
                    final_score,
                    breakdown,
                },
                usage_count: candidate.memory.usage_count,
                last_used: candidate.memory.last_used,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.ranked
            .final_score
            .total_cmp(&a.ranked.final_score)
            .then_with(|| b.usage_count.cmp(&a.usage_count))
            .then_with(|| b.last_used.cmp(&a.last_used))
            .then_with(|| a.ranked.memory_id.cmp(&b.ranked.memory_id))
    });
    rows.truncate(k);
    rows.into_iter().map(|row| row.ranked).collect()
}
