//! Feature Store: per-candidate feature vectors for value scoring
//!
//! Pure and stateless: identical inputs always yield identical features.
//! Channel scores are normalized min-max within the current candidate batch
//! (never across the whole corpus) so scores are comparable inside one
//! query's result set.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::FeatureConfig;
use crate::memory::types::GraphMetrics;
use crate::retrieval::candidates::Candidate;

/// Number of scalar features per candidate.
pub const FEATURE_DIM: usize = 10;

/// Neutral prior used when a memory has no persisted value score yet.
pub const NEUTRAL_VALUE_PRIOR: f32 = 0.5;

/// Fixed feature vector for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    /// Vector similarity, min-max normalized over the batch (0 if absent)
    pub vector_score: f32,
    /// Lexical score, min-max normalized over the batch (0 if absent/disabled)
    pub lexical_score: f32,
    /// Graph channel membership (0/1)
    pub graph_boost: f32,
    /// PageRank from cached GraphMetrics, batch-normalized (0 if absent)
    pub pagerank: f32,
    /// Degree from cached GraphMetrics, batch-normalized (0 if absent)
    pub degree: f32,
    /// exp(-lambda * days since last use, or creation if never used)
    pub recency: f32,
    /// Log-scaled usage count in [0, 1]
    pub usage: f32,
    /// Stored importance
    pub importance: f32,
    /// Stored value_score, or the neutral prior
    pub value_prior: f32,
    /// Emotion tag present (0/1)
    pub emotion: f32,
}

impl Features {
    pub fn to_array(self) -> [f32; FEATURE_DIM] {
        [
            self.vector_score,
            self.lexical_score,
            self.graph_boost,
            self.pagerank,
            self.degree,
            self.recency,
            self.usage,
            self.importance,
            self.value_prior,
            self.emotion,
        ]
    }
}

/// Min-max normalize into [0, 1]; a batch with equal bounds maps present
/// values to 0.5 so they stay comparable rather than collapsing to 0.
fn normalize(value: f32, lo: f32, hi: f32) -> f32 {
    if hi <= lo {
        return 0.5;
    }
    ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
}

fn bounds(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    let mut seen = false;
    for v in values {
        seen = true;
        lo = lo.min(v);
        hi = hi.max(v);
    }
    seen.then_some((lo, hi))
}

/// Recency as exponential time decay from the memory's last use (or creation).
pub fn recency_score(anchor: DateTime<Utc>, now: DateTime<Utc>, lambda: f32) -> f32 {
    let delta_days = (now - anchor).num_seconds().max(0) as f32 / 86_400.0;
    (-lambda * delta_days).exp()
}

/// Log-scaled usage count, saturating at `cap` uses.
pub fn usage_score(usage_count: u32, cap: u32) -> f32 {
    if cap == 0 {
        return 0.0;
    }
    ((usage_count as f32 + 1.0).ln() / (cap as f32 + 1.0).ln()).clamp(0.0, 1.0)
}

/// Compute features for a candidate batch.
///
/// `metrics` holds cached centrality for any subset of the batch; absent
/// entries contribute zero. Returned vec is parallel to `candidates`.
pub fn compute_features(
    candidates: &[Candidate],
    metrics: &HashMap<Uuid, GraphMetrics>,
    config: &FeatureConfig,
    now: DateTime<Utc>,
) -> Vec<Features> {
    let vector_bounds = bounds(candidates.iter().filter_map(|c| c.vector_score));
    let lexical_bounds = bounds(candidates.iter().filter_map(|c| c.lexical_score));
    let pagerank_bounds = bounds(
        candidates
            .iter()
            .filter_map(|c| metrics.get(&c.memory.id).map(|m| m.pagerank)),
    );
    let degree_bounds = bounds(
        candidates
            .iter()
            .filter_map(|c| metrics.get(&c.memory.id).map(|m| m.degree as f32)),
    );

    candidates
        .iter()
        .map(|candidate| {
            let memory = &candidate.memory;
            let metric = metrics.get(&memory.id);

            let vector_score = match (candidate.vector_score, vector_bounds) {
                (Some(v), Some((lo, hi))) => normalize(v, lo, hi),
                _ => 0.0,
            };
            let lexical_score = match (candidate.lexical_score, lexical_bounds) {
                (Some(v), Some((lo, hi))) => normalize(v, lo, hi),
                _ => 0.0,
            };
            let pagerank = match (metric.map(|m| m.pagerank), pagerank_bounds) {
                (Some(v), Some((lo, hi))) => normalize(v, lo, hi),
                _ => 0.0,
            };
            let degree = match (metric.map(|m| m.degree as f32), degree_bounds) {
                (Some(v), Some((lo, hi))) => normalize(v, lo, hi),
                _ => 0.0,
            };

            Features {
                vector_score,
                lexical_score,
                graph_boost: if candidate.graph_hit { 1.0 } else { 0.0 },
                pagerank,
                degree,
                recency: recency_score(memory.recency_anchor(), now, config.recency_lambda),
                usage: usage_score(memory.usage_count, config.usage_log_cap),
                importance: memory.importance,
                value_prior: memory.value_score.unwrap_or(NEUTRAL_VALUE_PRIOR),
                emotion: if memory.emotion.as_deref().is_some_and(|e| !e.is_empty()) {
                    1.0
                } else {
                    0.0
                },
            }
        })
        .collect()
}
