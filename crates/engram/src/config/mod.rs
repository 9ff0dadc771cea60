//! Configuration for the Engram engine
//!
//! Every tunable of the retrieval, ranking, and consolidation paths lives
//! here. All sections deserialize from TOML with sensible defaults, so an
//! empty config file yields a working engine.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{EngramError, Result};

/// Main configuration structure for Engram
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Candidate builder configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Reranker signal weights
    #[serde(default)]
    pub rerank: RerankWeights,
    /// Feature extraction configuration
    #[serde(default)]
    pub features: FeatureConfig,
    /// Value scorer configuration
    #[serde(default)]
    pub scorer: ScorerConfig,
    /// Consolidation (sleep worker) configuration
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngramError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| EngramError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints (weight sum, thresholds).
    pub fn validate(&self) -> Result<()> {
        self.rerank.validate()?;
        self.consolidation.validate()?;
        Ok(())
    }
}

/// Candidate builder configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Vector channel fetches `k * vector_multiplier` candidates (min `k`)
    #[serde(default = "default_vector_multiplier")]
    pub vector_multiplier: usize,
    /// Hard ceiling on vector channel candidates
    #[serde(default = "default_vector_cap")]
    pub vector_cap: usize,
    /// Enable the lexical (BM25) channel
    #[serde(default = "default_lexical_enabled")]
    pub lexical_enabled: bool,
    /// Top-N results taken from the lexical channel
    #[serde(default = "default_lexical_top_n")]
    pub lexical_top_n: usize,
    /// Maximum memories per user indexed by the per-query lexical channel
    #[serde(default = "default_lexical_corpus_limit")]
    pub lexical_corpus_limit: usize,
    /// Enable the graph expansion channel
    #[serde(default = "default_graph_enabled")]
    pub graph_enabled: bool,
    /// Maximum traversal depth for graph expansion
    #[serde(default = "default_graph_depth")]
    pub graph_depth: usize,
    /// Timeout for the optional channels; on expiry they contribute nothing
    #[serde(default = "default_optional_channel_timeout_ms")]
    pub optional_channel_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_multiplier: default_vector_multiplier(),
            vector_cap: default_vector_cap(),
            lexical_enabled: default_lexical_enabled(),
            lexical_top_n: default_lexical_top_n(),
            lexical_corpus_limit: default_lexical_corpus_limit(),
            graph_enabled: default_graph_enabled(),
            graph_depth: default_graph_depth(),
            optional_channel_timeout_ms: default_optional_channel_timeout_ms(),
        }
    }
}

impl RetrievalConfig {
    /// Vector channel budget for a query asking for `k` results.
    pub fn vector_budget(&self, k: usize) -> usize {
        (k * self.vector_multiplier).max(k).min(self.vector_cap)
    }
}

fn default_vector_multiplier() -> usize {
    4
}

fn default_vector_cap() -> usize {
    50
}

fn default_lexical_enabled() -> bool {
    true
}

fn default_lexical_top_n() -> usize {
    30
}

fn default_lexical_corpus_limit() -> usize {
    5000
}

fn default_graph_enabled() -> bool {
    true
}

fn default_graph_depth() -> usize {
    2
}

fn default_optional_channel_timeout_ms() -> u64 {
    300
}

/// Per-signal weights fused by the reranker. Must sum to 1.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RerankWeights {
    #[serde(default = "default_weight_vector")]
    pub vector: f32,
    #[serde(default = "default_weight_lexical")]
    pub lexical: f32,
    #[serde(default = "default_weight_graph")]
    pub graph: f32,
    #[serde(default = "default_weight_value")]
    pub value: f32,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            vector: default_weight_vector(),
            lexical: default_weight_lexical(),
            graph: default_weight_graph(),
            value: default_weight_value(),
        }
    }
}

impl RerankWeights {
    /// Reject weight sets that do not sum to 1 (within float tolerance).
    pub fn validate(&self) -> Result<()> {
        let sum = self.vector + self.lexical + self.graph + self.value;
        if (sum - 1.0).abs() > 1e-4 {
            return Err(EngramError::Config(format!(
                "rerank weights must sum to 1.0, got {sum}"
            )));
        }
        if [self.vector, self.lexical, self.graph, self.value]
            .iter()
            .any(|w| *w < 0.0)
        {
            return Err(EngramError::Config(
                "rerank weights must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_weight_vector() -> f32 {
    0.4
}

fn default_weight_lexical() -> f32 {
    0.15
}

fn default_weight_graph() -> f32 {
    0.15
}

fn default_weight_value() -> f32 {
    0.3
}

/// Feature extraction configuration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeatureConfig {
    /// Exponential recency decay rate per day
    #[serde(default = "default_recency_lambda")]
    pub recency_lambda: f32,
    /// Usage count where the log-scaled usage feature saturates at 1.0
    #[serde(default = "default_usage_log_cap")]
    pub usage_log_cap: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            recency_lambda: default_recency_lambda(),
            usage_log_cap: default_usage_log_cap(),
        }
    }
}

fn default_recency_lambda() -> f32 {
    0.1
}

fn default_usage_log_cap() -> u32 {
    100
}

/// Value scorer configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ScorerConfig {
    /// Path to a trained checkpoint. When absent or unloadable the engine
    /// degrades to the heuristic scorer and flags responses accordingly.
    #[serde(default)]
    pub checkpoint_path: Option<PathBuf>,
}

/// Shape of the time-decay curve applied during consolidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayCurve {
    Exponential,
    Linear,
}

/// Consolidation (sleep worker) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConsolidationConfig {
    /// Cosine similarity at or above which episodic memories cluster together
    #[serde(default = "default_cluster_similarity")]
    pub cluster_similarity: f32,
    /// Clusters smaller than this are left untouched
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,
    /// Maximum clusters summarized in one run
    #[serde(default = "default_max_clusters_per_run")]
    pub max_clusters_per_run: usize,
    /// Clusters whose mean retention utility falls below this are skipped
    #[serde(default = "default_cluster_utility_threshold")]
    pub cluster_utility_threshold: f32,
    /// Importance assigned to newly created semantic memories
    #[serde(default = "default_semantic_importance")]
    pub semantic_importance: f32,
    /// Decay curve shape
    #[serde(default = "default_decay_curve")]
    pub decay_curve: DecayCurve,
    /// Half-life of the decay curve, in days
    #[serde(default = "default_half_life_days")]
    pub half_life_days: f32,
    /// Importance never decays below this floor
    #[serde(default = "default_decay_floor")]
    pub decay_floor: f32,
    /// Memories created or used within this window are never decayed
    #[serde(default = "default_grace_window_hours")]
    pub grace_window_hours: u64,
    /// PageRank iterations for the metrics refresh
    #[serde(default = "default_pagerank_iterations")]
    pub pagerank_iterations: usize,
    /// PageRank damping factor
    #[serde(default = "default_pagerank_damping")]
    pub pagerank_damping: f32,
    /// Maximum memories loaded per consolidation run
    #[serde(default = "default_run_memory_limit")]
    pub run_memory_limit: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            cluster_similarity: default_cluster_similarity(),
            min_cluster_size: default_min_cluster_size(),
            max_clusters_per_run: default_max_clusters_per_run(),
            cluster_utility_threshold: default_cluster_utility_threshold(),
            semantic_importance: default_semantic_importance(),
            decay_curve: default_decay_curve(),
            half_life_days: default_half_life_days(),
            decay_floor: default_decay_floor(),
            grace_window_hours: default_grace_window_hours(),
            pagerank_iterations: default_pagerank_iterations(),
            pagerank_damping: default_pagerank_damping(),
            run_memory_limit: default_run_memory_limit(),
        }
    }
}

impl ConsolidationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.cluster_similarity) {
            return Err(EngramError::Config(format!(
                "cluster_similarity must be in [0, 1], got {}",
                self.cluster_similarity
            )));
        }
        if self.min_cluster_size < 2 {
            return Err(EngramError::Config(
                "min_cluster_size must be at least 2".to_string(),
            ));
        }
        if self.half_life_days <= 0.0 {
            return Err(EngramError::Config(
                "half_life_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_cluster_similarity() -> f32 {
    0.8
}

fn default_min_cluster_size() -> usize {
    2
}

fn default_max_clusters_per_run() -> usize {
    50
}

fn default_cluster_utility_threshold() -> f32 {
    0.15
}

fn default_semantic_importance() -> f32 {
    0.6
}

fn default_decay_curve() -> DecayCurve {
    DecayCurve::Exponential
}

fn default_half_life_days() -> f32 {
    7.0
}

fn default_decay_floor() -> f32 {
    0.05
}

fn default_grace_window_hours() -> u64 {
    24
}

fn default_pagerank_iterations() -> usize {
    20
}

fn default_pagerank_damping() -> f32 {
    0.85
}

fn default_run_memory_limit() -> usize {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rerank.vector, 0.4);
        assert_eq!(config.rerank.value, 0.3);
        assert_eq!(config.consolidation.cluster_similarity, 0.8);
        assert_eq!(config.consolidation.grace_window_hours, 24);
        assert_eq!(config.consolidation.decay_floor, 0.05);
    }

    #[test]
    fn test_empty_toml_parses_to_defaults() {
        let config: Config = toml::from_str("").expect("empty config should parse");
        assert_eq!(config.retrieval.graph_depth, 2);
        assert!(config.retrieval.lexical_enabled);
        assert!(config.scorer.checkpoint_path.is_none());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: Config = toml::from_str(
            r#"
            [retrieval]
            lexical_enabled = false
            graph_depth = 3

            [consolidation]
            half_life_days = 14.0
            decay_curve = "linear"
            "#,
        )
        .expect("partial config should parse");
        assert!(!config.retrieval.lexical_enabled);
        assert_eq!(config.retrieval.graph_depth, 3);
        assert_eq!(config.consolidation.half_life_days, 14.0);
        assert_eq!(config.consolidation.decay_curve, DecayCurve::Linear);
    }

    #[test]
    fn test_rerank_weights_must_sum_to_one() {
        let weights = RerankWeights {
            vector: 0.5,
            lexical: 0.5,
            graph: 0.5,
            value: 0.5,
        };
        assert!(weights.validate().is_err());
        assert!(RerankWeights::default().validate().is_ok());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let weights = RerankWeights {
            vector: 1.2,
            lexical: -0.2,
            graph: 0.0,
            value: 0.0,
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_vector_budget_respects_cap_and_floor() {
        let config = RetrievalConfig::default();
        assert_eq!(config.vector_budget(5), 20);
        assert_eq!(config.vector_budget(40), 50, "capped at vector_cap");
        let narrow = RetrievalConfig {
            vector_multiplier: 0,
            ..RetrievalConfig::default()
        };
        assert_eq!(narrow.vector_budget(5), 5, "never below k");
    }

    #[test]
    fn test_invalid_consolidation_config_rejected() {
        let config = ConsolidationConfig {
            cluster_similarity: 1.5,
            ..ConsolidationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ConsolidationConfig {
            half_life_days: 0.0,
            ..ConsolidationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
