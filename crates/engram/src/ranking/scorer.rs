//! Value scorer: trained checkpoint with a heuristic fallback
//!
//! The trained path is a small two-layer MLP (ReLU hidden layer, sigmoid
//! output) loaded from a JSON checkpoint produced by the offline trainer.
//! When no checkpoint is configured, or loading fails, the engine degrades
//! to a fixed heuristic and flags responses accordingly. Inference does no
//! I/O and cannot fail.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ScorerConfig;
use crate::error::{EngramError, Result};
use crate::retrieval::features::{Features, FEATURE_DIM};

/// Which scorer produced the value scores in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Trained,
    Fallback,
}

/// Serialized two-layer MLP. Row-major weights: `w1[h][i]`, `w2[h]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MvnCheckpoint {
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub w1: Vec<Vec<f32>>,
    pub b1: Vec<f32>,
    pub w2: Vec<f32>,
    pub b2: f32,
}

impl MvnCheckpoint {
    /// Reject checkpoints whose shape does not match the feature vector.
    fn validate(&self) -> Result<()> {
        if self.input_dim != FEATURE_DIM {
            return Err(EngramError::Scorer(format!(
                "checkpoint input_dim {} does not match feature dimension {FEATURE_DIM}",
                self.input_dim
            )));
        }
        if self.hidden_dim == 0 {
            return Err(EngramError::Scorer("checkpoint hidden_dim is zero".to_string()));
        }
        if self.w1.len() != self.hidden_dim
            || self.w1.iter().any(|row| row.len() != self.input_dim)
        {
            return Err(EngramError::Scorer(format!(
                "checkpoint w1 shape is not {}x{}",
                self.hidden_dim, self.input_dim
            )));
        }
        if self.b1.len() != self.hidden_dim || self.w2.len() != self.hidden_dim {
            return Err(EngramError::Scorer(
                "checkpoint b1/w2 length does not match hidden_dim".to_string(),
            ));
        }
        Ok(())
    }

    fn forward(&self, input: &[f32; FEATURE_DIM]) -> f32 {
        let mut output = self.b2;
        for h in 0..self.hidden_dim {
            let mut pre = self.b1[h];
            for (i, x) in input.iter().enumerate() {
                pre += self.w1[h][i] * x;
            }
            output += self.w2[h] * pre.max(0.0);
        }
        sigmoid(output)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Scores a candidate's retention value in [0, 1] from its features.
#[derive(Debug, Clone)]
pub enum ValueScorer {
    Trained(MvnCheckpoint),
    Heuristic,
}

impl ValueScorer {
    /// Load a checkpoint from disk, validating its shape.
    pub fn from_checkpoint(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngramError::Scorer(format!("failed to read checkpoint {}: {e}", path.display()))
        })?;
        let checkpoint: MvnCheckpoint = serde_json::from_str(&content)
            .map_err(|e| EngramError::Scorer(format!("failed to parse checkpoint: {e}")))?;
        checkpoint.validate()?;
        Ok(ValueScorer::Trained(checkpoint))
    }

    /// Build from config: no checkpoint path or a failing load yields the
    /// heuristic scorer with a warning, never an error.
    pub fn from_config(config: &ScorerConfig) -> Self {
        let Some(path) = &config.checkpoint_path else {
            tracing::info!("no scorer checkpoint configured, using heuristic scorer");
            return ValueScorer::Heuristic;
        };
        match Self::from_checkpoint(path) {
            Ok(scorer) => {
                tracing::info!(path = %path.display(), "loaded value scorer checkpoint");
                scorer
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "scorer checkpoint unusable, falling back to heuristic");
                ValueScorer::Heuristic
            }
        }
    }

    pub fn source(&self) -> ScoreSource {
        match self {
            ValueScorer::Trained(_) => ScoreSource::Trained,
            ValueScorer::Heuristic => ScoreSource::Fallback,
        }
    }

    /// Value score in [0, 1]. Pure; no I/O.
    pub fn score(&self, features: &Features) -> f32 {
        match self {
            ValueScorer::Trained(checkpoint) => checkpoint.forward(&features.to_array()),
            ValueScorer::Heuristic => {
                (0.5 * features.importance + 0.3 * features.recency + 0.2 * features.usage)
                    .clamp(0.0, 1.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn features_with(importance: f32, recency: f32, usage: f32) -> Features {
        Features {
            vector_score: 0.5,
            lexical_score: 0.0,
            graph_boost: 0.0,
            pagerank: 0.0,
            degree: 0.0,
            recency,
            usage,
            importance,
            value_prior: 0.5,
            emotion: 0.0,
        }
    }

    fn tiny_checkpoint() -> MvnCheckpoint {
        MvnCheckpoint {
            input_dim: FEATURE_DIM,
            hidden_dim: 2,
            w1: vec![vec![0.1; FEATURE_DIM], vec![-0.05; FEATURE_DIM]],
            b1: vec![0.0, 0.1],
            w2: vec![0.8, -0.3],
            b2: 0.05,
        }
    }

    #[test]
    fn test_heuristic_score_in_range_and_monotone() {
        let scorer = ValueScorer::Heuristic;
        let low = scorer.score(&features_with(0.0, 0.0, 0.0));
        let high = scorer.score(&features_with(1.0, 1.0, 1.0));
        assert_eq!(low, 0.0);
        assert_eq!(high, 1.0);
        assert!(scorer.score(&features_with(0.5, 0.5, 0.5)) > low);
        assert_eq!(scorer.source(), ScoreSource::Fallback);
    }

    #[test]
    fn test_trained_score_in_range() {
        let scorer = ValueScorer::Trained(tiny_checkpoint());
        for importance in [0.0, 0.5, 1.0] {
            let score = scorer.score(&features_with(importance, 0.9, 0.2));
            assert!((0.0..=1.0).contains(&score));
        }
        assert_eq!(scorer.source(), ScoreSource::Trained);
    }

    #[test]
    fn test_checkpoint_round_trip_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&tiny_checkpoint()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let scorer = ValueScorer::from_checkpoint(file.path()).unwrap();
        assert_eq!(scorer.source(), ScoreSource::Trained);
    }

    #[test]
    fn test_wrong_input_dim_rejected() {
        let mut checkpoint = tiny_checkpoint();
        checkpoint.input_dim = 7;
        checkpoint.w1 = vec![vec![0.1; 7], vec![0.1; 7]];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&checkpoint).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        assert!(ValueScorer::from_checkpoint(file.path()).is_err());
    }

    #[test]
    fn test_ragged_weights_rejected() {
        let mut checkpoint = tiny_checkpoint();
        checkpoint.w1[1].pop();
        assert!(checkpoint.validate().is_err());
    }

    #[test]
    fn test_from_config_degrades_on_missing_file() {
        let config = ScorerConfig {
            checkpoint_path: Some("/nonexistent/checkpoint.json".into()),
        };
        let scorer = ValueScorer::from_config(&config);
        assert_eq!(scorer.source(), ScoreSource::Fallback);
    }

    #[test]
    fn test_from_config_without_path_is_heuristic() {
        let scorer = ValueScorer::from_config(&ScorerConfig::default());
        assert_eq!(scorer.source(), ScoreSource::Fallback);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let scorer = ValueScorer::Trained(tiny_checkpoint());
        let features = features_with(0.7, 0.4, 0.3);
        assert_eq!(scorer.score(&features), scorer.score(&features));
    }
}
