//! Time decay of importance and value scores
//!
//! Memories that go unused lose importance along a configurable half-life
//! curve. Importance never drops below the floor, and memories created or
//! used inside the grace window are left untouched so a run right after
//! ingestion cannot erode fresh memories.

use chrono::{DateTime, Duration, Utc};

use crate::config::{ConsolidationConfig, DecayCurve};
use crate::memory::types::Memory;

/// Multiplicative retention factor in [0, 1] for a memory idle `age_days`.
pub fn decay_factor(curve: DecayCurve, age_days: f32, half_life_days: f32) -> f32 {
    let age_days = age_days.max(0.0);
    match curve {
        DecayCurve::Exponential => 0.5_f32.powf(age_days / half_life_days),
        // Same half-life semantics: reaches 0.5 at one half-life, 0 at two.
        DecayCurve::Linear => (1.0 - age_days / (2.0 * half_life_days)).max(0.0),
    }
}

/// New (importance, value_score) for a memory, or `None` when the memory is
/// inside the grace window and must not be decayed.
pub fn decayed_scores(
    memory: &Memory,
    config: &ConsolidationConfig,
    now: DateTime<Utc>,
) -> Option<(f32, Option<f32>)> {
    let grace = Duration::hours(config.grace_window_hours as i64);
    if now - memory.created_at < grace {
        return None;
    }
    if memory.last_used.is_some_and(|used| now - used < grace) {
        return None;
    }

    let age_days = (now - memory.recency_anchor()).num_seconds().max(0) as f32 / 86_400.0;
    let factor = decay_factor(config.decay_curve, age_days, config.half_life_days);

    let importance = (memory.importance * factor).max(config.decay_floor);
    // value_score has no floor: a decayed prediction is just a weak prior
    let value_score = memory.value_score.map(|v| (v * factor).clamp(0.0, 1.0));
    Some((importance, value_score))
}
