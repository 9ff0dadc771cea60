//! Greedy similarity clustering of episodic memories
//!
//! Memories are visited in (created_at, id) order. Each unassigned memory
//! seeds a cluster and absorbs every later unassigned memory whose embedding
//! is within the similarity threshold of the seed. A memory joins at most one
//! cluster per run, so the output is a partition.

use chrono::{DateTime, Utc};

use crate::config::ConsolidationConfig;
use crate::embedding::cosine_similarity;
use crate::memory::types::Memory;

/// One cluster of similar episodic memories, seed first.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub members: Vec<Memory>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Partition memories into greedy similarity clusters.
pub fn cluster_memories(memories: &[Memory], similarity_threshold: f32) -> Vec<Cluster> {
    let mut ordered: Vec<&Memory> = memories.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    let mut assigned = vec![false; ordered.len()];
    let mut clusters = Vec::new();

    for seed_idx in 0..ordered.len() {
        if assigned[seed_idx] {
            continue;
        }
        assigned[seed_idx] = true;
        let seed = ordered[seed_idx];
        let mut members = vec![seed.clone()];

        for other_idx in (seed_idx + 1)..ordered.len() {
            if assigned[other_idx] {
                continue;
            }
            let other = ordered[other_idx];
            if cosine_similarity(&seed.embedding, &other.embedding) >= similarity_threshold {
                assigned[other_idx] = true;
                members.push(other.clone());
            }
        }
        clusters.push(Cluster { members });
    }
    clusters
}

/// Mean retention utility of a cluster: how much the memories are still
/// worth keeping individually. Low-utility clusters are not worth an LLM
/// summarization call.
pub fn cluster_utility(cluster: &Cluster, config: &ConsolidationConfig, now: DateTime<Utc>) -> f32 {
    if cluster.is_empty() {
        return 0.0;
    }
    let total: f32 = cluster
        .members
        .iter()
        .map(|m| retention_utility(m, config, now))
        .sum();
    total / cluster.len() as f32
}

/// Retention proxy for one memory: value estimate blended with importance,
/// damped by how far the memory has already decayed.
fn retention_utility(memory: &Memory, config: &ConsolidationConfig, now: DateTime<Utc>) -> f32 {
    let value = memory.value_score.unwrap_or(0.5).max(0.2);
    let base = 0.6 * value + 0.4 * memory.importance;
    let age_days = (now - memory.recency_anchor()).num_seconds().max(0) as f32 / 86_400.0;
    let discount = super::decay::decay_factor(config.decay_curve, age_days, config.half_life_days);
    base * discount
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{MemorySource, MemoryType};
    use chrono::Duration;
    use uuid::Uuid;

    fn memory_at(embedding: Vec<f32>, created_at: DateTime<Utc>) -> Memory {
        let mut memory = Memory::new(
            Uuid::new_v4(),
            MemoryType::Episodic,
            "episode".to_string(),
            embedding,
            MemorySource::Chat,
        );
        memory.created_at = created_at;
        memory
    }

    #[test]
    fn test_similar_memories_cluster_together() {
        let now = Utc::now();
        let memories = vec![
            memory_at(vec![1.0, 0.0], now),
            memory_at(vec![0.99, 0.05], now + Duration::minutes(1)),
            memory_at(vec![0.0, 1.0], now + Duration::minutes(2)),
        ];
        let clusters = cluster_memories(&memories, 0.8);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 2);
        assert_eq!(clusters[1].len(), 1);
    }

    #[test]
    fn test_each_memory_joins_one_cluster() {
        let now = Utc::now();
        let memories: Vec<Memory> = (0..6)
            .map(|i| memory_at(vec![1.0, 0.01 * i as f32], now + Duration::minutes(i)))
            .collect();
        let clusters = cluster_memories(&memories, 0.5);
        let total: usize = clusters.iter().map(Cluster::len).sum();
        assert_eq!(total, memories.len(), "clusters form a partition");
    }

    #[test]
    fn test_clustering_order_is_deterministic() {
        let now = Utc::now();
        let memories = vec![
            memory_at(vec![1.0, 0.0], now + Duration::minutes(1)),
            memory_at(vec![0.9, 0.1], now),
            memory_at(vec![0.95, 0.05], now + Duration::minutes(2)),
        ];
        let a = cluster_memories(&memories, 0.8);
        let b = cluster_memories(&memories, 0.8);
        let ids = |clusters: &[Cluster]| -> Vec<Vec<Uuid>> {
            clusters
                .iter()
                .map(|c| c.members.iter().map(|m| m.id).collect())
                .collect()
        };
        assert_eq!(ids(&a), ids(&b));
        // Oldest memory seeds the first cluster
        assert_eq!(a[0].members[0].id, memories[1].id);
    }

    #[test]
    fn test_unrelated_memories_stay_singletons() {
        let now = Utc::now();
        let memories = vec![
            memory_at(vec![1.0, 0.0, 0.0], now),
            memory_at(vec![0.0, 1.0, 0.0], now),
            memory_at(vec![0.0, 0.0, 1.0], now),
        ];
        let clusters = cluster_memories(&memories, 0.8);
        assert_eq!(clusters.len(), 3);
        assert!(clusters.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn test_cluster_utility_favors_valuable_recent_memories() {
        let now = Utc::now();
        let config = ConsolidationConfig::default();

        let mut fresh = memory_at(vec![1.0], now);
        fresh.importance = 0.9;
        fresh.value_score = Some(0.9);
        let fresh_cluster = Cluster {
            members: vec![fresh],
        };

        let mut stale = memory_at(vec![1.0], now - Duration::days(60));
        stale.importance = 0.1;
        stale.value_score = Some(0.0);
        let stale_cluster = Cluster {
            members: vec![stale],
        };

        let fresh_utility = cluster_utility(&fresh_cluster, &config, now);
        let stale_utility = cluster_utility(&stale_cluster, &config, now);
        assert!(fresh_utility > stale_utility);
        assert!(stale_utility < 0.15, "long-dead cluster falls below the gate");
    }

    #[test]
    fn test_empty_input_yields_no_clusters() {
        assert!(cluster_memories(&[], 0.8).is_empty());
    }
}
