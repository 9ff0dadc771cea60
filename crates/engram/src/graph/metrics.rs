//! Graph centrality metrics for Memory nodes
//!
//! Degree and PageRank over a user's subgraph snapshot. Recomputed in batch
//! during consolidation and cached as `GraphMetrics` rows; the retrieval path
//! reads the cache and tolerates staleness.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::graph::{GraphSnapshot, NodeRef};
use crate::memory::types::GraphMetrics;

/// Compute pagerank and degree for every Memory node in the snapshot.
pub fn compute_graph_metrics(
    snapshot: &GraphSnapshot,
    iterations: usize,
    damping: f32,
) -> HashMap<Uuid, GraphMetrics> {
    let degree = compute_degree(snapshot);
    let pagerank = compute_pagerank(snapshot, iterations, damping);
    let now = Utc::now();

    let mut out = HashMap::new();
    for (node, deg) in degree {
        if let Some(memory_id) = node.as_memory() {
            out.insert(
                memory_id,
                GraphMetrics {
                    pagerank: pagerank.get(&node).copied().unwrap_or(0.0),
                    degree: deg,
                    updated_at: now,
                },
            );
        }
    }
    out
}

/// Incident edge count (in + out) per node.
fn compute_degree(snapshot: &GraphSnapshot) -> HashMap<NodeRef, u32> {
    let mut degree: HashMap<NodeRef, u32> = HashMap::new();
    for node in snapshot.nodes() {
        degree.entry(node.clone()).or_insert(0);
    }
    for (from, edges) in &snapshot.adjacency {
        for edge in edges {
            *degree.entry(from.clone()).or_insert(0) += 1;
            *degree.entry(edge.to.clone()).or_insert(0) += 1;
        }
    }
    degree
}

/// Iterative PageRank with uniform teleport over the snapshot nodes.
/// Dangling nodes redistribute their mass uniformly.
fn compute_pagerank(
    snapshot: &GraphSnapshot,
    iterations: usize,
    damping: f32,
) -> HashMap<NodeRef, f32> {
    let nodes: Vec<&NodeRef> = snapshot.nodes().collect();
    let n = nodes.len();
    if n == 0 {
        return HashMap::new();
    }

    let index: HashMap<&NodeRef, usize> = nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();
    let mut out_links: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (from, edges) in &snapshot.adjacency {
        let Some(&from_idx) = index.get(from) else {
            continue;
        };
        for edge in edges {
            if let Some(&to_idx) = index.get(&edge.to) {
                out_links[from_idx].push(to_idx);
            }
        }
    }

    let uniform = 1.0 / n as f32;
    let mut rank = vec![uniform; n];
    for _ in 0..iterations {
        let mut next = vec![(1.0 - damping) * uniform; n];
        let mut dangling_mass = 0.0;
        for (i, links) in out_links.iter().enumerate() {
            if links.is_empty() {
                dangling_mass += rank[i];
                continue;
            }
            let share = rank[i] / links.len() as f32;
            for &j in links {
                next[j] += damping * share;
            }
        }
        let dangling_share = damping * dangling_mass * uniform;
        for value in &mut next {
            *value += dangling_share;
        }
        rank = next;
    }

    nodes
        .into_iter()
        .enumerate()
        .map(|(i, node)| (node.clone(), rank[i]))
        .collect()
}
