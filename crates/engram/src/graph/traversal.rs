//! Depth-bounded traversal for the retrieval-time graph channel
//!
//! The relationship graph is cyclic by nature (RELATES_TO and SIMILAR_TO form
//! cycles), so expansion is a breadth-first walk with a visited-set guard and
//! a hard depth bound; acyclicity is never assumed.

use std::collections::{HashSet, VecDeque};

use uuid::Uuid;

use crate::error::Result;
use crate::graph::{EdgeKind, GraphStore, NodeRef};

/// Expand outward from the given entity names, following
/// MENTIONS/RELATES_TO/CAUSES edges in either direction up to `depth` hops,
/// and collect every Memory node reached.
///
/// Entity names that do not exist in the graph are skipped. The result is
/// membership only; the graph channel carries no numeric score.
pub async fn expand_entities(
    graph: &dyn GraphStore,
    entity_names: &[String],
    depth: usize,
) -> Result<HashSet<Uuid>> {
    let mut visited: HashSet<NodeRef> = HashSet::new();
    let mut frontier: VecDeque<(NodeRef, usize)> = VecDeque::new();
    let mut memory_ids: HashSet<Uuid> = HashSet::new();

    for name in entity_names {
        let node = NodeRef::entity(name);
        if graph.contains(&node).await? && visited.insert(node.clone()) {
            frontier.push_back((node, 0));
        }
    }

    while let Some((node, dist)) = frontier.pop_front() {
        if dist >= depth {
            continue;
        }
        let mut neighbors: Vec<(EdgeKind, NodeRef)> = graph
            .edges_from(&node)
            .await?
            .into_iter()
            .map(|e| (e.kind, e.to))
            .collect();
        neighbors.extend(graph.edges_to(&node).await?);

        for (kind, neighbor) in neighbors {
            if !kind.expandable() {
                continue;
            }
            if !visited.insert(neighbor.clone()) {
                continue;
            }
            if let Some(memory_id) = neighbor.as_memory() {
                memory_ids.insert(memory_id);
            }
            frontier.push_back((neighbor, dist + 1));
        }
    }

    Ok(memory_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::InMemoryGraph;

    async fn seed_chain(graph: &InMemoryGraph) -> (Uuid, Uuid) {
        // Funding -> mem_a -> Runway -> mem_b
        let mem_a = Uuid::new_v4();
        let mem_b = Uuid::new_v4();
        graph
            .upsert_edge(
                NodeRef::Memory(mem_a),
                EdgeKind::Mentions,
                NodeRef::entity("Funding"),
            )
            .await
            .unwrap();
        graph
            .upsert_edge(
                NodeRef::Memory(mem_a),
                EdgeKind::Mentions,
                NodeRef::entity("Runway"),
            )
            .await
            .unwrap();
        graph
            .upsert_edge(
                NodeRef::Memory(mem_b),
                EdgeKind::Mentions,
                NodeRef::entity("Runway"),
            )
            .await
            .unwrap();
        (mem_a, mem_b)
    }

    #[tokio::test]
    async fn test_expand_reaches_memories_within_depth() {
        let graph = InMemoryGraph::new();
        let (mem_a, mem_b) = seed_chain(&graph).await;

        let names = vec!["Funding".to_string()];
        let depth1 = expand_entities(&graph, &names, 1).await.unwrap();
        assert!(depth1.contains(&mem_a));
        assert!(!depth1.contains(&mem_b), "mem_b is 3 hops away");

        let depth3 = expand_entities(&graph, &names, 3).await.unwrap();
        assert!(depth3.contains(&mem_a));
        assert!(depth3.contains(&mem_b));
    }

    #[tokio::test]
    async fn test_expand_unknown_entity_yields_empty() {
        let graph = InMemoryGraph::new();
        seed_chain(&graph).await;
        let found = expand_entities(&graph, &["Nonexistent".to_string()], 2)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_expand_survives_cycles() {
        let graph = InMemoryGraph::new();
        let a = NodeRef::entity("A");
        let b = NodeRef::entity("B");
        graph
            .upsert_edge(a.clone(), EdgeKind::RelatesTo, b.clone())
            .await
            .unwrap();
        graph
            .upsert_edge(b.clone(), EdgeKind::RelatesTo, a.clone())
            .await
            .unwrap();
        let mem = Uuid::new_v4();
        graph
            .upsert_edge(NodeRef::Memory(mem), EdgeKind::Mentions, b.clone())
            .await
            .unwrap();

        let found = expand_entities(&graph, &["A".to_string()], 4).await.unwrap();
        assert!(found.contains(&mem));
    }

    #[tokio::test]
    async fn test_expand_ignores_non_expandable_edges() {
        let graph = InMemoryGraph::new();
        let mem = Uuid::new_v4();
        graph
            .upsert_edge(
                NodeRef::Memory(mem),
                EdgeKind::DerivedFrom,
                NodeRef::entity("Funding"),
            )
            .await
            .unwrap();
        let found = expand_entities(&graph, &["Funding".to_string()], 2)
            .await
            .unwrap();
        assert!(found.is_empty(), "DERIVED_FROM must not be expanded");
    }
}
