//! In-memory reference implementation of the graph store contract
//!
//! Adjacency maps guarded by `DashMap`, suitable for tests and single-process
//! deployments. A production deployment would back [`GraphStore`] with a real
//! graph database carrying the same labels and relationships.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::graph::{Edge, EdgeKind, GraphSnapshot, GraphStore, NodeRef};

/// Adjacency-map graph store.
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    /// Outgoing edges per node; a node with no edges has an empty vec.
    forward: DashMap<NodeRef, Vec<Edge>>,
    /// Incoming edges per node as (kind, source).
    reverse: DashMap<NodeRef, Vec<(EdgeKind, NodeRef)>>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&self, node: &NodeRef) {
        self.forward.entry(node.clone()).or_default();
        self.reverse.entry(node.clone()).or_default();
    }
}

#[async_trait]
impl GraphStore for InMemoryGraph {
    async fn upsert_node(&self, node: NodeRef) -> Result<()> {
        self.ensure(&node);
        Ok(())
    }

    async fn upsert_edge(&self, from: NodeRef, kind: EdgeKind, to: NodeRef) -> Result<()> {
        self.ensure(&from);
        self.ensure(&to);
        let edge = Edge {
            kind,
            to: to.clone(),
        };
        {
            let mut out = self.forward.entry(from.clone()).or_default();
            if out.contains(&edge) {
                return Ok(());
            }
            out.push(edge);
        }
        self.reverse.entry(to).or_default().push((kind, from));
        Ok(())
    }

    async fn edges_from(&self, node: &NodeRef) -> Result<Vec<Edge>> {
        Ok(self
            .forward
            .get(node)
            .map(|e| e.clone())
            .unwrap_or_default())
    }

    async fn edges_to(&self, node: &NodeRef) -> Result<Vec<(EdgeKind, NodeRef)>> {
        Ok(self
            .reverse
            .get(node)
            .map(|e| e.clone())
            .unwrap_or_default())
    }

    async fn contains(&self, node: &NodeRef) -> Result<bool> {
        Ok(self.forward.contains_key(node))
    }

    async fn has_incoming(&self, node: &NodeRef, kind: EdgeKind) -> Result<bool> {
        Ok(self
            .reverse
            .get(node)
            .map(|edges| edges.iter().any(|(k, _)| *k == kind))
            .unwrap_or(false))
    }

    async fn user_subgraph(&self, user_id: Uuid) -> Result<GraphSnapshot> {
        let user_node = NodeRef::User(user_id);
        let mut members: HashSet<NodeRef> = HashSet::new();
        members.insert(user_node.clone());

        // The user's memories, then their one-hop neighborhood.
        let mut memories: VecDeque<NodeRef> = VecDeque::new();
        if let Some(out) = self.forward.get(&user_node) {
            for edge in out.iter() {
                if edge.kind == EdgeKind::Experienced {
                    members.insert(edge.to.clone());
                    memories.push_back(edge.to.clone());
                }
            }
        }
        while let Some(node) = memories.pop_front() {
            if let Some(out) = self.forward.get(&node) {
                for edge in out.iter() {
                    members.insert(edge.to.clone());
                }
            }
            if let Some(incoming) = self.reverse.get(&node) {
                for (_, from) in incoming.iter() {
                    members.insert(from.clone());
                }
            }
        }

        let mut adjacency: HashMap<NodeRef, Vec<Edge>> = HashMap::new();
        for node in &members {
            let edges = self
                .forward
                .get(node)
                .map(|e| {
                    e.iter()
                        .filter(|edge| members.contains(&edge.to))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            adjacency.insert(node.clone(), edges);
        }
        Ok(GraphSnapshot { adjacency })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_edge_is_idempotent() {
        let graph = InMemoryGraph::new();
        let a = NodeRef::entity("Funding");
        let b = NodeRef::Memory(Uuid::new_v4());
        graph
            .upsert_edge(a.clone(), EdgeKind::Mentions, b.clone())
            .await
            .unwrap();
        graph
            .upsert_edge(a.clone(), EdgeKind::Mentions, b.clone())
            .await
            .unwrap();
        assert_eq!(graph.edges_from(&a).await.unwrap().len(), 1);
        assert_eq!(graph.edges_to(&b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_has_incoming_detects_kind() {
        let graph = InMemoryGraph::new();
        let semantic = NodeRef::Memory(Uuid::new_v4());
        let episodic = NodeRef::Memory(Uuid::new_v4());
        graph
            .upsert_edge(semantic, EdgeKind::DerivedFrom, episodic.clone())
            .await
            .unwrap();
        assert!(graph
            .has_incoming(&episodic, EdgeKind::DerivedFrom)
            .await
            .unwrap());
        assert!(!graph
            .has_incoming(&episodic, EdgeKind::Mentions)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_user_subgraph_scopes_to_user_neighborhood() {
        let graph = InMemoryGraph::new();
        let user = Uuid::new_v4();
        let other_user = Uuid::new_v4();
        let mine = NodeRef::Memory(Uuid::new_v4());
        let theirs = NodeRef::Memory(Uuid::new_v4());
        let entity = NodeRef::entity("Rust");

        graph
            .upsert_edge(NodeRef::User(user), EdgeKind::Experienced, mine.clone())
            .await
            .unwrap();
        graph
            .upsert_edge(mine.clone(), EdgeKind::Mentions, entity.clone())
            .await
            .unwrap();
        graph
            .upsert_edge(NodeRef::User(other_user), EdgeKind::Experienced, theirs.clone())
            .await
            .unwrap();

        let snapshot = graph.user_subgraph(user).await.unwrap();
        assert!(snapshot.adjacency.contains_key(&mine));
        assert!(snapshot.adjacency.contains_key(&entity));
        assert!(!snapshot.adjacency.contains_key(&theirs));
    }
}
