//! Graph model for memory relationships
//!
//! Engram references an external graph store of labeled nodes and
//! relationships. The store is consumed through an explicit adjacency
//! abstraction (node -> incident edges) so traversal logic never leaks into
//! storage calls, and cycles (SIMILAR_TO, RELATES_TO) are handled by the
//! traversal layer rather than assumed away.

pub mod entities;
pub mod metrics;
pub mod store;
pub mod traversal;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

pub use store::InMemoryGraph;

/// A node reference in the memory graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    User(Uuid),
    Memory(Uuid),
    Entity(String),
    Concept(String),
    Event(String),
}

impl NodeRef {
    /// The memory id if this node is a Memory node.
    pub fn as_memory(&self) -> Option<Uuid> {
        match self {
            NodeRef::Memory(id) => Some(*id),
            _ => None,
        }
    }

    /// Canonical entity node for a name (trimmed).
    pub fn entity(name: &str) -> Self {
        NodeRef::Entity(name.trim().to_string())
    }
}

/// Relationship kinds between graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Mentions,
    RelatesTo,
    Causes,
    PartOf,
    SimilarTo,
    DerivedFrom,
    Experienced,
}

impl EdgeKind {
    /// Edge kinds the retrieval-time graph expansion is allowed to follow.
    pub fn expandable(&self) -> bool {
        matches!(self, EdgeKind::Mentions | EdgeKind::RelatesTo | EdgeKind::Causes)
    }
}

/// A directed, labeled edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub kind: EdgeKind,
    pub to: NodeRef,
}

/// A directed snapshot of one user's neighborhood, used for batch metrics.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    /// Outgoing adjacency for every node in the snapshot
    pub adjacency: HashMap<NodeRef, Vec<Edge>>,
}

impl GraphSnapshot {
    /// All nodes in the snapshot.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRef> {
        self.adjacency.keys()
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}

/// Read/write contract Engram needs from the external graph store.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create the node if absent.
    async fn upsert_node(&self, node: NodeRef) -> Result<()>;

    /// Create a directed edge (idempotent), creating endpoints as needed.
    async fn upsert_edge(&self, from: NodeRef, kind: EdgeKind, to: NodeRef) -> Result<()>;

    /// Outgoing edges from a node.
    async fn edges_from(&self, node: &NodeRef) -> Result<Vec<Edge>>;

    /// Incoming edges to a node, returned as (kind, source).
    async fn edges_to(&self, node: &NodeRef) -> Result<Vec<(EdgeKind, NodeRef)>>;

    /// Whether the node exists in the graph.
    async fn contains(&self, node: &NodeRef) -> Result<bool>;

    /// Whether any incoming edge of the given kind points at the node.
    /// Used to detect already-consolidated episodic memories (incoming
    /// DERIVED_FROM provenance).
    async fn has_incoming(&self, node: &NodeRef, kind: EdgeKind) -> Result<bool>;

    /// Directed snapshot of the user's neighborhood: the user's Memory nodes
    /// (via EXPERIENCED), every node adjacent to them, and edges among that
    /// set. Advisory input to batch metrics only.
    async fn user_subgraph(&self, user_id: Uuid) -> Result<GraphSnapshot>;
}
