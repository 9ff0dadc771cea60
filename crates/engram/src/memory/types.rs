//! Memory types for the Engram system
//!
//! Defines core data structures for storing and retrieving memories,
//! including the main Memory struct, the draft form produced by extraction,
//! and the rows written by consolidation and feedback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single memory unit stored in the Engram system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Unique identifier for this memory
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Classification of what kind of memory this is
    pub memory_type: MemoryType,
    /// Short text capturing the memory (always present)
    pub summary: String,
    /// Optional long-form text the summary was drawn from
    pub raw_text: Option<String>,
    /// Vector embedding (dimension fixed per deployment)
    pub embedding: Vec<f32>,
    /// Importance score in [0, 1]
    pub importance: f32,
    /// Optional emotion tag
    pub emotion: Option<String>,
    /// When this memory was created
    pub created_at: DateTime<Utc>,
    /// When this memory was last surfaced to a caller (None if never)
    pub last_used: Option<DateTime<Utc>>,
    /// How many times this memory was surfaced in a final ranking
    pub usage_count: u32,
    /// Persisted value-scorer prediction in [0, 1], if any
    pub value_score: Option<f32>,
    /// Extracted entities (names, places, etc.)
    pub entities: Vec<String>,
    /// Where this memory originated from
    pub source: MemorySource,
}

impl Memory {
    /// Create a new memory with default bookkeeping fields
    pub fn new(
        user_id: Uuid,
        memory_type: MemoryType,
        summary: String,
        embedding: Vec<f32>,
        source: MemorySource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            memory_type,
            summary,
            raw_text: None,
            embedding,
            importance: 0.5,
            emotion: None,
            created_at: Utc::now(),
            last_used: None,
            usage_count: 0,
            value_score: None,
            entities: Vec::new(),
            source,
        }
    }

    /// Mark this memory as used, updating usage count and timestamp.
    /// Usage increments only on retrieval-confirmed use, never on candidacy.
    pub fn mark_used(&mut self, now: DateTime<Utc>) {
        self.usage_count += 1;
        self.last_used = Some(now);
    }

    /// Update the importance of this memory, clamped to [0, 1]
    pub fn set_importance(&mut self, importance: f32) {
        self.importance = importance.clamp(0.0, 1.0);
    }

    /// The timestamp recency is measured from: last use, or creation if never used
    pub fn recency_anchor(&self) -> DateTime<Utc> {
        self.last_used.unwrap_or(self.created_at)
    }

    /// Text the lexical channel indexes: summary plus raw text when present
    pub fn lexical_text(&self) -> String {
        match &self.raw_text {
            Some(raw) => format!("{} {}", self.summary, raw),
            None => self.summary.clone(),
        }
    }
}

/// Classification of memory types based on cognitive psychology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// What happened (conversations, events)
    Episodic,
    /// Facts and knowledge, including consolidation output
    Semantic,
    /// How to do things
    Procedural,
}

/// Source of the memory - where it originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySource {
    /// From a chat conversation
    Chat,
    /// From a document
    Doc,
    /// From a tool invocation
    Tool,
}

/// A structured memory draft produced by the (external) extraction step.
///
/// The engine computes the embedding and fills in bookkeeping fields when the
/// draft is stored via [`crate::MemoryEngine::remember`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDraft {
    pub user_id: Uuid,
    pub memory_type: MemoryType,
    pub summary: String,
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default = "default_importance")]
    pub importance: f32,
    pub source: MemorySource,
}

fn default_importance() -> f32 {
    0.5
}

impl MemoryDraft {
    pub fn new(user_id: Uuid, memory_type: MemoryType, summary: impl Into<String>) -> Self {
        Self {
            user_id,
            memory_type,
            summary: summary.into(),
            raw_text: None,
            entities: Vec::new(),
            emotion: None,
            importance: default_importance(),
            source: MemorySource::Chat,
        }
    }

    pub fn with_entities(mut self, entities: Vec<String>) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_importance(mut self, importance: f32) -> Self {
        self.importance = importance.clamp(0.0, 1.0);
        self
    }

    pub fn with_source(mut self, source: MemorySource) -> Self {
        self.source = source;
        self
    }

    pub fn with_raw_text(mut self, raw_text: impl Into<String>) -> Self {
        self.raw_text = Some(raw_text.into());
        self
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }
}

/// Cached graph centrality for one memory node.
///
/// Recomputed in batch by the consolidation engine; the retrieval path reads
/// these as an advisory signal and tolerates stale values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub pagerank: f32,
    pub degree: u32,
    pub updated_at: DateTime<Utc>,
}

/// One append-only feedback row: what was retrieved, what was actually used,
/// and the reward the caller assigned. Consumed only by offline training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub query: Option<String>,
    /// The full returned ranking, in order
    pub retrieved_memory_ids: Vec<Uuid>,
    /// The subset the agent actually acted upon
    pub used_memory_ids: Vec<Uuid>,
    /// Reward in [0, 1]
    pub reward: f32,
    pub created_at: DateTime<Utc>,
}
