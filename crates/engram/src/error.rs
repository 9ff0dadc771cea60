//! Error types for Engram

use thiserror::Error;
use uuid::Uuid;

/// Main error type for Engram operations
#[derive(Error, Debug)]
pub enum EngramError {
    /// Mandatory retrieval channel or backing store unreachable - fatal to the query
    #[error("Retrieval unavailable ({component}): {detail}")]
    RetrievalUnavailable { component: String, detail: String },

    /// A consolidation run is already in progress for this user
    #[error("Consolidation already running for user {user_id}")]
    ConsolidationConflict { user_id: Uuid },

    /// I/O failure mid-consolidation; the run is marked Failed
    #[error("Consolidation failed for user {user_id}: {detail}")]
    ConsolidationFailure { user_id: Uuid, detail: String },

    /// Malformed payload rejected at the boundary
    #[error("Validation error: {0}")]
    Validation(String),

    /// Memory store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Graph store errors
    #[error("Graph error: {0}")]
    Graph(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Value scorer checkpoint errors (recovered locally via heuristic fallback)
    #[error("Scorer error: {0}")]
    Scorer(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Summarization collaborator errors
    #[error("Summarizer error: {0}")]
    Summarizer(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Engram operations
pub type Result<T> = std::result::Result<T, EngramError>;
