//! Summarization collaborator seam
//!
//! Consolidation delegates cluster synthesis to an external summarizer
//! (typically an LLM). The engine depends only on this trait; a trivial
//! joining implementation ships for tests and offline runs.

use async_trait::async_trait;

use crate::error::Result;

/// Trait for cluster summarizers: a sequence of memory summaries in, one
/// synthesized long-term insight out.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Synthesize one summary from a cluster of memory summaries.
    async fn summarize(&self, summaries: &[String]) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Fallback summarizer: joins the first few summaries verbatim.
///
/// Used when no LLM collaborator is configured; keeps consolidation runnable
/// end to end without network access.
#[derive(Debug, Clone)]
pub struct JoinSummarizer {
    max_parts: usize,
}

impl JoinSummarizer {
    pub fn new(max_parts: usize) -> Self {
        Self { max_parts }
    }
}

impl Default for JoinSummarizer {
    fn default() -> Self {
        Self::new(3)
    }
}

#[async_trait]
impl Summarizer for JoinSummarizer {
    async fn summarize(&self, summaries: &[String]) -> Result<String> {
        Ok(summaries
            .iter()
            .take(self.max_parts)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("; "))
    }

    fn name(&self) -> &'static str {
        "join"
    }
}
