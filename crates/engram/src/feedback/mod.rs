//! Feedback Accumulator: training signal capture
//!
//! Records which memories a retrieval surfaced, which the agent actually
//! used, and the reward the caller assigned. Rows are append-only and read
//! only by the offline trainer. Invalid input is rejected outright, never
//! silently clamped.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{EngramError, Result};
use crate::memory::types::FeedbackRecord;
use crate::storage::MemoryStore;

pub struct FeedbackAccumulator {
    store: Arc<dyn MemoryStore>,
}

impl FeedbackAccumulator {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    /// Validate and append one feedback row.
    pub async fn record(
        &self,
        user_id: Option<Uuid>,
        query: Option<String>,
        retrieved_memory_ids: Vec<Uuid>,
        used_memory_ids: Vec<Uuid>,
        reward: f32,
    ) -> Result<FeedbackRecord> {
        if used_memory_ids.is_empty() {
            return Err(EngramError::Validation(
                "used_memory_ids must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&reward) || reward.is_nan() {
            return Err(EngramError::Validation(format!(
                "reward must be in [0, 1], got {reward}"
            )));
        }

        let record = FeedbackRecord {
            id: Uuid::new_v4(),
            user_id,
            query,
            retrieved_memory_ids,
            used_memory_ids,
            reward,
            created_at: Utc::now(),
        };
        self.store.append_feedback(&record).await?;

        let total = self.store.feedback_count().await?;
        tracing::debug!(record_id = %record.id, reward, total, "feedback recorded");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn accumulator() -> (Arc<InMemoryStore>, FeedbackAccumulator) {
        let store = Arc::new(InMemoryStore::new());
        let accumulator = FeedbackAccumulator::new(store.clone());
        (store, accumulator)
    }

    #[tokio::test]
    async fn test_valid_feedback_is_appended() {
        let (store, accumulator) = accumulator();
        let used = vec![Uuid::new_v4()];
        let record = accumulator
            .record(
                Some(Uuid::new_v4()),
                Some("what did we decide".to_string()),
                vec![used[0], Uuid::new_v4()],
                used.clone(),
                0.8,
            )
            .await
            .unwrap();
        assert_eq!(record.used_memory_ids, used);
        assert_eq!(store.feedback_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_used_set_rejected() {
        let (store, accumulator) = accumulator();
        let err = accumulator
            .record(None, None, vec![Uuid::new_v4()], vec![], 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, EngramError::Validation(_)));
        assert_eq!(store.feedback_count().await.unwrap(), 0, "nothing persisted");
    }

    #[tokio::test]
    async fn test_out_of_range_reward_rejected_not_clamped() {
        let (store, accumulator) = accumulator();
        for reward in [-0.1, 1.1, f32::NAN] {
            let result = accumulator
                .record(None, None, vec![], vec![Uuid::new_v4()], reward)
                .await;
            assert!(matches!(result, Err(EngramError::Validation(_))));
        }
        assert_eq!(store.feedback_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_records_accumulate_in_order() {
        let (store, accumulator) = accumulator();
        let first = accumulator
            .record(None, None, vec![], vec![Uuid::new_v4()], 0.1)
            .await
            .unwrap();
        let second = accumulator
            .record(None, None, vec![], vec![Uuid::new_v4()], 0.9)
            .await
            .unwrap();

        let rows = store.feedback_rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, first.id);
        assert_eq!(rows[1].id, second.id);
    }
}
