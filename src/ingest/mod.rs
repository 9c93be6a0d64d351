use crate::batch::{
    rollup_status, split_into_batches, Batch, BatchStatus, BatchSummary, Ingestion, Priority,
};
use crate::queue::SharedQueue;
use crate::storage::{Ledger, StorageError};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("ids must be a non-empty array")]
    EmptyIds,

    #[error("ledger error: {0}")]
    Storage(#[from] StorageError),
}

/// Response body of a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionStatus {
    pub ingestion_id: Uuid,
    pub status: BatchStatus,
    pub batches: Vec<BatchSummary>,
}

/// One row of the ingestion listing.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionOverview {
    pub ingestion_id: Uuid,
    pub priority: Priority,
    pub created_time: DateTime<Utc>,
    pub status: BatchStatus,
    pub batch_count: usize,
}

/// Submission and status facade over the shared queue and ledger.
///
/// Built once at startup; the web layer holds it, the dispatcher holds the
/// same queue and ledger handles.
pub struct IngestService {
    queue: SharedQueue,
    ledger: Arc<dyn Ledger>,
    batch_size: usize,
}

impl IngestService {
    pub fn new(queue: SharedQueue, ledger: Arc<dyn Ledger>, batch_size: usize) -> Self {
        Self {
            queue,
            ledger,
            batch_size,
        }
    }

    pub async fn submit(&self, ids: Vec<u64>, priority: Priority) -> Result<Uuid, IngestError> {
        self.submit_at(ids, priority, Utc::now()).await
    }

    /// Split `ids` into batches stamped relative to `submitted_at`, record the
    /// ingestion, then queue its batches.
    pub async fn submit_at(
        &self,
        ids: Vec<u64>,
        priority: Priority,
        submitted_at: DateTime<Utc>,
    ) -> Result<Uuid, IngestError> {
        if ids.is_empty() {
            return Err(IngestError::EmptyIds);
        }

        let ingestion_id = Uuid::new_v4();
        let batches: Vec<Batch> = split_into_batches(&ids, self.batch_size)
            .into_iter()
            .map(|(start, run)| Batch {
                batch_id: Uuid::new_v4(),
                ingestion_id,
                ids: run,
                priority,
                created_time: submitted_at + Duration::milliseconds(start as i64),
                status: BatchStatus::YetToStart,
            })
            .collect();

        // Record first so the dispatcher never sees a batch the ledger lacks
        self.ledger
            .create_ingestion(Ingestion {
                ingestion_id,
                priority,
                created_time: submitted_at,
                batches: batches.iter().map(Batch::summary).collect(),
            })
            .await?;

        let batch_count = batches.len();
        {
            let mut queue = self.queue.lock().await;
            for batch in batches {
                queue.enqueue(batch);
            }
        }

        info!(
            ingestion_id = %ingestion_id,
            priority = %priority,
            ids = ids.len(),
            batches = batch_count,
            "Ingestion accepted"
        );

        Ok(ingestion_id)
    }

    pub async fn status(&self, ingestion_id: Uuid) -> Result<Option<IngestionStatus>, IngestError> {
        let Some(ingestion) = self.ledger.get_ingestion(ingestion_id).await? else {
            return Ok(None);
        };

        Ok(Some(IngestionStatus {
            ingestion_id,
            status: rollup_status(&ingestion.statuses()),
            batches: ingestion.batches,
        }))
    }

    pub async fn list(&self) -> Result<Vec<IngestionOverview>, IngestError> {
        let ingestions = self.ledger.list_ingestions().await?;
        Ok(ingestions
            .into_iter()
            .map(|ingestion| IngestionOverview {
                ingestion_id: ingestion.ingestion_id,
                priority: ingestion.priority,
                created_time: ingestion.created_time,
                status: rollup_status(&ingestion.statuses()),
                batch_count: ingestion.batches.len(),
            })
            .collect())
    }

    /// Pending batches in the order they will be dispatched.
    pub async fn pending(&self) -> Vec<Batch> {
        self.queue.lock().await.snapshot()
    }

    pub async fn queue_depth(&self) -> usize {
        self.queue.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::PriorityQueue;
    use crate::storage::MemoryLedger;

    fn service() -> (IngestService, SharedQueue) {
        let queue = PriorityQueue::shared();
        let service = IngestService::new(Arc::clone(&queue), Arc::new(MemoryLedger::new()), 3);
        (service, queue)
    }

    #[tokio::test]
    async fn test_submit_five_low_ids() {
        let (service, queue) = service();
        let id = service.submit(vec![1, 2, 3, 4, 5], Priority::Low).await.unwrap();

        let status = service.status(id).await.unwrap().unwrap();
        assert_eq!(status.status, BatchStatus::YetToStart);
        assert_eq!(status.batches.len(), 2);
        assert_eq!(status.batches[0].ids, vec![1, 2, 3]);
        assert_eq!(status.batches[1].ids, vec![4, 5]);
        assert!(status
            .batches
            .iter()
            .all(|b| b.status == BatchStatus::YetToStart));

        assert_eq!(queue.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_created_time_offsets_by_start_index() {
        let (service, queue) = service();
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        service
            .submit_at(vec![1, 2, 3, 4, 5, 6, 7], Priority::Medium, t0)
            .await
            .unwrap();

        let pending = queue.lock().await.snapshot();
        let offsets: Vec<i64> = pending
            .iter()
            .map(|b| (b.created_time - t0).num_milliseconds())
            .collect();
        assert_eq!(offsets, vec![0, 3, 6]);
        assert!(pending.iter().all(|b| b.priority == Priority::Medium));
    }

    #[tokio::test]
    async fn test_empty_submission_is_rejected() {
        let (service, queue) = service();
        assert!(matches!(
            service.submit(vec![], Priority::High).await,
            Err(IngestError::EmptyIds)
        ));
        assert!(queue.lock().await.is_empty());
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_high_after_low_dequeues_first() {
        let (service, queue) = service();
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let low = service.submit_at(vec![1], Priority::Low, t0).await.unwrap();
        let high = service
            .submit_at(vec![2], Priority::High, t0 + Duration::seconds(1))
            .await
            .unwrap();

        let mut queue = queue.lock().await;
        assert_eq!(queue.dequeue().unwrap().ingestion_id, high);
        assert_eq!(queue.dequeue().unwrap().ingestion_id, low);
    }

    #[tokio::test]
    async fn test_same_priority_dequeues_in_submission_order() {
        let (service, queue) = service();
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let first = service
            .submit_at(vec![1, 2, 3, 4], Priority::Medium, t0)
            .await
            .unwrap();
        let second = service
            .submit_at(vec![5, 6], Priority::Medium, t0 + Duration::milliseconds(50))
            .await
            .unwrap();

        let mut queue = queue.lock().await;
        let order: Vec<Uuid> = std::iter::from_fn(|| queue.dequeue())
            .map(|b| b.ingestion_id)
            .collect();
        assert_eq!(order, vec![first, first, second]);
    }

    #[tokio::test]
    async fn test_status_is_stable_without_dispatch() {
        let (service, _queue) = service();
        let id = service.submit(vec![10, 20, 30, 40], Priority::High).await.unwrap();

        let a = service.status(id).await.unwrap();
        let b = service.status(id).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_unknown_status_is_none() {
        let (service, _queue) = service();
        assert!(service.status(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_reports_rollup() {
        let (service, _queue) = service();
        service.submit(vec![1, 2, 3, 4], Priority::Low).await.unwrap();

        let overview = service.list().await.unwrap();
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].batch_count, 2);
        assert_eq!(overview[0].status, BatchStatus::YetToStart);
    }
}
