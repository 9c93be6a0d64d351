use super::traits::{Ledger, StorageError};
use crate::batch::{BatchStatus, Ingestion};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// Process-lifetime ledger kept in a map. Nothing is ever evicted.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    ingestions: RwLock<HashMap<Uuid, Ingestion>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create_ingestion(&self, ingestion: Ingestion) -> Result<(), StorageError> {
        self.ingestions
            .write()
            .await
            .insert(ingestion.ingestion_id, ingestion);
        Ok(())
    }

    async fn get_ingestion(&self, ingestion_id: Uuid) -> Result<Option<Ingestion>, StorageError> {
        Ok(self.ingestions.read().await.get(&ingestion_id).cloned())
    }

    async fn update_batch_status(
        &self,
        ingestion_id: Uuid,
        batch_id: Uuid,
        status: BatchStatus,
    ) -> Result<bool, StorageError> {
        let mut ingestions = self.ingestions.write().await;

        let Some(ingestion) = ingestions.get_mut(&ingestion_id) else {
            warn!(ingestion_id = %ingestion_id, "Ingestion not found");
            return Ok(false);
        };

        let Some(batch) = ingestion
            .batches
            .iter_mut()
            .find(|b| b.batch_id == batch_id)
        else {
            warn!(ingestion_id = %ingestion_id, batch_id = %batch_id, "Batch not found in ingestion");
            return Ok(false);
        };

        batch.status = status;
        Ok(true)
    }

    async fn list_ingestions(&self) -> Result<Vec<Ingestion>, StorageError> {
        let mut all: Vec<Ingestion> = self.ingestions.read().await.values().cloned().collect();
        all.sort_by_key(|i| i.created_time);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchSummary, Priority};
    use chrono::Utc;

    fn make_ingestion(batch_count: usize) -> Ingestion {
        Ingestion {
            ingestion_id: Uuid::new_v4(),
            priority: Priority::Low,
            created_time: Utc::now(),
            batches: (0..batch_count)
                .map(|n| BatchSummary {
                    batch_id: Uuid::new_v4(),
                    ids: vec![n as u64 + 1],
                    status: BatchStatus::YetToStart,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let ledger = MemoryLedger::new();
        let ingestion = make_ingestion(2);
        let id = ingestion.ingestion_id;

        ledger.create_ingestion(ingestion).await.unwrap();

        let stored = ledger.get_ingestion(id).await.unwrap().unwrap();
        assert_eq!(stored.batches.len(), 2);
        assert!(ledger.get_ingestion(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_overwrites_same_id() {
        let ledger = MemoryLedger::new();
        let first = make_ingestion(1);
        let mut second = make_ingestion(3);
        second.ingestion_id = first.ingestion_id;

        ledger.create_ingestion(first.clone()).await.unwrap();
        ledger.create_ingestion(second).await.unwrap();

        let stored = ledger.get_ingestion(first.ingestion_id).await.unwrap().unwrap();
        assert_eq!(stored.batches.len(), 3);
        assert_eq!(ledger.list_ingestions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_batch_status() {
        let ledger = MemoryLedger::new();
        let ingestion = make_ingestion(2);
        let id = ingestion.ingestion_id;
        let target = ingestion.batches[1].batch_id;
        ledger.create_ingestion(ingestion).await.unwrap();

        let updated = ledger
            .update_batch_status(id, target, BatchStatus::Triggered)
            .await
            .unwrap();
        assert!(updated);

        let stored = ledger.get_ingestion(id).await.unwrap().unwrap();
        assert_eq!(stored.batches[0].status, BatchStatus::YetToStart);
        assert_eq!(stored.batches[1].status, BatchStatus::Triggered);
    }

    #[tokio::test]
    async fn test_update_unknown_ids_is_a_miss() {
        let ledger = MemoryLedger::new();
        let ingestion = make_ingestion(1);
        let id = ingestion.ingestion_id;
        ledger.create_ingestion(ingestion.clone()).await.unwrap();

        let unknown_ingestion = ledger
            .update_batch_status(Uuid::new_v4(), ingestion.batches[0].batch_id, BatchStatus::Triggered)
            .await
            .unwrap();
        assert!(!unknown_ingestion);

        let unknown_batch = ledger
            .update_batch_status(id, Uuid::new_v4(), BatchStatus::Triggered)
            .await
            .unwrap();
        assert!(!unknown_batch);

        let stored = ledger.get_ingestion(id).await.unwrap().unwrap();
        assert_eq!(stored.batches, ingestion.batches);
    }

    #[tokio::test]
    async fn test_list_is_oldest_first() {
        let ledger = MemoryLedger::new();
        let mut newer = make_ingestion(1);
        let mut older = make_ingestion(2);
        newer.created_time = older.created_time + chrono::Duration::seconds(5);
        older.created_time -= chrono::Duration::seconds(5);
        let (newer_id, older_id) = (newer.ingestion_id, older.ingestion_id);

        ledger.create_ingestion(newer).await.unwrap();
        ledger.create_ingestion(older).await.unwrap();

        let ids: Vec<Uuid> = ledger
            .list_ingestions()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.ingestion_id)
            .collect();
        assert_eq!(ids, vec![older_id, newer_id]);
    }
}
