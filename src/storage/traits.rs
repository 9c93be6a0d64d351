use crate::batch::{BatchStatus, Ingestion};
use async_trait::async_trait;
use uuid::Uuid;

/// Record keeper for ingestions and the status of each of their batches.
///
/// Read by status queries, written by the submission path (new records) and
/// the dispatcher (status updates).
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Store a record, replacing any existing record with the same id.
    async fn create_ingestion(&self, ingestion: Ingestion) -> Result<(), StorageError>;

    async fn get_ingestion(&self, ingestion_id: Uuid) -> Result<Option<Ingestion>, StorageError>;

    /// Overwrite one batch's status. Returns `Ok(false)` and changes nothing
    /// when either id is unknown.
    async fn update_batch_status(
        &self,
        ingestion_id: Uuid,
        batch_id: Uuid,
        status: BatchStatus,
    ) -> Result<bool, StorageError>;

    /// All records, oldest submission first.
    async fn list_ingestions(&self) -> Result<Vec<Ingestion>, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("ledger error: {0}")]
    Generic(String),
}
