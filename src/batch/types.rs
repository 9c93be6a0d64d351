use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Scheduling tier of an ingestion and of every batch split from it.
///
/// Variants are declared lowest first so the derived `Ord` gives
/// `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            "LOW" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// Lifecycle of a batch. Moves forward one step at a time and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    YetToStart,
    Triggered,
    Completed,
}

impl BatchStatus {
    pub fn can_advance_to(self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (BatchStatus::YetToStart, BatchStatus::Triggered)
                | (BatchStatus::Triggered, BatchStatus::Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::YetToStart => "yet_to_start",
            BatchStatus::Triggered => "triggered",
            BatchStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("batch {batch_id} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub batch_id: Uuid,
    pub from: BatchStatus,
    pub to: BatchStatus,
}

/// A unit of dispatch: up to `batch_size` ids that go through the work unit together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: Uuid,

    /// Ingestion this batch was split from
    pub ingestion_id: Uuid,

    /// Ids in submission order, never empty
    pub ids: Vec<u64>,

    pub priority: Priority,

    /// Submission instant offset by the batch's start index (in milliseconds),
    /// so batches of one ingestion keep their order within a priority tier
    pub created_time: DateTime<Utc>,

    pub status: BatchStatus,
}

impl Batch {
    /// Move to `next`, rejecting anything other than a single forward step.
    pub fn advance(&mut self, next: BatchStatus) -> Result<(), TransitionError> {
        if !self.status.can_advance_to(next) {
            return Err(TransitionError {
                batch_id: self.batch_id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            batch_id: self.batch_id,
            ids: self.ids.clone(),
            status: self.status,
        }
    }
}

/// Ledger-side projection of a batch, the part a status query shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub ids: Vec<u64>,
    pub status: BatchStatus,
}

/// Everything submitted by one `/ingest` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingestion {
    pub ingestion_id: Uuid,
    pub priority: Priority,
    pub created_time: DateTime<Utc>,
    pub batches: Vec<BatchSummary>,
}

impl Ingestion {
    pub fn statuses(&self) -> Vec<BatchStatus> {
        self.batches.iter().map(|b| b.status).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_batch() -> Batch {
        Batch {
            batch_id: Uuid::new_v4(),
            ingestion_id: Uuid::new_v4(),
            ids: vec![1, 2, 3],
            priority: Priority::Medium,
            created_time: Utc::now(),
            status: BatchStatus::YetToStart,
        }
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_priority_serde_uppercase() {
        let json = serde_json::to_string(&Priority::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
        let parsed: Priority = serde_json::from_str("\"HIGH\"").unwrap();
        assert_eq!(parsed, Priority::High);
        assert!(serde_json::from_str::<Priority>("\"high\"").is_err());
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("LOW".parse::<Priority>().unwrap(), Priority::Low);
        assert!("URGENT".parse::<Priority>().is_err());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&BatchStatus::YetToStart).unwrap();
        assert_eq!(json, "\"yet_to_start\"");
        assert_eq!(BatchStatus::Triggered.to_string(), "triggered");
    }

    #[test]
    fn test_forward_transitions() {
        let mut batch = make_batch();
        batch.advance(BatchStatus::Triggered).unwrap();
        assert_eq!(batch.status, BatchStatus::Triggered);
        batch.advance(BatchStatus::Completed).unwrap();
        assert_eq!(batch.status, BatchStatus::Completed);
    }

    #[test]
    fn test_skipping_a_step_is_rejected() {
        let mut batch = make_batch();
        let err = batch.advance(BatchStatus::Completed).unwrap_err();
        assert_eq!(err.from, BatchStatus::YetToStart);
        assert_eq!(err.to, BatchStatus::Completed);
        assert_eq!(batch.status, BatchStatus::YetToStart);
    }

    #[test]
    fn test_backward_transition_is_rejected() {
        let mut batch = make_batch();
        batch.advance(BatchStatus::Triggered).unwrap();
        assert!(batch.advance(BatchStatus::YetToStart).is_err());
        assert!(batch.advance(BatchStatus::Triggered).is_err());
        assert_eq!(batch.status, BatchStatus::Triggered);
    }
}
