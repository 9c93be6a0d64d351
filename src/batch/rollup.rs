use super::types::BatchStatus;

/// Ingestion-level status derived from its batches.
///
/// `yet_to_start` when every batch is yet to start, `completed` when every
/// batch is completed, `triggered` for anything in between (including a mix of
/// completed and not-yet-started batches with nothing actually in flight).
pub fn rollup_status(statuses: &[BatchStatus]) -> BatchStatus {
    if statuses.iter().all(|s| *s == BatchStatus::YetToStart) {
        BatchStatus::YetToStart
    } else if statuses.iter().all(|s| *s == BatchStatus::Completed) {
        BatchStatus::Completed
    } else {
        BatchStatus::Triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BatchStatus::*;

    #[test]
    fn test_all_yet_to_start() {
        assert_eq!(rollup_status(&[YetToStart, YetToStart]), YetToStart);
    }

    #[test]
    fn test_all_completed() {
        assert_eq!(rollup_status(&[Completed, Completed, Completed]), Completed);
    }

    #[test]
    fn test_one_in_flight() {
        assert_eq!(rollup_status(&[Triggered, YetToStart]), Triggered);
        assert_eq!(rollup_status(&[Completed, Triggered]), Triggered);
    }

    #[test]
    fn test_completed_and_not_started_reports_triggered() {
        assert_eq!(rollup_status(&[Completed, YetToStart]), Triggered);
    }

    #[test]
    fn test_single_batch_passes_through() {
        for status in [YetToStart, Triggered, Completed] {
            assert_eq!(rollup_status(&[status]), status);
        }
    }

    #[test]
    fn test_empty_is_yet_to_start() {
        assert_eq!(rollup_status(&[]), YetToStart);
    }
}
