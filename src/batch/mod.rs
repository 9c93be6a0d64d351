pub mod rollup;
pub mod splitter;
pub mod types;

pub use rollup::rollup_status;
pub use splitter::{split_into_batches, DEFAULT_BATCH_SIZE};
pub use types::{Batch, BatchStatus, BatchSummary, Ingestion, Priority, TransitionError};
