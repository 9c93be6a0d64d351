pub mod memory;
pub mod traits;

pub use memory::MemoryLedger;
pub use traits::{Ledger, StorageError};
