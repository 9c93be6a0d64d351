pub mod priority;

pub use priority::{PriorityQueue, SharedQueue};
