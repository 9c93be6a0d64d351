pub mod runner;
pub mod work_unit;

pub use runner::{
    DispatchError, Dispatcher, DispatcherSettings, DispatcherStats, SharedStats, TickOutcome,
};
pub use work_unit::{MockWorkUnit, WorkError, WorkOutput, WorkUnit};
