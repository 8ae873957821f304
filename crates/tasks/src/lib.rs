pub mod cycle;
pub mod gate;
#[cfg(test)]
mod snapshot;
pub mod source;

pub use gate::{
    BlockReason, ColumnLock, GateDecision, GateError, GateSource, GateTask, LockState, TaskGate,
    TaskRef, column_for_task,
};
pub use source::DbGateSource;
