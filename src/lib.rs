/*!
 * MCS Queue Lock
 * FIFO spin lock where every waiter spins on its own queue node
 */

pub mod core;
pub mod harness;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{LockError, LockResult};
pub use crate::core::sync::{
    Backoff, LockStatsSnapshot, McsGuard, McsLock, NodeState, QueueMutex, QueueMutexGuard,
    RawLock, SpinConfig, SpinStrategy, Unguarded, WaitNode,
};
pub use harness::{ConformanceDriver, ConformanceReport, DemoConfig};
pub use monitoring::init_tracing;
