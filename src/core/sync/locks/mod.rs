/*!
 * Lock-Based Synchronization Primitives
 *
 * Queue locks where every waiter spins on its own node:
 * - MCS queue lock (raw acquire/release, RAII guard, caller-owned nodes)
 * - Queue mutex (data-owning wrapper)
 */

mod mcs;
mod mutex;
mod node;
mod registry;
mod stats;

// Re-export public API
pub use mcs::{McsGuard, McsLock};
pub use mutex::{QueueMutex, QueueMutexGuard};
pub use node::{NodeState, WaitNode};
pub use stats::{LockStats, LockStatsSnapshot};
