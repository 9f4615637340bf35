/*!
 * Synchronization Primitives
 *
 * Spin-based mutual exclusion for shared-memory machines:
 * - MCS queue lock with per-thread wait nodes
 * - Configurable spin/yield back-off for waiters
 * - `RawLock` seam for generic drivers
 *
 * # Architecture
 *
 * Waiters form an explicit FIFO linked through their nodes. The only shared
 * word is the queue tail; each waiter polls a flag in its own node, so a
 * release touches one remote cache line instead of broadcasting to all
 * spinners.
 *
 * # Use Cases
 *
 * - **Heavily contended short sections** where a test-and-set lock would
 *   saturate the interconnect
 * - **NUMA and cache-less machines** where remote polling is expensive
 */

mod config;
pub mod locks;
mod spinwait;
mod traits;

pub use config::{SpinConfig, SpinStrategy};
pub use locks::{
    LockStats, LockStatsSnapshot, McsGuard, McsLock, NodeState, QueueMutex, QueueMutexGuard,
    WaitNode,
};
pub use spinwait::Backoff;
pub use traits::{RawLock, Unguarded};
