/*!
 * Lock Statistics
 *
 * Relaxed counters describing how a queue lock has been used.
 *
 * Apart from `contended` and `try_failures`, every counter is bumped by the
 * current holder only, so the updates are serialized by the lock itself and
 * add no traffic beyond what the critical section already moves.
 */

use crossbeam_utils::CachePadded;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a lock
#[derive(Debug, Default)]
pub struct LockStats {
    /// Holder-side counters
    held: CachePadded<HeldCounters>,
    /// Bumped by arriving waiters
    contended: CachePadded<AtomicU64>,
    /// Bumped by failed non-blocking attempts
    try_failures: CachePadded<AtomicU64>,
}

#[derive(Debug, Default)]
struct HeldCounters {
    acquisitions: AtomicU64,
    handoffs: AtomicU64,
    successor_waits: AtomicU64,
}

/// Point-in-time copy of [`LockStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatsSnapshot {
    /// Successful acquisitions, blocking or not
    pub acquisitions: u64,
    /// Acquisitions that found a predecessor and had to wait
    pub contended: u64,
    /// Releases that passed the lock directly to a successor
    pub handoffs: u64,
    /// Releases that lost the tail race and waited for a successor to link
    pub successor_waits: u64,
    /// Non-blocking attempts that found the lock taken
    pub try_failures: u64,
}

impl LockStatsSnapshot {
    /// Acquisitions that entered an empty queue
    #[inline]
    pub fn uncontended(&self) -> u64 {
        self.acquisitions.saturating_sub(self.contended)
    }
}

impl LockStats {
    #[inline]
    pub(crate) fn record_acquired(&self) {
        self.held.acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_contended(&self) {
        self.contended.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_handoff(&self) {
        self.held.handoffs.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_successor_wait(&self) {
        self.held.successor_waits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_try_failure(&self) {
        self.try_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> LockStatsSnapshot {
        LockStatsSnapshot {
            acquisitions: self.held.acquisitions.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
            handoffs: self.held.handoffs.load(Ordering::Relaxed),
            successor_waits: self.held.successor_waits.load(Ordering::Relaxed),
            try_failures: self.try_failures.load(Ordering::Relaxed),
        }
    }
}
