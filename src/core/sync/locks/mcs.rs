/*!
 * MCS Queue Lock
 *
 * Mutual exclusion built as a distributed FIFO queue instead of one
 * contended word.
 *
 * # Protocol
 *
 * The lock itself is a single `tail` pointer to the node of the thread that
 * joined last (null when nobody holds or waits).
 *
 * **Join** (acquire):
 * 1. Reset own `next`, then swap own node into `tail`
 * 2. Null predecessor: the queue was empty, we hold the lock
 * 3. Otherwise set own `locked`, publish ourselves in `predecessor.next`,
 *    and spin on own `locked` until the predecessor clears it
 *
 * **Leave** (release):
 * 1. No successor linked yet: CAS `tail` from own node to null. Success means
 *    the queue is empty again. Failure means a thread already swapped itself
 *    into `tail` but has not linked yet; spin until `next` shows up
 * 2. Clear `successor.locked` (the handoff), then clear own `next`
 *
 * Admission order is the order of the `tail` swaps. Each waiter polls only
 * its own node, so a handoff touches exactly one remote cache line.
 *
 * # Memory Ordering
 *
 * - `tail` swap/CAS are `AcqRel`/`Release`: a node's reset is visible to
 *   whoever links behind it, and an uncontended release publishes the
 *   critical section to the next swapper
 * - `next` is published with `Release` after `locked = true`, and read with
 *   `Acquire`, so a predecessor never wakes a successor that isn't armed
 * - `locked = false` is `Release`, paired with the waiter's `Acquire` poll
 */

use super::node::{NodeState, WaitNode};
use super::registry::{NodeHandle, NodeRegistry};
use super::stats::{LockStats, LockStatsSnapshot};
use crate::core::errors::{LockError, LockResult};
use crate::core::sync::config::SpinConfig;
use crate::core::sync::spinwait::Backoff;
use crate::core::sync::traits::RawLock;
use crossbeam_utils::CachePadded;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, warn};

/// Queue-based spin lock
///
/// Each participating thread gets its own wait node from an internal
/// registry on first use, reclaimed when the thread exits. Callers that
/// prefer to manage nodes themselves use [`with_node`](Self::with_node)
/// instead.
///
/// # Misuse
///
/// Acquiring twice on one thread fails with
/// [`LockError::ReentrancyViolation`], through any mix of `acquire`,
/// `try_acquire`, `lock` and `with_node`. Releasing without holding fails
/// with [`LockError::ProtocolViolation`]. Both are detected on the caller's
/// registry node before the shared queue is touched.
///
/// # Example
///
/// ```
/// use mcs_queue_lock::McsLock;
///
/// let lock = McsLock::new();
/// lock.acquire()?;
/// // critical section
/// lock.release()?;
/// assert!(!lock.is_locked());
/// # Ok::<(), mcs_queue_lock::LockError>(())
/// ```
pub struct McsLock {
    tail: CachePadded<AtomicPtr<WaitNode>>,
    registry: Arc<NodeRegistry>,
    stats: LockStats,
    config: SpinConfig,
}

impl McsLock {
    /// Create an unlocked lock with the default spin policy
    pub fn new() -> Self {
        Self::with_config(SpinConfig::default())
    }

    /// Create an unlocked lock with a custom spin policy
    pub fn with_config(config: SpinConfig) -> Self {
        Self {
            tail: CachePadded::new(AtomicPtr::new(ptr::null_mut())),
            registry: NodeRegistry::new(),
            stats: LockStats::default(),
            config,
        }
    }

    /// Spin until the calling thread holds the lock
    pub fn acquire(&self) -> LockResult<()> {
        let node = self.registry.current();
        if node.state() != NodeState::Idle {
            warn!(state = ?node.state(), "Reentrant acquire rejected");
            return Err(LockError::ReentrancyViolation);
        }

        node.set_state(NodeState::Waiting);
        // SAFETY: the registry keeps the node alive at a fixed address until
        // it is removed, which only happens while it is Idle. Idle also means
        // it is not linked into any queue.
        unsafe { self.join(&node) };
        node.set_state(NodeState::Holding);
        Ok(())
    }

    /// Hand the lock to the next waiter, or mark the queue empty
    pub fn release(&self) -> LockResult<()> {
        let node = self.registry.lookup_current().ok_or_else(|| {
            warn!("Release from a thread that never acquired");
            LockError::ProtocolViolation("calling thread never acquired this lock".into())
        })?;

        if node.state() != NodeState::Holding {
            warn!(state = ?node.state(), "Release without holding rejected");
            return Err(LockError::ProtocolViolation(format!(
                "calling thread does not hold this lock (node is {:?})",
                node.state()
            )));
        }

        // SAFETY: Holding means this node is the head of our queue.
        unsafe { self.leave(&node) };
        node.set_state(NodeState::Idle);
        Ok(())
    }

    /// Take the lock only if nobody holds or waits for it
    ///
    /// Never joins the queue, so a failed attempt leaves no trace.
    pub fn try_acquire(&self) -> LockResult<bool> {
        let node = self.registry.current();
        if node.state() != NodeState::Idle {
            warn!(state = ?node.state(), "Reentrant try_acquire rejected");
            return Err(LockError::ReentrancyViolation);
        }

        // SAFETY: see `acquire`.
        if unsafe { self.try_join(&node) } {
            node.set_state(NodeState::Holding);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Retry [`try_acquire`](Self::try_acquire) until `timeout` elapses
    ///
    /// The caller never enqueues, so giving up needs no cooperation from
    /// other threads. Timed callers get no FIFO guarantee relative to
    /// queued ones.
    pub fn try_acquire_for(&self, timeout: Duration) -> LockResult<()> {
        let start = Instant::now();
        let mut backoff = Backoff::new(self.config);

        loop {
            if self.try_acquire()? {
                return Ok(());
            }
            let waited = start.elapsed();
            if waited >= timeout {
                return Err(LockError::timeout(waited));
            }
            backoff.snooze();
        }
    }

    /// Acquire and return a guard that releases on drop
    pub fn lock(&self) -> LockResult<McsGuard<'_>> {
        self.acquire()?;
        Ok(McsGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Run `f` under the lock, queueing on a caller-owned node
    ///
    /// The caller's node is what gets linked into the queue. The thread's
    /// registry node is only marked [`NodeState::Delegated`] for the duration,
    /// so that a nested `acquire` or `with_node` on the same thread fails with
    /// [`LockError::ReentrancyViolation`] instead of queueing behind itself.
    ///
    /// The exclusive borrow keeps the node in place for as long as it is
    /// linked, and the lock is released even if `f` unwinds.
    pub fn with_node<R>(&self, node: &mut WaitNode, f: impl FnOnce() -> R) -> LockResult<R> {
        struct Leave<'a> {
            lock: &'a McsLock,
            node: &'a WaitNode,
            owner: NodeHandle,
        }

        impl Drop for Leave<'_> {
            fn drop(&mut self) {
                // SAFETY: constructed only after `join` returned for this node.
                unsafe { self.lock.leave(self.node) };
                self.node.set_state(NodeState::Idle);
                self.owner.set_state(NodeState::Idle);
            }
        }

        let owner = self.registry.current();
        if owner.state() != NodeState::Idle {
            warn!(state = ?owner.state(), "Reentrant with_node rejected");
            return Err(LockError::ReentrancyViolation);
        }

        let node: &WaitNode = node;
        owner.set_state(NodeState::Delegated);
        node.set_state(NodeState::Waiting);
        // SAFETY: the `&mut` borrow guarantees the node is in no other queue
        // and cannot move until `Leave` has unlinked it.
        unsafe { self.join(node) };
        node.set_state(NodeState::Holding);

        let _leave = Leave {
            lock: self,
            node,
            owner,
        };
        Ok(f())
    }

    /// Whether some thread holds or waits for the lock (advisory)
    #[inline]
    pub fn is_locked(&self) -> bool {
        !self.tail.load(Ordering::Relaxed).is_null()
    }

    /// Usage counters
    pub fn stats(&self) -> LockStatsSnapshot {
        self.stats.snapshot()
    }

    /// Live threads currently owning a registry node
    ///
    /// Exited threads drop out once their thread-local destructors have run,
    /// which `JoinHandle::join` waits for.
    pub fn registered_threads(&self) -> usize {
        self.registry.len()
    }

    /// Forget the calling thread's node
    ///
    /// Returns `false` if the thread has no node or is using the lock.
    /// Exiting threads are detached automatically; this frees the node of a
    /// long-lived thread that is done with the lock early.
    pub fn detach_current_thread(&self) -> bool {
        self.registry.remove_current_if_idle()
    }

    /// Spin policy in use
    pub fn config(&self) -> SpinConfig {
        self.config
    }

    /// Enqueue `node` and spin until it is at the head.
    ///
    /// # Safety
    ///
    /// `node` must not be linked into any queue, and must stay alive at the
    /// same address until the matching `leave` returns.
    unsafe fn join(&self, node: &WaitNode) {
        let me = node.as_ptr();
        node.next.store(ptr::null_mut(), Ordering::Relaxed);

        let predecessor = self.tail.swap(me, Ordering::AcqRel);
        if !predecessor.is_null() {
            self.stats.record_contended();
            #[cfg(test)]
            tests::before_link(self);

            node.locked.store(true, Ordering::Relaxed);
            // SAFETY: the predecessor cannot finish `leave` until it sees this
            // link (its tail CAS fails now that `tail` is us), so it is alive.
            unsafe { (*predecessor).next.store(me, Ordering::Release) };

            let mut backoff = Backoff::new(self.config);
            backoff.wait_until(|| !node.locked.load(Ordering::Acquire));
        }

        self.stats.record_acquired();
    }

    /// Enqueue `node` only if the queue is empty.
    ///
    /// # Safety
    ///
    /// Same as `join`; on success the node must later be passed to `leave`.
    unsafe fn try_join(&self, node: &WaitNode) -> bool {
        if self.is_locked() {
            self.stats.record_try_failure();
            return false;
        }

        node.next.store(ptr::null_mut(), Ordering::Relaxed);
        let joined = self
            .tail
            .compare_exchange(
                ptr::null_mut(),
                node.as_ptr(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok();

        if joined {
            self.stats.record_acquired();
        } else {
            self.stats.record_try_failure();
        }
        joined
    }

    /// Pass the lock on from `node`.
    ///
    /// # Safety
    ///
    /// `node` must be the head of this lock's queue, i.e. `join` or a
    /// successful `try_join` returned for it and `leave` has not.
    unsafe fn leave(&self, node: &WaitNode) {
        let me = node.as_ptr();
        let mut successor = node.next.load(Ordering::Acquire);

        if successor.is_null() {
            if self
                .tail
                .compare_exchange(me, ptr::null_mut(), Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }

            // Someone swapped into the tail behind us and is about to link.
            self.stats.record_successor_wait();
            let mut backoff = Backoff::new(self.config);
            loop {
                successor = node.next.load(Ordering::Acquire);
                if !successor.is_null() {
                    break;
                }
                backoff.snooze();
            }
        }

        self.stats.record_handoff();
        // SAFETY: the successor spins on its own node until this store, so
        // it is alive; we do not touch it afterwards.
        unsafe { (*successor).locked.store(false, Ordering::Release) };
        node.next.store(ptr::null_mut(), Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn current_node(&self) -> Option<NodeHandle> {
        self.registry.lookup_current()
    }
}

impl Default for McsLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for McsLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McsLock")
            .field("locked", &self.is_locked())
            .field("registered_threads", &self.registered_threads())
            .field("config", &self.config)
            .finish()
    }
}

impl RawLock for McsLock {
    #[inline]
    fn acquire(&self) -> LockResult<()> {
        McsLock::acquire(self)
    }

    #[inline]
    fn release(&self) -> LockResult<()> {
        McsLock::release(self)
    }

    fn name(&self) -> &'static str {
        "mcs"
    }
}

/// RAII hold on an [`McsLock`]
///
/// Not `Send`: the release must run on the thread that acquired.
#[must_use = "dropping the guard releases the lock immediately"]
pub struct McsGuard<'a> {
    lock: &'a McsLock,
    _not_send: PhantomData<*const ()>,
}

impl McsGuard<'_> {
    /// Release now, reporting protocol errors instead of logging them
    pub fn unlock(self) -> LockResult<()> {
        let lock = self.lock;
        std::mem::forget(self);
        lock.release()
    }
}

impl Drop for McsGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release() {
            error!(error = %e, "Guard release failed");
        }
    }
}

impl fmt::Debug for McsGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McsGuard").finish_non_exhaustive()
    }
}
