/*!
 * Queue Wait Node
 *
 * One node per waiting thread. The owner spins on `locked`; the predecessor
 * writes `next` into it once, and later clears the successor's `locked` to
 * hand the lock over.
 */

use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU8, Ordering};

/// Lifecycle of a node with respect to one lock
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Not in any queue; may be enqueued
    Idle = 0,
    /// Enqueued, spinning for the handoff
    Waiting = 1,
    /// Owner holds the lock
    Holding = 2,
    /// Owner is inside `with_node` on a caller-owned node; this registry
    /// node stays unlinked but blocks any second entry
    Delegated = 3,
}

impl NodeState {
    #[inline(always)]
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => NodeState::Waiting,
            2 => NodeState::Holding,
            3 => NodeState::Delegated,
            _ => NodeState::Idle,
        }
    }
}

/// Per-thread queue entry
///
/// Registry nodes are created by the lock; callers using
/// [`McsLock::with_node`](super::McsLock::with_node) bring their own.
///
/// # Sharing
///
/// `locked` and `next` are written by other threads during a handoff and are
/// only ever accessed atomically. `state` is written by the owning thread
/// alone and is used to reject misuse before the queue is touched.
pub struct WaitNode {
    pub(crate) locked: AtomicBool,
    pub(crate) next: AtomicPtr<WaitNode>,
    state: AtomicU8,
}

impl WaitNode {
    /// Create an idle, unlinked node
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            next: AtomicPtr::new(ptr::null_mut()),
            state: AtomicU8::new(NodeState::Idle as u8),
        }
    }

    /// Current lifecycle state
    #[inline]
    pub fn state(&self) -> NodeState {
        NodeState::from_u8(self.state.load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn set_state(&self, state: NodeState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    /// Whether a successor is linked behind this node
    #[inline]
    pub fn has_successor(&self) -> bool {
        !self.next.load(Ordering::Acquire).is_null()
    }

    /// Raw pointer used as the node's identity in the tail
    #[inline(always)]
    pub(crate) fn as_ptr(&self) -> *mut WaitNode {
        self as *const WaitNode as *mut WaitNode
    }
}

impl Default for WaitNode {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WaitNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitNode")
            .field("state", &self.state())
            .field("locked", &self.locked.load(Ordering::Relaxed))
            .field("has_successor", &self.has_successor())
            .finish()
    }
}
