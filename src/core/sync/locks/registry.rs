/*!
 * Per-Thread Node Registry
 * Maps each thread that touches a lock to the one node it queues with
 *
 * Entries are reclaimed when their thread exits: registering a node also
 * leaves a weak back-reference in a thread-local list, and that list's
 * destructor removes the thread's idle nodes from every registry still alive.
 */

use super::node::{NodeState, WaitNode};
use ahash::RandomState;
use crossbeam_utils::CachePadded;
use dashmap::DashMap;
use std::cell::RefCell;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tracing::debug;

/// Shared handle to a registered node
///
/// Padded so that neighbouring waiters never spin on the same cache line.
pub(crate) type NodeHandle = Arc<CachePadded<WaitNode>>;

/// Lazily populated thread -> node table for one lock
///
/// A node stays registered until its thread exits or detaches while idle.
/// A thread that exits while queued or holding keeps its node in the table,
/// since the queue may still point at it. `ThreadId`s are never reused, so
/// such an entry can never be picked up by a different thread.
pub(crate) struct NodeRegistry {
    nodes: DashMap<ThreadId, NodeHandle, RandomState>,
}

/// Registries the current thread has a node in
struct ExitHooks {
    thread: ThreadId,
    registries: Vec<Weak<NodeRegistry>>,
}

impl ExitHooks {
    fn watch(&mut self, registry: &Arc<NodeRegistry>) {
        self.registries.retain(|r| r.strong_count() > 0);
        if !self
            .registries
            .iter()
            .any(|r| std::ptr::eq(r.as_ptr(), Arc::as_ptr(registry)))
        {
            self.registries.push(Arc::downgrade(registry));
        }
    }
}

impl Drop for ExitHooks {
    fn drop(&mut self) {
        // Runs during thread teardown: no logging, no `thread::current()`
        for registry in self.registries.drain(..).filter_map(|r| r.upgrade()) {
            registry.remove_if_idle(self.thread);
        }
    }
}

thread_local! {
    static EXIT_HOOKS: RefCell<Option<ExitHooks>> = const { RefCell::new(None) };
}

impl NodeRegistry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            nodes: DashMap::with_hasher(RandomState::new()),
        })
    }

    /// Node of the calling thread, created on first use
    pub(crate) fn current(self: &Arc<Self>) -> NodeHandle {
        let id = thread::current().id();
        if let Some(node) = self.nodes.get(&id) {
            return node.clone();
        }

        let mut created = false;
        let node = self
            .nodes
            .entry(id)
            .or_insert_with(|| {
                created = true;
                Arc::new(CachePadded::new(WaitNode::new()))
            })
            .clone();

        if created {
            self.reclaim_on_exit(id);
            debug!(thread = ?id, registered = self.nodes.len(), "Registered queue node");
        }
        node
    }

    /// Node of the calling thread, if it ever registered one
    pub(crate) fn lookup_current(&self) -> Option<NodeHandle> {
        self.nodes.get(&thread::current().id()).map(|n| n.clone())
    }

    /// Drop the calling thread's node if it is not queued
    pub(crate) fn remove_current_if_idle(&self) -> bool {
        let id = thread::current().id();
        let removed = self.remove_if_idle(id);
        if removed {
            debug!(thread = ?id, "Detached queue node");
        }
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    fn remove_if_idle(&self, id: ThreadId) -> bool {
        self.nodes
            .remove_if(&id, |_, node| node.state() == NodeState::Idle)
            .is_some()
    }

    fn reclaim_on_exit(self: &Arc<Self>, id: ThreadId) {
        // Fails only while this thread's locals are being torn down; the
        // entry then lives as long as the registry.
        let _ = EXIT_HOOKS.try_with(|hooks| {
            hooks
                .borrow_mut()
                .get_or_insert_with(|| ExitHooks {
                    thread: id,
                    registries: Vec::new(),
                })
                .watch(self);
        });
    }
}
