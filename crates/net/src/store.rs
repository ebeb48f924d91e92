//! Shared-state mutation and subscription capabilities.
//!
//! The transport that replicates state between peers lives elsewhere; the
//! engine only needs to write the tree atomically and hear about every change.
//! [`MemoryStateStore`] is the in-process implementation used for loopback
//! play and tests.

use entsync_core::StateTree;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

type Queue = RefCell<VecDeque<Rc<StateTree>>>;

/// Writable, observable shared state.
pub trait StateStore {
    /// Apply `f` atomically, then notify every subscriber.
    fn mutate(&self, f: &mut dyn FnMut(&mut StateTree));

    /// Copy of the current state.
    fn current(&self) -> StateTree;

    /// Start receiving the full state after each change.
    fn subscribe(&self) -> StateSubscription;
}

/// Receiving end of a store subscription.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct StateSubscription {
    queue: Rc<Queue>,
}

impl StateSubscription {
    /// Create a subscription and the handle a store pushes into.
    pub fn channel() -> (Self, SubscriberHandle) {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        let handle = SubscriberHandle {
            queue: Rc::downgrade(&queue),
        };
        (Self { queue }, handle)
    }

    /// Next undelivered state, oldest first.
    pub fn try_next(&self) -> Option<Rc<StateTree>> {
        self.queue.borrow_mut().pop_front()
    }

    /// Take every undelivered state, oldest first.
    pub fn drain(&self) -> Vec<Rc<StateTree>> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Number of undelivered states.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

/// Store-side handle to one subscription.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    queue: Weak<Queue>,
}

impl SubscriberHandle {
    /// Deliver a state. Returns false once the subscription was dropped.
    pub fn deliver(&self, state: Rc<StateTree>) -> bool {
        match self.queue.upgrade() {
            Some(queue) => {
                queue.borrow_mut().push_back(state);
                true
            }
            None => false,
        }
    }
}

#[derive(Default)]
struct StoreInner {
    tree: StateTree,
    subscribers: Vec<SubscriberHandle>,
    revision: u64,
}

/// In-process store with immediate delivery. Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutations applied so far.
    pub fn revision(&self) -> u64 {
        self.inner.borrow().revision
    }

    /// Replace the whole tree, as when a remote full-state update arrives.
    pub fn replace(&self, tree: StateTree) {
        self.mutate(&mut |state| *state = tree.clone());
    }
}

impl StateStore for MemoryStateStore {
    fn mutate(&self, f: &mut dyn FnMut(&mut StateTree)) {
        let mut inner = self.inner.borrow_mut();
        f(&mut inner.tree);
        inner.revision += 1;
        let snapshot = Rc::new(inner.tree.clone());
        inner
            .subscribers
            .retain(|subscriber| subscriber.deliver(Rc::clone(&snapshot)));
    }

    fn current(&self) -> StateTree {
        self.inner.borrow().tree.clone()
    }

    fn subscribe(&self) -> StateSubscription {
        let (subscription, handle) = StateSubscription::channel();
        self.inner.borrow_mut().subscribers.push(handle);
        subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_subscriber_sees_every_change() {
        let store = MemoryStateStore::new();
        let a = store.subscribe();
        let b = store.subscribe();

        store.mutate(&mut |tree| {
            tree.collection_mut("entities")
                .unwrap()
                .insert("p1".into(), json!({"x": 1}));
        });
        store.mutate(&mut |tree| {
            tree.remove_record("entities", "p1");
        });

        assert_eq!(a.pending(), 2);
        let states = b.drain();
        assert!(states[0].record("entities", "p1").is_some());
        assert!(states[1].record("entities", "p1").is_none());
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let store = MemoryStateStore::new();
        let kept = store.subscribe();
        drop(store.subscribe());

        store.mutate(&mut |_| {});
        assert_eq!(store.inner.borrow().subscribers.len(), 1);
        assert!(kept.try_next().is_some());
        assert!(kept.try_next().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let store = MemoryStateStore::new();
        let other = store.clone();
        let tree = StateTree::from_value(json!({"score": 4})).unwrap();
        other.replace(tree.clone());

        assert_eq!(store.current(), tree);
    }
}
