//! Subscription graph manager.
//!
//! A [`ChangeTracker`] walks a settings graph through each node's declared
//! manifest of nested observables and keeps exactly one subscription per
//! unique observable for as long as the node stays tracked.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::observable::{Observable, ObservableId, Subscription};

/// A node in a settings graph.
///
/// Implementors expose their own observable and list every field that is
/// itself a nested observable. Leaves keep the default empty manifest.
pub trait Trackable {
    fn observable(&self) -> &Observable;

    fn visit_nested(&self, _visit: &mut dyn FnMut(&dyn Trackable)) {}
}

impl<T: Trackable + ?Sized> Trackable for Arc<T> {
    fn observable(&self) -> &Observable {
        (**self).observable()
    }

    fn visit_nested(&self, visit: &mut dyn FnMut(&dyn Trackable)) {
        (**self).visit_nested(visit)
    }
}

struct Tracked {
    // Holding a clone pins the allocation, so the id cannot be reused while
    // the entry exists.
    _observable: Observable,
    subscription: Subscription,
}

/// Keeps one change subscription per reachable observable.
pub struct ChangeTracker {
    on_change: Arc<dyn Fn() + Send + Sync>,
    tracked: HashMap<ObservableId, Tracked>,
}

impl ChangeTracker {
    /// Every tracked observable will invoke `on_change` when it emits.
    pub fn new(on_change: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            on_change: Arc::new(on_change),
            tracked: HashMap::new(),
        }
    }

    /// Subscribe to `node` and, transitively, to everything it nests.
    ///
    /// Already tracked nodes are skipped, which also stops re-entry through
    /// a cycle.
    pub fn track(&mut self, node: &dyn Trackable) {
        let observable = node.observable();
        let id = observable.id();
        if self.tracked.contains_key(&id) {
            return;
        }

        let on_change = Arc::clone(&self.on_change);
        let subscription = observable.subscribe(move || on_change());
        self.tracked.insert(
            id,
            Tracked {
                _observable: observable.clone(),
                subscription,
            },
        );
        trace!(?id, "tracking observable");

        node.visit_nested(&mut |nested| self.track(nested));
    }

    /// Revoke the subscription for `node` and everything it nests.
    ///
    /// Nested nodes are untracked even if they are reachable from elsewhere.
    pub fn untrack(&mut self, node: &dyn Trackable) {
        let id = node.observable().id();
        let Some(entry) = self.tracked.remove(&id) else {
            return;
        };
        entry.subscription.revoke();
        trace!(?id, "untracked observable");

        node.visit_nested(&mut |nested| self.untrack(nested));
    }

    pub fn is_tracked(&self, node: &dyn Trackable) -> bool {
        self.tracked.contains_key(&node.observable().id())
    }

    /// Number of observables with an active subscription.
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}

impl Drop for ChangeTracker {
    fn drop(&mut self) {
        for (_, entry) in self.tracked.drain() {
            entry.subscription.revoke();
        }
    }
}
