//! Change notification primitive.
//!
//! An [`Observable`] keeps an ordered list of listener registrations and
//! invokes them synchronously on [`Observable::notify`]. Each call to
//! [`Observable::subscribe`] creates an independent registration; the returned
//! [`Subscription`] revokes exactly that one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Identity of an observable. Clones of the same [`Observable`] share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservableId(usize);

struct Registry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl Registry {
    fn listeners(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Listener)>> {
        // A panicking listener never runs while the lock is held.
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A unit of change notification.
#[derive(Clone)]
pub struct Observable {
    registry: Arc<Registry>,
}

impl Observable {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(0),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> ObservableId {
        ObservableId(Arc::as_ptr(&self.registry) as *const () as usize)
    }

    /// Register `on_change`. It runs on every [`notify`](Self::notify) until
    /// the returned subscription is revoked.
    pub fn subscribe(&self, on_change: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.listeners().push((id, Arc::new(on_change)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Invoke every listener registered at the time of the call.
    pub fn notify(&self) {
        let snapshot: Vec<Listener> = self
            .registry
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.listeners().len()
    }
}

impl Default for Observable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.id())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Capability to revoke one listener registration.
///
/// Dropping a subscription does not revoke it.
#[must_use = "a subscription stays active until revoked"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Remove this registration. Other registrations on the same observable,
    /// including ones for the same callback, are unaffected.
    pub fn revoke(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.listeners().retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
