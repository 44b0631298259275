//! Observable value cell.

use std::fmt;
use std::sync::Mutex;

use crate::observable::Observable;
use crate::tracker::Trackable;

/// A single settings value that notifies its observers when it changes.
pub struct Property<T> {
    observable: Observable,
    value: Mutex<T>,
}

impl<T: Clone + PartialEq> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            observable: Observable::new(),
            value: Mutex::new(value),
        }
    }

    pub fn get(&self) -> T {
        self.lock().clone()
    }

    /// Store `value`; observers are notified only if it differs from the
    /// current one.
    pub fn set(&self, value: T) {
        let changed = {
            let mut current = self.lock();
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        };
        if changed {
            self.observable.notify();
        }
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.lock());
        self.set(next);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, T> {
        self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Trackable for Property<T> {
    fn observable(&self) -> &Observable {
        &self.observable
    }
}

impl<T: Clone + PartialEq + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property").field(&self.get()).finish()
    }
}
