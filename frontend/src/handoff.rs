//! Read-once slots for passing rich values between page transitions.

use std::sync::Arc;

use parking_lot::Mutex;
use shared::{RouteHistoryEntry, RouteResult};

/// Holds at most one pending value.
///
/// `consume` takes the value and empties the slot under one lock, so of two
/// racing consumers exactly one sees the value.
#[derive(Debug)]
pub struct HandoffSlot<T> {
    value: Mutex<Option<T>>,
}

impl<T> Default for HandoffSlot<T> {
    fn default() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }
}

impl<T> HandoffSlot<T> {
    /// Stores `value`, returning whatever was pending before.
    pub fn set(&self, value: T) -> Option<T> {
        self.value.lock().replace(value)
    }

    pub fn consume(&self) -> Option<T> {
        self.value.lock().take()
    }

    pub fn clear(&self) {
        self.value.lock().take();
    }

    pub fn is_pending(&self) -> bool {
        self.value.lock().is_some()
    }
}

impl<T: Clone> HandoffSlot<T> {
    pub fn peek(&self) -> Option<T> {
        self.value.lock().clone()
    }
}

/// The handoff slots one app session shares. Pass it around in an `Arc`.
#[derive(Debug, Default)]
pub struct HandoffStore {
    pub route: HandoffSlot<Arc<RouteResult>>,
    pub open_favorites: HandoffSlot<bool>,
    pub route_history: HandoffSlot<RouteHistoryEntry>,
}

impl HandoffStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn clear_all(&self) {
        self.route.clear();
        self.open_favorites.clear();
        self.route_history.clear();
    }
}
