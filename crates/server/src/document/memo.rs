//! Bounded memo of recent mirror lookups.
//!
//! Each path maps to a shared once-cell, so concurrent lookups of the same
//! path wait on a single resolution. Least recently used paths are evicted
//! first once the capacity is reached.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;

use super::Resolved;

pub type Slot = Arc<OnceCell<Resolved>>;

#[derive(Default)]
struct Inner {
    slots: HashMap<String, Slot>,
    order: VecDeque<String>,
}

pub struct RecentLookups {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl RecentLookups {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), inner: Mutex::new(Inner::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Slot for `path`, created empty if absent. Marks it most recently used.
    pub fn slot(&self, path: &str) -> Slot {
        let mut inner = self.lock();

        if let Some(slot) = inner.slots.get(path).cloned() {
            inner.order.retain(|p| p != path);
            inner.order.push_back(path.to_string());
            return slot;
        }

        while inner.slots.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else { break };
            inner.slots.remove(&oldest);
        }

        let slot = Slot::default();
        inner.slots.insert(path.to_string(), Arc::clone(&slot));
        inner.order.push_back(path.to_string());
        slot
    }

    /// Drop `path` if its slot is still the one given. Used after a failed
    /// resolution so the next caller retries.
    pub fn forget(&self, path: &str, slot: &Slot) {
        let mut inner = self.lock();
        if inner.slots.get(path).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            inner.slots.remove(path);
            inner.order.retain(|p| p != path);
        }
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.slots.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
