//! # Listener registry.
//!
//! Maps each listener to the filter mask it registered with. The registry is a
//! plain data structure; the client wraps it in a `tokio::sync::RwLock` so that
//! registration changes take the write side and dispatch takes the read side.
//!
//! ## Rules
//! - A listener appears at most once; the first registration's filter wins
//! - Removing an absent listener is a no-op
//! - Snapshots are ordered by listener id (handle creation order)

use std::collections::HashMap;

use super::handle::{EventsListener, ListenerId};

/// One registered listener and its filter.
#[derive(Debug, Clone)]
pub struct Registration {
    pub listener: EventsListener,
    pub filter: u32,
}

/// Mapping of listener handles to filter masks.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    entries: HashMap<ListenerId, Registration>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` with `filter`.
    ///
    /// Returns `false` and keeps the existing entry if the listener is already present.
    pub fn add(&mut self, listener: &EventsListener, filter: u32) -> bool {
        if self.entries.contains_key(&listener.id()) {
            return false;
        }
        self.entries.insert(
            listener.id(),
            Registration {
                listener: listener.clone(),
                filter,
            },
        );
        true
    }

    /// Unregisters a listener. Returns whether it was present.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Filter registered for `id`.
    pub fn filter_of(&self, id: ListenerId) -> Option<u32> {
        self.entries.get(&id).map(|r| r.filter)
    }

    /// Copy of every registration, ordered by listener id.
    pub fn snapshot(&self) -> Vec<Registration> {
        let mut all: Vec<Registration> = self.entries.values().cloned().collect();
        all.sort_unstable_by_key(|r| r.listener.id());
        all
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drops every registration.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
