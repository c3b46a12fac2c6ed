//! Thread-safe keyed store.
//!
//! A [`Store`] is a `HashMap` behind one `parking_lot::RwLock`. Reads
//! (`get`, `snapshot`, `len`) run concurrently; writes are exclusive. Every
//! operation takes the lock for exactly its own duration, so no lock is ever
//! held across a send or while an event is published.
//!
//! Iteration goes through [`Store::snapshot`], which returns a detached
//! copy: callers can walk it at leisure while the store keeps changing.

use std::collections::HashMap;

use cinder_protocol::SteamId;
use parking_lot::RwLock;

/// An entity stored under its own id.
pub trait Keyed {
    fn key(&self) -> SteamId;
}

#[derive(Debug)]
pub struct Store<T> {
    entries: RwLock<HashMap<SteamId, T>>,
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Keyed + Clone> Store<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entity under its key, returning the old one.
    pub fn upsert(&self, entity: T) -> Option<T> {
        self.entries.write().insert(entity.key(), entity)
    }

    /// Removes the entity. Removing a missing id is a no-op.
    pub fn remove(&self, id: SteamId) -> Option<T> {
        self.entries.write().remove(&id)
    }

    pub fn get(&self, id: SteamId) -> Option<T> {
        self.entries.read().get(&id).cloned()
    }

    pub fn contains(&self, id: SteamId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Point-in-time copy of every entry.
    pub fn snapshot(&self) -> HashMap<SteamId, T> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Mutates an existing entity in place. Returns `None` if absent.
    pub fn update<R>(&self, id: SteamId, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.entries.write().get_mut(&id).map(f)
    }

    /// Mutates the entity, creating it with `default` first if absent.
    ///
    /// Returns a copy of the entity after the change.
    pub fn upsert_with(&self, id: SteamId, default: impl FnOnce() -> T, f: impl FnOnce(&mut T)) -> T {
        let mut entries = self.entries.write();
        let entity = entries.entry(id).or_insert_with(default);
        f(entity);
        entity.clone()
    }

    /// Keeps only the entities for which `keep` returns true.
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) {
        self.entries.write().retain(|_, entity| keep(entity));
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
