//! Free-form metadata attached to a [`Ring`](crate::Ring).
//!
//! Unlike [`Env`](crate::env::Env), [`Meta`] is a shared handle: cloning it
//! yields another handle to the same store, and every mutation is visible to
//! all holders. Every `Ring` derived from a common ancestor keeps sharing the
//! ancestor's metadata until it is given a new store. Use [`Meta::detach`]
//! for an independent copy.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A metadata value of any shareable type.
pub type MetaValue = Arc<dyn Any + Send + Sync>;

/// Shared, internally synchronized metadata store.
#[derive(Clone, Default)]
pub struct Meta {
    map: Arc<RwLock<HashMap<String, MetaValue>>>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given entries.
    pub fn from_map(map: HashMap<String, MetaValue>) -> Self {
        Self {
            map: Arc::new(RwLock::new(map)),
        }
    }

    /// Set `key` to `value`, visible through every handle to this store.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.write().insert(key.into(), Arc::new(value));
    }

    /// Set `key` to an already shared value.
    pub fn set_value(&self, key: impl Into<String>, value: MetaValue) {
        self.write().insert(key.into(), value);
    }

    /// Return the raw value of `key`, or `None` when it is not set.
    pub fn lookup(&self, key: &str) -> Option<MetaValue> {
        self.read().get(key).cloned()
    }

    /// Return a copy of `key` when it is set and holds a `T`.
    pub fn get<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.read()
            .get(key)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn delete(&self, key: &str) {
        self.write().remove(key);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Copy the current entries into a plain map. Values are shared, the map
    /// is not.
    pub fn snapshot(&self) -> HashMap<String, MetaValue> {
        self.read().clone()
    }

    /// Create an independent store with the current entries.
    pub fn detach(&self) -> Self {
        Self::from_map(self.snapshot())
    }

    /// Return true when both handles point at the same store.
    pub fn same_store(&self, other: &Meta) -> bool {
        Arc::ptr_eq(&self.map, &other.map)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, MetaValue>> {
        self.map.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, MetaValue>> {
        self.map.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<HashMap<String, MetaValue>> for Meta {
    fn from(map: HashMap<String, MetaValue>) -> Self {
        Self::from_map(map)
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = self.keys();
        keys.sort();
        f.debug_struct("Meta").field("keys", &keys).finish()
    }
}
