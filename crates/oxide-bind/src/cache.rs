//! Two-generation bounded cache.
//!
//! Lookups check the current generation, then the previous one. A hit in the
//! previous generation is promoted. When the current generation is full it
//! becomes the previous one and a fresh generation starts, so memory stays
//! bounded without per-key bookkeeping.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;
use tracing::debug;

/// Default capacity of the process-wide caches.
pub const CACHE_CAPACITY: usize = 4096;

struct Generations<K, V> {
    current: HashMap<K, V>,
    previous: HashMap<K, V>,
}

impl<K: Eq + Hash, V> Generations<K, V> {
    fn rotate_if_full(&mut self, capacity: usize, name: &'static str) {
        if self.current.len() >= capacity {
            debug!(cache = name, capacity, "rotating cache generation");
            self.previous = std::mem::replace(
                &mut self.current,
                HashMap::with_capacity(capacity / 2),
            );
        }
    }
}

/// A bounded, internally synchronized memoization map.
pub struct GenerationalCache<K, V> {
    name: &'static str,
    capacity: usize,
    inner: RwLock<Generations<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> GenerationalCache<K, V> {
    /// Creates a cache. A zero capacity falls back to [`CACHE_CAPACITY`].
    #[must_use]
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            CACHE_CAPACITY
        } else {
            capacity
        };
        Self {
            name,
            capacity,
            inner: RwLock::new(Generations {
                current: HashMap::with_capacity(capacity / 2),
                previous: HashMap::new(),
            }),
        }
    }

    /// Looks up a key, promoting a previous-generation hit.
    pub fn get(&self, key: &K) -> Option<V> {
        {
            let gens = self.inner.read();
            if let Some(v) = gens.current.get(key) {
                return Some(v.clone());
            }
            if !gens.previous.contains_key(key) {
                return None;
            }
        }

        let mut gens = self.inner.write();
        // Another thread may have promoted or rotated in between.
        if let Some(v) = gens.current.get(key) {
            return Some(v.clone());
        }
        let value = gens.previous.get(key)?.clone();
        gens.rotate_if_full(self.capacity, self.name);
        gens.current.insert(key.clone(), value.clone());
        Some(value)
    }

    /// Inserts a value into the current generation.
    pub fn insert(&self, key: K, value: V) {
        let mut gens = self.inner.write();
        gens.rotate_if_full(self.capacity, self.name);
        gens.current.insert(key, value);
    }

    /// Returns the cached value or computes, stores and returns it.
    ///
    /// The computation runs without holding the lock. Failed computations are
    /// not cached.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `build`.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }
        let value = build()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Total number of resident entries across both generations.
    #[must_use]
    pub fn len(&self) -> usize {
        let gens = self.inner.read();
        gens.current.len() + gens.previous.len()
    }

    /// Returns true when both generations are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity of one generation.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    fn generation_sizes(&self) -> (usize, usize) {
        let gens = self.inner.read();
        (gens.current.len(), gens.previous.len())
    }
}

impl<K, V> std::fmt::Debug for GenerationalCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationalCache")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
