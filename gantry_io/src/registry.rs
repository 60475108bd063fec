//! Fixed-capacity membership lists.
//!
//! A [`Registry`] holds keys (usually arena handles) and an optional value
//! per key. It never owns the objects the keys refer to. Entries are kept
//! in registration order; removal preserves the order of the rest.
//!
//! Visitors receive shared references only, so a registry cannot be
//! modified while it is being traversed.

use heapless::Vec;
use thiserror::Error;
use tracing::trace;

/// Registry mutation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No free slot left.
    #[error("registry full (capacity {capacity})")]
    Full { capacity: usize },

    /// The key is already a member.
    #[error("entry already registered")]
    AlreadyRegistered,
}

/// Ordered list of up to `N` distinct keys, each carrying a `V`.
#[derive(Debug, Clone)]
pub struct Registry<K, const N: usize, V = ()> {
    entries: Vec<(K, V), N>,
}

impl<K, const N: usize, V> Default for Registry<K, N, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, const N: usize, V> Registry<K, N, V> {
    /// Empty registry.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Iterate entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Visit every entry in registration order. Never stops early.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&K, &V),
    {
        for (k, v) in self.entries.iter() {
            visitor(k, v);
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Copy + PartialEq, const N: usize, V> Registry<K, N, V> {
    /// Append `key` with `value`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyRegistered`] if `key` is a member,
    /// [`RegistryError::Full`] if all `N` slots are taken.
    pub fn add_with(&mut self, key: K, value: V) -> Result<(), RegistryError> {
        if self.contains(key) {
            return Err(RegistryError::AlreadyRegistered);
        }
        self.entries
            .push((key, value))
            .map_err(|_| RegistryError::Full { capacity: N })?;
        trace!(len = self.entries.len(), "registry entry added");
        Ok(())
    }

    /// Unlink `key`. Returns its value, or `None` if it was not a member.
    pub fn remove(&mut self, key: K) -> Option<V> {
        let idx = self.position(key)?;
        let (_, value) = self.entries.remove(idx);
        trace!(len = self.entries.len(), "registry entry removed");
        Some(value)
    }

    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: K) -> Option<&V> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.entries
            .iter_mut()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Visit entries in registration order and stop at the first one the
    /// visitor claims (returns `true` for).
    ///
    /// Returns the claimed key ("handled") or `None` ("not handled").
    pub fn find_first_match<F>(&self, mut visitor: F) -> Option<K>
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.entries
            .iter()
            .find(|(k, v)| visitor(k, v))
            .map(|(k, _)| *k)
    }

    /// Keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    fn position(&self, key: K) -> Option<usize> {
        self.entries.iter().position(|(k, _)| *k == key)
    }
}

impl<K: Copy + PartialEq, const N: usize> Registry<K, N, ()> {
    /// Append a value-less `key`.
    #[inline]
    pub fn add(&mut self, key: K) -> Result<(), RegistryError> {
        self.add_with(key, ())
    }
}
