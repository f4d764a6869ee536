//! Hash-sharded mutex-guarded state.
//!
//! Contention is scoped to one shard: operations on identities that hash to
//! different shards never wait on each other.

#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    collections::hash_map::RandomState,
    hash::{BuildHasher, Hash},
    sync::{Mutex, MutexGuard},
};

/// Fixed set of independently locked shards.
pub(crate) struct Sharded<T> {
    shards: Box<[Mutex<T>]>,
    hasher: RandomState,
}

impl<T> Sharded<T> {
    /// Create `count` shards (at least one), each built by `init`.
    pub(crate) fn new(count: usize, mut init: impl FnMut() -> T) -> Self {
        let shards = (0..count.max(1)).map(|_| Mutex::new(init())).collect();
        Self { shards, hasher: RandomState::new() }
    }

    /// Number of shards.
    #[cfg(test)]
    pub(crate) fn count(&self) -> usize {
        self.shards.len()
    }

    /// Lock the shard owning `key`.
    ///
    /// # Panics
    ///
    /// Panics if the shard mutex is poisoned.
    pub(crate) fn lock<K: Hash + ?Sized>(&self, key: &K) -> MutexGuard<'_, T> {
        let index = (self.hasher.hash_one(key) % self.shards.len() as u64) as usize;
        self.shards[index].lock().expect("shard mutex poisoned")
    }

    /// Visit every shard in turn, holding one lock at a time.
    ///
    /// # Panics
    ///
    /// Panics if a shard mutex is poisoned.
    pub(crate) fn for_each(&self, mut visit: impl FnMut(&mut T)) {
        for shard in &self.shards {
            let mut guard = shard.lock().expect("shard mutex poisoned");
            visit(&mut guard);
        }
    }
}
