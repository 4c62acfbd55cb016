use std::future::Future;
use std::hash::Hash;

use async_cell::sync::AsyncCell;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// A memoizing, coalescing cache: concurrent calls to `get_or_init` for the
/// same key race to populate a single `AsyncCell`, so only one of them
/// actually does the (expensive, usually upstream) work while the rest
/// await the same result. Values are immutable once set, so readers never
/// observe a partially-written value.
///
/// Ported from this codebase's `AwaitCache`, generalized to accept a
/// fallible async initializer (`locate(object_id)` can fail with
/// `FileNotFound`) instead of a plain sync value.
pub struct AwaitCache<K: Clone + Eq + Hash, V: Clone> {
    items: DashMap<K, AsyncCell<V>>,
}

impl<K: Clone + Eq + Hash, V: Clone> Default for AwaitCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Eq + Hash, V: Clone> AwaitCache<K, V> {
    pub fn new() -> Self {
        AwaitCache {
            items: DashMap::new(),
        }
    }

    /// Returns the cached value for `key`, or runs `init` to produce one.
    ///
    /// If `init` errors, the (still-empty) entry is removed so the next
    /// caller gets a fresh attempt rather than awaiting a cell that will
    /// never be filled.
    pub async fn get_or_try_init<F, Fut, E>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        match self.items.entry(key.clone()) {
            Entry::Occupied(entry) => Ok(entry.get().get().await),
            Entry::Vacant(entry) => {
                let cell: AsyncCell<V> = AsyncCell::new();
                entry.insert(cell);
                match init().await {
                    Ok(val) => {
                        if let Some(entry) = self.items.get(&key) {
                            entry.set(val.clone());
                        }
                        Ok(val)
                    }
                    Err(err) => {
                        self.items.remove(&key);
                        Err(err)
                    }
                }
            }
        }
    }

    /// Full flush: drops every cached entry. Readers mid-await on an
    /// in-flight entry are unaffected since they hold their own `AsyncCell`
    /// reference via the (still-live) occupied-entry lookup that happened
    /// before the clear.
    pub fn clear(&self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn remove(&self, key: &K) {
        self.items.remove(key);
    }
}
