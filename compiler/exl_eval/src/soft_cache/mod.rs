//! A bounded, reclaimable LRU cache shared across evaluations.
//!
//! Holds derived artifacts (parsed scripts, resolved templates) that are
//! expensive to rebuild but never required for correctness: the whole
//! map may be dropped at any time ([`SoftCache::reclaim`]) and is rebuilt
//! lazily on the next `put`. Callers must treat a miss after a `put` as
//! normal.
//!
//! Reads share a lock and record recency with an atomic stamp per entry,
//! so concurrent `get`s never serialize. Writes (including lazy
//! recreation) take the lock exclusively.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::scope::FxIndexMap;

struct Entry<V> {
    value: V,
    /// Clock reading of the last access.
    stamp: AtomicU64,
}

pub struct SoftCache<K, V> {
    size: usize,
    map: RwLock<Option<FxIndexMap<K, Entry<V>>>>,
    clock: AtomicU64,
}

impl<K, V> SoftCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// A cache holding at most `size` entries. A size of 0 caches nothing.
    pub fn new(size: usize) -> Self {
        SoftCache {
            size,
            map: RwLock::new(None),
            clock: AtomicU64::new(0),
        }
    }

    /// The configured bound.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.map.read().as_ref().map_or(0, FxIndexMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let guard = self.map.read();
        let entry = guard.as_ref()?.get(key)?;
        entry.stamp.store(self.tick(), Ordering::Relaxed);
        Some(entry.value.clone())
    }

    /// Insert or replace `key`, evicting the least recently used entry
    /// once the bound is exceeded.
    pub fn put(&self, key: K, value: V) {
        if self.size == 0 {
            return;
        }
        let stamp = AtomicU64::new(self.tick());
        let mut guard = self.map.write();
        let map = guard.get_or_insert_with(|| {
            FxIndexMap::with_capacity_and_hasher(self.size + 1, Default::default())
        });
        map.insert(key, Entry { value, stamp });
        if map.len() > self.size {
            let eldest = map
                .values()
                .enumerate()
                .min_by_key(|(_, entry)| entry.stamp.load(Ordering::Relaxed))
                .map(|(index, _)| index);
            if let Some(index) = eldest {
                map.swap_remove_index(index);
                tracing::debug!(size = self.size, "soft cache evicted eldest entry");
            }
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        if let Some(map) = self.map.write().as_mut() {
            map.clear();
        }
    }

    /// Drop the backing map, as memory pressure would.
    pub fn reclaim(&self) {
        if self.map.write().take().is_some() {
            tracing::debug!(size = self.size, "soft cache reclaimed");
        }
    }

    pub fn is_reclaimed(&self) -> bool {
        self.map.read().is_none()
    }

    /// A snapshot of the entries, least recently used first.
    pub fn entries(&self) -> Vec<(K, V)> {
        let guard = self.map.read();
        let Some(map) = guard.as_ref() else {
            return Vec::new();
        };
        let mut entries: Vec<_> = map
            .iter()
            .map(|(key, entry)| {
                (
                    entry.stamp.load(Ordering::Relaxed),
                    key.clone(),
                    entry.value.clone(),
                )
            })
            .collect();
        entries.sort_by_key(|(stamp, _, _)| *stamp);
        entries
            .into_iter()
            .map(|(_, key, value)| (key, value))
            .collect()
    }
}
