//! Bounded cache of open input datasets.

use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::dataset::Dataset;
use crate::errors::Result;

/// Number of inputs kept open at once unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 8;

/// A fixed capacity map that evicts in insertion order. Lookups do not refresh an
/// entry's position.
#[derive(Debug)]
pub struct FifoCache<K, V> {
    capacity: usize,
    queue: VecDeque<K>,
    entries: HashMap<K, V>,
}

impl<K: Clone + Debug + Eq + Hash, V> FifoCache<K, V> {
    /// `capacity` is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        FifoCache {
            capacity,
            queue: VecDeque::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Return the cached value for `key`, or build it with `open` and insert it,
    /// evicting the oldest entry first when the cache is full. A failing `open`
    /// leaves the cache untouched.
    pub fn get_or_try_insert_with<E, F>(&mut self, key: &K, open: F) -> std::result::Result<&V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        if !self.entries.contains_key(key) {
            let value = open()?;
            if self.queue.len() == self.capacity {
                if let Some(oldest) = self.queue.pop_front() {
                    debug!(key = ?oldest, "evicting oldest cache entry");
                    self.entries.remove(&oldest);
                }
            }
            self.queue.push_back(key.clone());
            self.entries.insert(key.clone(), value);
        }
        Ok(&self.entries[key])
    }
}

/// Keeps the most recently opened inputs open so that neighbouring tiles, which
/// usually read from the same few files, do not reopen them.
#[derive(Debug)]
pub struct DatasetCache {
    inner: FifoCache<PathBuf, Dataset>,
}

impl DatasetCache {
    pub fn new(capacity: usize) -> Self {
        DatasetCache {
            inner: FifoCache::new(capacity),
        }
    }

    pub fn get(&mut self, path: &Path) -> Result<&Dataset> {
        let key = path.to_path_buf();
        if self.inner.contains(&key) {
            debug!(path = %path.display(), "dataset cache hit");
        }
        self.inner.get_or_try_insert_with(&key, || {
            debug!(path = %path.display(), "opening input");
            Dataset::open(path)
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        DatasetCache::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(cache: &mut FifoCache<u32, String>, key: u32) {
        cache
            .get_or_try_insert_with::<(), _>(&key, || Ok(format!("value {key}")))
            .unwrap();
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut cache = FifoCache::new(2);
        insert(&mut cache, 1);
        insert(&mut cache, 2);
        insert(&mut cache, 3);
        assert!(!cache.contains(&1));
        assert!(cache.contains(&2));
        assert!(cache.contains(&3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_hit_does_not_refresh() {
        let mut cache = FifoCache::new(2);
        insert(&mut cache, 1);
        insert(&mut cache, 2);
        let mut opened = false;
        let value = cache
            .get_or_try_insert_with::<(), _>(&1, || {
                opened = true;
                Ok(String::new())
            })
            .unwrap();
        assert_eq!(value, "value 1");
        assert!(!opened);

        insert(&mut cache, 3);
        assert!(!cache.contains(&1));
    }

    #[test]
    fn test_failed_open_leaves_cache_untouched() {
        let mut cache = FifoCache::new(1);
        insert(&mut cache, 1);
        let result = cache.get_or_try_insert_with(&2, || Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(cache.contains(&1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache: FifoCache<u32, String> = FifoCache::new(0);
        assert_eq!(cache.capacity(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_dataset_cache_reports_missing_file() {
        let _quiet = crate::test_utils::SuppressGDALErrorLog::new();
        let mut cache = DatasetCache::default();
        assert!(cache.get(Path::new("/no/such/input.tif")).is_err());
        assert!(cache.is_empty());
    }
}
