//! Bounded in-memory label memo.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use super::ResourceId;

/// LRU map from normalized label to identifier.
///
/// Thread-safe: all methods take `&self`.
pub struct LabelCache {
    entries: Mutex<LruCache<String, ResourceId>>,
}

impl LabelCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a label, marking it recently used
    pub fn get(&self, normalized: &str) -> Option<ResourceId> {
        self.entries.lock().get(normalized).copied()
    }

    pub fn insert(&self, normalized: String, id: ResourceId) {
        self.entries.lock().put(normalized, id);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = LabelCache::new(NonZeroUsize::new(2).unwrap());
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        assert_eq!(cache.get("a"), Some(1));

        cache.insert("c".into(), 3);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
