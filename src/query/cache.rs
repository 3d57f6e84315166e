use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use crate::query::results::ResultSet;

/// Result cache: memoises completed result sets keyed by the canonical
/// query plus the control signature. A hit returns the stored set
/// unchanged; a miss runs the full engine and the cache is updated
/// afterwards. Failed queries are never cached.
pub struct ResultCache {
    cache: Mutex<LruCache<CacheKey, ResultSet>>,
    pub capacity: usize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    /// Canonicalised query text (MatchingQueryTerms::canonical).
    pub query: String,
    /// QueryConfig::signature of the controls that shape a result set.
    pub controls: String,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        ResultCache {
            cache: Mutex::new(LruCache::new(cap)),
            capacity,
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<ResultSet> {
        let mut cache = self.cache.lock();
        if let Some(results) = cache.get(key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            Some(results.clone())
        } else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn put(&self, key: CacheKey, results: ResultSet) {
        let mut cache = self.cache.lock();
        cache.put(key, results);
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.cache.lock().len(),
            capacity: self.capacity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;

    fn key(query: &str) -> CacheKey {
        CacheKey {
            query: query.to_string(),
            controls: "bm25||1000".to_string(),
        }
    }

    #[test]
    fn hit_returns_stored_set_unchanged() {
        let cache = ResultCache::new(8);
        let mut results = ResultSet::new();
        results.push(DocId(3), 1.5, 0b1);

        assert!(cache.get(&key("a b")).is_none());
        cache.put(key("a b"), results.clone());

        let hit = cache.get(&key("a b")).unwrap();
        assert_eq!(hit.doc_ids, results.doc_ids);
        assert_eq!(hit.scores, results.scores);
        assert_eq!(hit.occurrences, results.occurrences);

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[test]
    fn different_controls_are_different_entries() {
        let cache = ResultCache::new(8);
        cache.put(key("a"), ResultSet::new());
        let other = CacheKey {
            query: "a".to_string(),
            controls: "tfidf||10".to_string(),
        };
        assert!(cache.get(&other).is_none());
    }
}
