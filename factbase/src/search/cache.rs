use lru::LruCache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe LRU cache of query embeddings.
///
/// Keys are hashes of the exact query text. A capacity of zero disables the
/// cache; every lookup misses and nothing is stored.
#[derive(Clone)]
pub struct QueryEmbeddingCache {
    cache: Option<Arc<Mutex<LruCache<String, Vec<f32>>>>>,
}

impl QueryEmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: NonZeroUsize::new(capacity).map(|cap| Arc::new(Mutex::new(LruCache::new(cap)))),
        }
    }

    fn lock(cache: &Mutex<LruCache<String, Vec<f32>>>) -> MutexGuard<'_, LruCache<String, Vec<f32>>> {
        cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, query: &str) -> Option<Vec<f32>> {
        let cache = self.cache.as_ref()?;
        Self::lock(cache).get(&Self::key(query)).cloned()
    }

    /// If the cache is at capacity, the least recently used entry is evicted.
    pub fn put(&self, query: &str, vector: Vec<f32>) {
        if let Some(cache) = &self.cache {
            Self::lock(cache).put(Self::key(query), vector);
        }
    }

    pub fn len(&self) -> usize {
        self.cache.as_ref().map(|c| Self::lock(c).len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(query: &str) -> String {
        let mut hasher = DefaultHasher::new();
        query.as_bytes().hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cache_hit_after_put() {
        let cache = QueryEmbeddingCache::new(10);
        cache.put("opening hours", vec![0.1, 0.2]);

        assert_eq!(cache.get("opening hours"), Some(vec![0.1, 0.2]));
        assert_eq!(cache.get("Opening hours"), None);
    }

    #[test]
    fn test_cache_capacity_enforcement() {
        let cache = QueryEmbeddingCache::new(2);

        cache.put("query1", vec![1.0]);
        cache.put("query2", vec![2.0]);
        cache.put("query3", vec![3.0]);

        // query1 should be evicted (LRU)
        assert_eq!(cache.get("query1"), None);
        assert_eq!(cache.get("query2"), Some(vec![2.0]));
        assert_eq!(cache.get("query3"), Some(vec![3.0]));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let cache = QueryEmbeddingCache::new(0);
        cache.put("query", vec![1.0]);

        assert_eq!(cache.get("query"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = QueryEmbeddingCache::new(100);
        let mut handles = vec![];

        for i in 0..10 {
            let cache_clone = cache.clone();
            let handle = thread::spawn(move || {
                let query = format!("query{i}");
                cache_clone.put(&query, vec![i as f32]);
                cache_clone.get(&query)
            });
            handles.push(handle);
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Some(vec![i as f32]));
        }
    }
}
