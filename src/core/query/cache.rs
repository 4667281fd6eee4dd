//! LRU cache for wildcard match results
//!
//! A query compares every stored rule against every filter pattern, and the
//! same (pattern, value) pairs repeat across rules and across queries.

use crate::core::iam::PatternMatcher;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Which matcher produced a cached result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Both sides may carry wildcards
    Symmetric,
    /// Only the pattern carries wildcards
    Glob,
}

impl MatchMode {
    fn evaluate(self, pattern: &str, value: &str) -> bool {
        match self {
            MatchMode::Symmetric => PatternMatcher::matches(value, pattern),
            MatchMode::Glob => PatternMatcher::glob(pattern, value),
        }
    }
}

/// Cache key for a match evaluation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    mode: MatchMode,
    pattern: String,
    value: String,
}

/// LRU cache of match results
pub struct MatchCache {
    cache: LruCache<CacheKey, bool>,
}

impl MatchCache {
    /// Create a new match cache with given capacity (at least one entry)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        MatchCache {
            cache: LruCache::new(capacity),
        }
    }

    /// Get cached match result
    pub fn get(&mut self, mode: MatchMode, pattern: &str, value: &str) -> Option<bool> {
        let key = CacheKey {
            mode,
            pattern: pattern.to_string(),
            value: value.to_string(),
        };
        self.cache.get(&key).copied()
    }

    /// Put match result in cache
    pub fn put(&mut self, mode: MatchMode, pattern: &str, value: &str, result: bool) {
        let key = CacheKey {
            mode,
            pattern: pattern.to_string(),
            value: value.to_string(),
        };
        self.cache.put(key, result);
    }

    /// Cached result, computing and storing it on a miss
    pub fn check(&mut self, mode: MatchMode, pattern: &str, value: &str) -> bool {
        if let Some(hit) = self.get(mode, pattern, value) {
            return hit;
        }
        let result = mode.evaluate(pattern, value);
        self.put(mode, pattern, value, result);
        result
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}
