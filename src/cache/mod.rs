//! Build-once caching for expensive artifacts.
//!
//! Graphs and distance matrices are costly to build and depend only on
//! their input parameters, so they are cached process-wide behind a
//! normalized key. Floating-point key parts are rounded to six decimals
//! before hashing; parameter sets that differ only below that precision
//! share one build.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

const KEY_PRECISION: f64 = 1e6;

/// One normalized key component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Text(String),
    Int(i64),
    /// A float scaled by 10^6 and rounded.
    Scaled(i64),
}

/// A normalized cache key built from heterogeneous parameters.
///
/// # Examples
///
/// ```
/// use cartage::cache::CacheKey;
///
/// let a = CacheKey::new().text("graph").float(35.0000001).float(139.0);
/// let b = CacheKey::new().text("graph").float(35.0000002).float(139.0);
/// assert_eq!(a, b); // identical after 6-decimal rounding
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CacheKey {
    parts: Vec<KeyPart>,
}

impl CacheKey {
    /// An empty key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text component.
    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.parts.push(KeyPart::Text(value.into()));
        self
    }

    /// Appends an integer component.
    pub fn int(mut self, value: i64) -> Self {
        self.parts.push(KeyPart::Int(value));
        self
    }

    /// Appends a float component, rounded to six decimals.
    pub fn float(mut self, value: f64) -> Self {
        self.parts
            .push(KeyPart::Scaled((value * KEY_PRECISION).round() as i64));
        self
    }
}

/// A keyed build-once cache.
///
/// The map is mutex-guarded and the lock is held across the build, so
/// two lookups for the same key can never both build — the second caller
/// receives the first caller's value. Values are shared as `Arc`s.
pub struct BuildCache<T> {
    inner: Mutex<HashMap<CacheKey, Arc<T>>>,
}

impl<T> BuildCache<T> {
    /// An empty cache.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, building and storing it first
    /// when absent.
    pub fn get_or_build<F>(&self, key: CacheKey, build: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            // A panicked build leaves the map itself intact.
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(hit) = map.get(&key) {
            return Arc::clone(hit);
        }
        debug!(?key, "cache miss, building");
        let value = Arc::new(build());
        map.insert(key, Arc::clone(&value));
        value
    }

    /// Returns the cached value without building.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<T>> {
        let map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.get(key).map(Arc::clone)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached entry. Used between test scenarios.
    pub fn clear(&self) {
        match self.inner.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl<T> Default for BuildCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_builds_once_per_key() {
        let cache: BuildCache<String> = BuildCache::new();
        let builds = AtomicUsize::new(0);
        let key = || CacheKey::new().text("graph").float(35.0).float(139.0);

        let first = cache.get_or_build(key(), || {
            builds.fetch_add(1, Ordering::SeqCst);
            "built".to_string()
        });
        let second = cache.get_or_build(key(), || {
            builds.fetch_add(1, Ordering::SeqCst);
            "rebuilt".to_string()
        });
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(*first, "built");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_float_normalization() {
        let a = CacheKey::new().float(35.123_456_1);
        let b = CacheKey::new().float(35.123_456_4);
        let c = CacheKey::new().float(35.123_457_9);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_distinct_keys_build_separately() {
        let cache: BuildCache<i32> = BuildCache::new();
        cache.get_or_build(CacheKey::new().int(1), || 10);
        cache.get_or_build(CacheKey::new().int(2), || 20);
        assert_eq!(cache.len(), 2);
        assert_eq!(*cache.get(&CacheKey::new().int(2)).unwrap(), 20);
    }

    #[test]
    fn test_clear() {
        let cache: BuildCache<i32> = BuildCache::new();
        cache.get_or_build(CacheKey::new().text("x"), || 1);
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&CacheKey::new().text("x")).is_none());
    }
}
