//! In-memory key/value cache with per-entry TTL and pattern invalidation.

use super::clock::{duration_to_millis, Clock, SystemClock};
use crate::config::CacheDefaults;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::debug;

/// Configuration for cache behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied when `set` is called without an override.
    pub default_ttl: Duration,
    /// Prepended to every key before storage.
    pub key_prefix: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: CacheDefaults::DEFAULT_TTL,
            key_prefix: None,
        }
    }
}

impl CacheConfig {
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// A cached value and the instant it stops being visible.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at_millis: i64,
}

impl<T> CacheEntry<T> {
    /// An entry expiring exactly at `now` is already expired.
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.expires_at_millis <= now_millis
    }
}

/// Short-lived memoization keyed by caller-built strings.
///
/// Expiry is lazy: reads compare against the clock and drop the stale entry
/// they find, while [`Cache::cleanup`] is the only operation that prunes
/// proactively. All methods are synchronous and never hold the lock across
/// an await point.
pub struct Cache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    /// Bumped by every explicit removal, under the write lock.
    generation: AtomicU64,
    default_ttl: Duration,
    key_prefix: String,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> Cache<T> {
    /// Create a cache backed by the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            default_ttl: config.default_ttl,
            key_prefix: config.key_prefix.unwrap_or_default(),
            clock,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get a live value. Expired entries read as absent.
    pub fn get(&self, key: &str) -> Option<T> {
        let full_key = self.full_key(key);
        let now = self.clock.now_millis();

        {
            let entries = self.read();
            match entries.get(&full_key) {
                None => return None,
                Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: drop it unless a concurrent set already replaced it.
        let mut entries = self.write();
        if entries
            .get(&full_key)
            .is_some_and(|entry| entry.is_expired_at(now))
        {
            entries.remove(&full_key);
        }
        None
    }

    /// Store a value, overwriting any existing entry.
    pub fn set(&self, key: &str, value: T, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let expires_at_millis = self
            .clock
            .now_millis()
            .saturating_add(duration_to_millis(ttl));
        self.write().insert(
            self.full_key(key),
            CacheEntry {
                value,
                expires_at_millis,
            },
        );
    }

    /// Store a value only if nothing was deleted, cleared or invalidated
    /// since `generation` was read. Returns whether the value was stored.
    ///
    /// Read-through callers take [`Cache::generation`] before fetching so a
    /// fetch that overlaps an invalidation cannot put its stale result back.
    pub fn set_if_generation(
        &self,
        key: &str,
        value: T,
        ttl: Option<Duration>,
        generation: u64,
    ) -> bool {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut entries = self.write();
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        let expires_at_millis = self
            .clock
            .now_millis()
            .saturating_add(duration_to_millis(ttl));
        entries.insert(
            self.full_key(key),
            CacheEntry {
                value,
                expires_at_millis,
            },
        );
        true
    }

    /// Counter advanced by `delete`, `clear` and `invalidate_pattern`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Remove a key. Returns whether anything was stored under it.
    pub fn delete(&self, key: &str) -> bool {
        let mut entries = self.write();
        self.bump_generation();
        entries.remove(&self.full_key(key)).is_some()
    }

    pub fn clear(&self) {
        let mut entries = self.write();
        self.bump_generation();
        entries.clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn size(&self) -> usize {
        self.read().len()
    }

    /// Stored (prefixed) keys, including expired ones not yet swept.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Remove every entry whose expiry has passed. Returns the number removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    /// Remove every entry whose prefixed key matches `pattern`, live or not.
    ///
    /// The pattern is searched for anywhere in the key, so a plain prompt
    /// name evicts every key mentioning it. A pattern that does not compile
    /// as a regex is matched as a literal substring.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let matcher = KeyMatcher::new(pattern);
        let mut entries = self.write();
        self.bump_generation();
        let before = entries.len();
        entries.retain(|key, _| !matcher.matches(key));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Invalidated {} cache entries matching {:?}", removed, pattern);
        }
        removed
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for Cache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("default_ttl", &self.default_ttl)
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

enum KeyMatcher<'a> {
    Regex(Regex),
    Substring(&'a str),
}

impl<'a> KeyMatcher<'a> {
    fn new(pattern: &'a str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => KeyMatcher::Regex(regex),
            Err(_) => KeyMatcher::Substring(pattern),
        }
    }

    fn matches(&self, key: &str) -> bool {
        match self {
            KeyMatcher::Regex(regex) => regex.is_match(key),
            KeyMatcher::Substring(needle) => key.contains(needle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;

    fn cache_with_clock(ttl_secs: u64) -> (Cache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let config = CacheConfig::default().with_default_ttl(Duration::from_secs(ttl_secs));
        (Cache::with_clock(config, clock.clone()), clock)
    }

    #[test]
    fn test_get_unset_key_is_absent() {
        let (cache, _) = cache_with_clock(60);
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_set_then_get() {
        let (cache, _) = cache_with_clock(60);
        cache.set("k", "v".to_string(), None);
        assert_eq!(cache.get("k"), Some("v".to_string()));

        cache.set("k", "v2".to_string(), Some(Duration::from_secs(5)));
        assert_eq!(cache.get("k"), Some("v2".to_string()));
    }

    #[test]
    fn test_entry_expires_lazily() {
        let (cache, clock) = cache_with_clock(10);
        cache.set("k", "v".to_string(), None);

        clock.advance(Duration::from_secs(9));
        assert_eq!(cache.get("k"), Some("v".to_string()));

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get("k"), None);
        // The read dropped the stale entry.
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_expiry_at_exact_boundary() {
        let (cache, clock) = cache_with_clock(10);
        cache.set("k", "v".to_string(), None);
        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_ttl_override_wins_over_default() {
        let (cache, clock) = cache_with_clock(300);
        cache.set("short", "v".to_string(), Some(Duration::from_secs(1)));
        cache.set("long", "v".to_string(), None);

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.get("long"), Some("v".to_string()));
    }

    #[test]
    fn test_size_counts_unswept_expired_entries() {
        let (cache, clock) = cache_with_clock(10);
        cache.set("a", "1".to_string(), None);
        cache.set("b", "2".to_string(), None);
        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_cleanup_removes_only_expired() {
        let (cache, clock) = cache_with_clock(10);
        cache.set("old", "1".to_string(), None);
        cache.set("fresh", "2".to_string(), Some(Duration::from_secs(100)));

        clock.advance(Duration::from_secs(11));
        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.get("fresh"), Some("2".to_string()));
    }

    #[test]
    fn test_delete_and_clear() {
        let (cache, _) = cache_with_clock(10);
        cache.set("a", "1".to_string(), None);
        cache.set("b", "2".to_string(), None);

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.size(), 1);

        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_key_prefix_applies_to_storage() {
        let clock = Arc::new(ManualClock::new(0));
        let cache: Cache<u32> =
            Cache::with_clock(CacheConfig::default().with_key_prefix("lf:"), clock);
        cache.set("greeting", 1, None);
        assert_eq!(cache.keys(), vec!["lf:greeting".to_string()]);
        assert_eq!(cache.get("greeting"), Some(1));
        assert!(cache.delete("greeting"));
    }

    #[test]
    fn test_invalidate_pattern_substring() {
        let (cache, clock) = cache_with_clock(10);
        cache.set("prompt:greeting:latest", "a".to_string(), None);
        cache.set("prompt:greeting:v2", "b".to_string(), Some(Duration::from_secs(1)));
        cache.set("prompt:farewell:latest", "c".to_string(), None);

        // Matching entries go regardless of expiry state.
        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.invalidate_pattern("greeting"), 2);
        assert_eq!(cache.keys(), vec!["prompt:farewell:latest".to_string()]);
        assert_eq!(cache.get("prompt:farewell:latest"), Some("c".to_string()));
    }

    #[test]
    fn test_invalidate_pattern_matches_prefixed_key() {
        let clock = Arc::new(ManualClock::new(0));
        let cache: Cache<u32> =
            Cache::with_clock(CacheConfig::default().with_key_prefix("lists:"), clock);
        cache.set("page=1", 1, None);
        cache.set("page=2", 2, None);
        assert_eq!(cache.invalidate_pattern("^lists:page=1$"), 1);
        assert_eq!(cache.get("page=2"), Some(2));
    }

    #[test]
    fn test_set_if_generation_skips_after_invalidation() {
        let (cache, _) = cache_with_clock(60);
        let before = cache.generation();

        // Nothing matches, but an in-flight fill must still be dropped.
        assert_eq!(cache.invalidate_pattern("greeting"), 0);
        let stale = "stale".to_string();
        assert!(!cache.set_if_generation("prompt:greeting:latest", stale, None, before));
        assert_eq!(cache.get("prompt:greeting:latest"), None);

        let current = cache.generation();
        let fresh = "fresh".to_string();
        assert!(cache.set_if_generation("prompt:greeting:latest", fresh, None, current));
        assert_eq!(cache.get("prompt:greeting:latest"), Some("fresh".to_string()));
    }

    #[test]
    fn test_generation_ignores_sets_and_expiry() {
        let (cache, clock) = cache_with_clock(1);
        let start = cache.generation();

        cache.set("a", "1".to_string(), None);
        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.generation(), start);

        cache.delete("a");
        cache.clear();
        assert_eq!(cache.generation(), start + 2);
    }

    #[test]
    fn test_invalid_regex_falls_back_to_substring() {
        let (cache, _) = cache_with_clock(10);
        cache.set("prompt:odd(name:latest", "a".to_string(), None);
        cache.set("prompt:other:latest", "b".to_string(), None);
        assert_eq!(cache.invalidate_pattern("odd("), 1);
        assert_eq!(cache.size(), 1);
    }
}
