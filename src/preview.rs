//! Short-lived memoization for interactive card previews.
//!
//! The wizard re-requests the same preview every time the user tabs through
//! songs, so rendered PNGs are kept for a sliding 10 minutes (refreshed on
//! every hit) with an absolute 1 hour ceiling. Expired entries are purged
//! lazily on access; the cache owns the whole lifecycle and is never
//! invalidated externally.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Expiration settings for [`PreviewCache`].
#[derive(Debug, Clone, Copy)]
pub struct PreviewCacheConfig {
    /// Idle time after which an entry expires; refreshed on every hit
    pub sliding_expiry: Duration,
    /// Maximum entry lifetime regardless of hits
    pub absolute_expiry: Duration,
}

impl Default for PreviewCacheConfig {
    fn default() -> Self {
        Self {
            sliding_expiry: Duration::from_secs(10 * 60),
            absolute_expiry: Duration::from_secs(60 * 60),
        }
    }
}

struct PreviewEntry {
    bytes: Vec<u8>,
    inserted_at: Instant,
    last_hit: Instant,
}

impl PreviewEntry {
    fn is_expired(&self, now: Instant, config: &PreviewCacheConfig) -> bool {
        now.duration_since(self.last_hit) >= config.sliding_expiry
            || now.duration_since(self.inserted_at) >= config.absolute_expiry
    }
}

/// In-memory cache of generated preview PNGs, keyed by render fingerprint.
pub struct PreviewCache {
    config: PreviewCacheConfig,
    entries: Mutex<HashMap<String, PreviewEntry>>,
}

impl PreviewCache {
    /// Create a cache with the standard 10 min / 1 h expirations.
    pub fn new() -> Self {
        Self::with_config(PreviewCacheConfig::default())
    }

    /// Create a cache with custom expirations.
    pub fn with_config(config: PreviewCacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached bytes for `key`, or invoke `generator`, store its
    /// result, and return it.
    pub fn get_or_create<F>(&self, key: &str, generator: F) -> Vec<u8>
    where
        F: FnOnce() -> Vec<u8>,
    {
        let now = Instant::now();

        {
            let mut entries = self.entries.lock().unwrap();
            entries.retain(|_, entry| !entry.is_expired(now, &self.config));
            if let Some(entry) = entries.get_mut(key) {
                entry.last_hit = now;
                return entry.bytes.clone();
            }
        }

        let bytes = generator();
        self.entries.lock().unwrap().insert(
            key.to_string(),
            PreviewEntry {
                bytes: bytes.clone(),
                inserted_at: now,
                last_hit: now,
            },
        );
        bytes
    }

    /// Fallible variant of [`get_or_create`](Self::get_or_create): a
    /// generator error is returned as-is and nothing is cached for `key`.
    pub fn try_get_or_create<F>(&self, key: &str, generator: F) -> crate::error::Result<Vec<u8>>
    where
        F: FnOnce() -> crate::error::Result<Vec<u8>>,
    {
        let now = Instant::now();

        {
            let mut entries = self.entries.lock().unwrap();
            entries.retain(|_, entry| !entry.is_expired(now, &self.config));
            if let Some(entry) = entries.get_mut(key) {
                entry.last_hit = now;
                return Ok(entry.bytes.clone());
            }
        }

        let bytes = generator()?;
        self.entries.lock().unwrap().insert(
            key.to_string(),
            PreviewEntry {
                bytes: bytes.clone(),
                inserted_at: now,
                last_hit: now,
            },
        );
        Ok(bytes)
    }

    /// Number of live (possibly expired but not yet purged) entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Cache key for a front-face preview.
    pub fn front_key(track_id: &str, background_color: Option<&str>) -> String {
        format!("card_front_{}_{}", track_id, background_color.unwrap_or("default"))
    }

    /// Cache key for a back-face preview.
    pub fn back_key(track_id: &str, year: i32, background_color: Option<&str>) -> String {
        format!("card_back_{}_{}_{}", track_id, year, background_color.unwrap_or("default"))
    }
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_miss_invokes_generator_once() {
        let cache = PreviewCache::new();
        let calls = AtomicUsize::new(0);

        let first = cache.get_or_create("k", || {
            calls.fetch_add(1, Ordering::SeqCst);
            vec![1, 2, 3]
        });
        let second = cache.get_or_create("k", || {
            calls.fetch_add(1, Ordering::SeqCst);
            vec![9, 9, 9]
        });

        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_keys_never_share_values() {
        let cache = PreviewCache::new();
        let white = cache.get_or_create(
            &PreviewCache::front_key("T1", Some("#FFFFFF")),
            || vec![1],
        );
        let black = cache.get_or_create(
            &PreviewCache::front_key("T1", Some("#000000")),
            || vec![2],
        );
        assert_ne!(white, black);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_year_is_part_of_back_key() {
        assert_ne!(
            PreviewCache::back_key("T1", 1999, Some("#FFFFFF")),
            PreviewCache::back_key("T1", 2000, Some("#FFFFFF"))
        );
    }

    #[test]
    fn test_missing_color_uses_default_marker() {
        assert_eq!(PreviewCache::front_key("T1", None), "card_front_T1_default");
    }

    #[test]
    fn test_sliding_expiry_evicts_idle_entries() {
        let cache = PreviewCache::with_config(PreviewCacheConfig {
            sliding_expiry: Duration::from_millis(20),
            absolute_expiry: Duration::from_secs(60),
        });

        cache.get_or_create("k", || vec![1]);
        std::thread::sleep(Duration::from_millis(40));
        let calls = AtomicUsize::new(0);
        cache.get_or_create("k", || {
            calls.fetch_add(1, Ordering::SeqCst);
            vec![2]
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hit_refreshes_sliding_window() {
        let cache = PreviewCache::with_config(PreviewCacheConfig {
            sliding_expiry: Duration::from_millis(60),
            absolute_expiry: Duration::from_secs(60),
        });

        cache.get_or_create("k", || vec![1]);
        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(25));
            let bytes = cache.get_or_create("k", || vec![2]);
            assert_eq!(bytes, vec![1], "hit within the sliding window must refresh it");
        }
    }

    #[test]
    fn test_try_get_or_create_does_not_cache_errors() {
        let cache = PreviewCache::new();

        let failed: crate::error::Result<Vec<u8>> =
            cache.try_get_or_create("k", || Err(crate::error::Error::NoCards));
        assert!(failed.is_err());
        assert!(cache.is_empty());

        let ok = cache.try_get_or_create("k", || Ok(vec![7])).unwrap();
        assert_eq!(ok, vec![7]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_absolute_expiry_wins_over_sliding() {
        let cache = PreviewCache::with_config(PreviewCacheConfig {
            sliding_expiry: Duration::from_secs(60),
            absolute_expiry: Duration::from_millis(30),
        });

        cache.get_or_create("k", || vec![1]);
        std::thread::sleep(Duration::from_millis(50));
        let bytes = cache.get_or_create("k", || vec![2]);
        assert_eq!(bytes, vec![2]);
    }
}
