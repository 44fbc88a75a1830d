//! Time-bounded cache of generated feeds, keyed by page URL and selectors.

use crate::domain::model::SelectorSet;
use crate::utils::error::Result;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    stored_at: Instant,
}

pub struct FeedCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl FeedCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Hex SHA-256 of the page address followed by the selectors' JSON form.
    pub fn key(page: &str, selectors: &SelectorSet) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(page.as_bytes());
        hasher.update(serde_json::to_string(selectors)?.as_bytes());

        let digest = hasher.finalize();
        let mut key = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(key, "{:02x}", byte);
        }
        Ok(key)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.stored_at) < self.ttl => {
                Some(entry.body.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, body: String) {
        self.insert_at(key, body, Instant::now());
    }

    pub(crate) fn insert_at(&self, key: String, body: String, now: Instant) {
        let mut entries = self.entries.lock();
        let ttl = self.ttl;
        entries.retain(|_, entry| now.saturating_duration_since(entry.stored_at) < ttl);

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                tracing::debug!("feed cache full, evicting {}", oldest);
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                body,
                stored_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_depends_on_url_and_selectors() {
        let selectors = SelectorSet::default();
        let a = FeedCache::key("https://a.example/", &selectors).unwrap();
        let b = FeedCache::key("https://b.example/", &selectors).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);

        let custom = SelectorSet {
            item: ".post".to_string(),
            ..SelectorSet::default()
        };
        let c = FeedCache::key("https://a.example/", &custom).unwrap();
        assert_ne!(a, c);
        assert_eq!(
            a,
            FeedCache::key("https://a.example/", &SelectorSet::default()).unwrap()
        );
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let cache = FeedCache::new(Duration::from_secs(600), 8);
        let start = Instant::now();
        cache.insert_at("k".to_string(), "<rss/>".to_string(), start);

        assert_eq!(
            cache.get_at("k", start + Duration::from_secs(599)).as_deref(),
            Some("<rss/>")
        );
        assert_eq!(cache.get_at("k", start + Duration::from_secs(600)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = FeedCache::new(Duration::from_secs(600), 2);
        let start = Instant::now();
        cache.insert_at("a".to_string(), "1".to_string(), start);
        cache.insert_at("b".to_string(), "2".to_string(), start + Duration::from_secs(1));
        cache.insert_at("c".to_string(), "3".to_string(), start + Duration::from_secs(2));

        let now = start + Duration::from_secs(3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at("a", now), None);
        assert_eq!(cache.get_at("b", now).as_deref(), Some("2"));
        assert_eq!(cache.get_at("c", now).as_deref(), Some("3"));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = FeedCache::new(Duration::from_secs(600), 2);
        let start = Instant::now();
        cache.insert_at("a".to_string(), "1".to_string(), start);
        cache.insert_at("b".to_string(), "2".to_string(), start);
        cache.insert_at("a".to_string(), "1b".to_string(), start);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at("a", start).as_deref(), Some("1b"));
    }
}
