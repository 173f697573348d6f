//! Bounded, TTL'd cache for keyword search results
//!
//! Keyword searches repeat heavily across scoring passes for the same
//! issue, so hit lists are cached per keyword. Entries expire after a TTL;
//! when the cache is full the oldest entry by insertion timestamp is
//! evicted. All access goes through an internal lock.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::search::SearchHit;

#[derive(Debug, Clone)]
struct CacheEntry {
    hits: Vec<SearchHit>,
    inserted_at: Instant,
}

/// Keyword → hit-list cache.
#[derive(Debug)]
pub struct SearchCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    capacity: usize,
    ttl: Duration,
}

impl SearchCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Cached hits for a keyword, unless the entry has expired.
    pub fn get(&self, keyword: &str) -> Option<Vec<SearchHit>> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(keyword) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => Some(entry.hits.clone()),
            Some(_) => {
                entries.remove(keyword);
                None
            }
            None => None,
        }
    }

    /// Insert a hit list, evicting the oldest entry when at capacity.
    pub fn insert(&self, keyword: impl Into<String>, hits: Vec<SearchHit>) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        let keyword = keyword.into();
        if entries.len() >= self.capacity && !entries.contains_key(&keyword) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            keyword,
            CacheEntry {
                hits,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
