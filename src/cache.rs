//! Time-bounded store for normalized responses.
//!
//! The client takes any [`ResponseCache`], so tests can swap in a fake or a
//! zero-TTL store. Identical concurrent misses may both fetch; the API is
//! read-only, so that only costs a request.

use ahash::AHashMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::models::{NormalizedRecord, Params};

// Allow -, _, . unescaped (common in codes and ranges)
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Exact `(table id, params)` pair, in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(table_id: &str, params: &Params) -> Self {
        let enc = |s: &str| percent_encoding::utf8_percent_encode(s, SAFE).to_string();
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", enc(k), enc(v)))
            .collect::<Vec<_>>()
            .join("&");
        Self(format!("{}?{}", enc(table_id), query))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// get / set / expire over normalized records.
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Vec<NormalizedRecord>>;
    fn set(&self, key: CacheKey, records: Vec<NormalizedRecord>);
    fn expire(&self, key: &CacheKey);
}

/// Process-local cache; entries older than `ttl` are treated as absent.
#[derive(Debug)]
pub struct MemoryCache {
    ttl: Duration,
    entries: RwLock<AHashMap<CacheKey, (Instant, Vec<NormalizedRecord>)>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(AHashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, including ones that have gone stale but were
    /// not looked up since.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Drop `key` only if it is still stale once the write lock is held.
    fn remove_if_stale(&self, key: &CacheKey) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries
            .get(key)
            .is_some_and(|(stored, _)| stored.elapsed() >= self.ttl)
        {
            entries.remove(key);
        }
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Vec<NormalizedRecord>> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some((stored, records)) if stored.elapsed() < self.ttl => {
                    return Some(records.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        self.remove_if_stale(key);
        None
    }

    fn set(&self, key: CacheKey, records: Vec<NormalizedRecord>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, (Instant::now(), records));
    }

    fn expire(&self, key: &CacheKey) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl ResponseCache for NoCache {
    fn get(&self, _key: &CacheKey) -> Option<Vec<NormalizedRecord>> {
        None
    }

    fn set(&self, _key: CacheKey, _records: Vec<NormalizedRecord>) {}

    fn expire(&self, _key: &CacheKey) {}
}
