//! Content cache for extraction results.
//!
//! Keyed by content, so re-uploading identical bytes skips the cascade.
//! Entries expire after a TTL; at capacity the oldest insert is evicted.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use docgrid_core::ExtractionUnit;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// Bytes of the document prefix that feed the key.
pub const KEY_PREFIX_BYTES: usize = 8192;

/// Key for a document: SHA-256 over the first 8 KiB and the total length.
pub fn content_key(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&bytes[..bytes.len().min(KEY_PREFIX_BYTES)]);
    hasher.update((bytes.len() as u64).to_le_bytes());
    hex::encode(hasher.finalize())
}

struct CacheEntry {
    units: Vec<ExtractionUnit>,
    inserted_at: Instant,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first.
    order: Vec<String>,
    capacity: usize,
    ttl: Duration,
}

/// Thread-safe TTL cache of extraction units.
pub struct ContentCache {
    inner: Mutex<CacheInner>,
}

impl ContentCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(capacity),
                order: Vec::with_capacity(capacity),
                capacity,
                ttl,
            }),
        }
    }

    /// Units for `key`, unless missing or expired. Expired entries are dropped.
    pub fn get(&self, key: &str) -> Option<Vec<ExtractionUnit>> {
        let mut inner = self.inner.lock();

        let expired = inner
            .entries
            .get(key)
            .map(|e| e.inserted_at.elapsed() >= inner.ttl)?;

        if expired {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
            return None;
        }
        inner.entries.get(key).map(|e| e.units.clone())
    }

    /// Store units under `key`. Empty lists are not cached.
    pub fn put(&self, key: String, units: Vec<ExtractionUnit>) {
        if units.is_empty() {
            return;
        }
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        } else {
            while inner.entries.len() >= inner.capacity && !inner.order.is_empty() {
                let oldest = inner.order.remove(0);
                inner.entries.remove(&oldest);
            }
        }

        inner.order.push(key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                units,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}
