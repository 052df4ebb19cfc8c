//! Bounded LRU path-resolution cache fronting the trie (spec §4.2).
//!
//! The original source declares this cache with no mutex at all
//! (§5, §9 — an open bug); here it's wrapped in a `std::sync::Mutex`
//! from the start, using the `lru` crate (as seen in the
//! `AlexFerroni02-rust-remote-fs` client, which fronts its own remote
//! lookups with `lru::LruCache`) instead of hand-rolling the
//! doubly-linked-list/hashmap pair the spec's §3 data model describes
//! — `lru::LruCache` already is that structure.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::handle::ServerHandle;

/// Thread-safe LRU cache from full path string to the server that
/// currently resolves it.
pub struct ResolutionCache {
    inner: Mutex<LruCache<String, Arc<ServerHandle>>>,
}

impl ResolutionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    /// On hit, moves the entry to MRU and returns its value.
    pub fn get(&self, path: &str) -> Option<Arc<ServerHandle>> {
        self.inner.lock().unwrap().get(path).cloned()
    }

    /// On hit, updates the value and promotes to MRU; on miss, inserts
    /// at MRU, evicting the LRU entry if the cache is full.
    pub fn put(&self, path: String, value: Arc<ServerHandle>) {
        self.inner.lock().unwrap().put(path, value);
    }

    /// Invalidates a single path. Used on trie mutation and, per
    /// REDESIGN FLAGS §9, on RENAME (both the old and new path keys).
    pub fn invalidate(&self, path: &str) {
        self.inner.lock().unwrap().pop(path);
    }

    /// Discards all entries.
    pub fn flush(&self) {
        self.inner.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn handle(id: u64) -> Arc<ServerHandle> {
        ServerHandle::new(id, Ipv4Addr::new(127, 0, 0, 1), 9000, 9001, 9002)
    }

    #[test]
    fn eviction_after_capacity_distinct_puts() {
        let cache = ResolutionCache::new(4);
        cache.put("/k".to_string(), handle(1));
        for i in 0..4 {
            cache.put(format!("/other{i}"), handle(2));
        }
        assert!(cache.get("/k").is_none());
    }

    #[test]
    fn get_between_puts_keeps_entry_alive() {
        let cache = ResolutionCache::new(4);
        cache.put("/k".to_string(), handle(1));
        for i in 0..4 {
            // touching /k between puts should keep it from being evicted
            assert!(cache.get("/k").is_some());
            cache.put(format!("/other{i}"), handle(2));
        }
        assert!(cache.get("/k").is_some());
    }

    #[test]
    fn invalidate_removes_single_entry() {
        let cache = ResolutionCache::new(4);
        cache.put("/k".to_string(), handle(1));
        cache.invalidate("/k");
        assert!(cache.get("/k").is_none());
    }
}
