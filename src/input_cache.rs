//! Prefetch cache: reduces first-byte latency for the next track by reading
//! it into RAM ahead of time. One mutex guards all state; fills are driven
//! by whoever calls `get(create = true)`, matching the "single-flight per
//! URI" contract — a second caller for the same URI joins the same item
//! rather than opening it twice.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;

struct Item {
    bytes: Vec<u8>,
    lease_count: u32,
    last_access: u64,
}

struct State {
    items: HashMap<Utf8PathBuf, Item>,
    total_size: usize,
    clock: u64,
}

/// Bounded URI→bytes cache. `clock` is a logical tick supplied by the
/// caller on each touch rather than a wall-clock read, since `Instant::now`
/// is avoided at this layer to keep the cache deterministically testable.
pub struct InputCache {
    cap: usize,
    state: Mutex<State>,
}

/// A live reference to a cached item; dropping it releases the lease,
/// making the item eligible for eviction again once no other lease holds
/// it.
pub struct Lease {
    cache: Arc<InputCache>,
    uri: Utf8PathBuf,
}

impl Lease {
    pub fn bytes(&self) -> Vec<u8> {
        self.cache.state.lock().unwrap().items.get(&self.uri).map(|i| i.bytes.clone()).unwrap_or_default()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut state = self.cache.state.lock().unwrap();
        if let Some(item) = state.items.get_mut(&self.uri) {
            item.lease_count = item.lease_count.saturating_sub(1);
        }
    }
}

impl InputCache {
    pub fn new(cap: usize) -> Arc<Self> {
        Arc::new(Self { cap, state: Mutex::new(State { items: HashMap::new(), total_size: 0, clock: 0 }) })
    }

    pub fn contains(&self, uri: &Utf8PathBuf) -> bool {
        self.state.lock().unwrap().items.contains_key(uri)
    }

    pub fn total_size(&self) -> usize {
        self.state.lock().unwrap().total_size
    }

    /// `prefetch` is `get(create = true)` with the lease dropped immediately.
    pub fn prefetch(self: &Arc<Self>, uri: &Utf8PathBuf, fetch: impl FnOnce() -> Vec<u8>) {
        self.get(uri, true, fetch);
    }

    /// If present, touches it to MRU and returns a lease. If absent and
    /// `create`, calls `fetch` (standing in for the real async fill the I/O
    /// thread would perform) and inserts the result, evicting LRU
    /// unleashed items as needed to stay within `cap`. Returns `None` if
    /// `create` is false and the item is absent, or if no room could be
    /// freed for a new item.
    pub fn get(
        self: &Arc<Self>,
        uri: &Utf8PathBuf,
        create: bool,
        fetch: impl FnOnce() -> Vec<u8>,
    ) -> Option<Lease> {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let tick = state.clock;
        if let Some(item) = state.items.get_mut(uri) {
            item.last_access = tick;
            item.lease_count += 1;
            return Some(Lease { cache: Arc::clone(self), uri: uri.clone() });
        }
        if !create {
            return None;
        }
        drop(state);
        let bytes = fetch();
        let size = bytes.len();

        let mut state = self.state.lock().unwrap();
        if !Self::make_room(&mut state, size, self.cap) {
            return None;
        }
        state.clock += 1;
        let tick = state.clock;
        state.total_size += size;
        state.items.insert(uri.clone(), Item { bytes, lease_count: 1, last_access: tick });
        Some(Lease { cache: Arc::clone(self), uri: uri.clone() })
    }

    fn make_room(state: &mut State, incoming: usize, cap: usize) -> bool {
        while state.total_size + incoming > cap {
            let victim = state
                .items
                .iter()
                .filter(|(_, item)| item.lease_count == 0)
                .min_by_key(|(_, item)| item.last_access)
                .map(|(uri, _)| uri.clone());
            match victim {
                Some(uri) => {
                    if let Some(item) = state.items.remove(&uri) {
                        state.total_size -= item.bytes.len();
                    }
                }
                None => return false,
            }
        }
        true
    }

    /// Evicts every item with `lease_count == 0`.
    pub fn flush(&self) {
        let mut state = self.state.lock().unwrap();
        let stale: Vec<_> = state
            .items
            .iter()
            .filter(|(_, i)| i.lease_count == 0)
            .map(|(uri, _)| uri.clone())
            .collect();
        for uri in stale {
            if let Some(item) = state.items.remove(&uri) {
                state.total_size -= item.bytes.len();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(s)
    }

    #[test]
    fn total_size_matches_sum_of_items() {
        let cache = InputCache::new(1024);
        let _a = cache.get(&uri("a"), true, || vec![0u8; 100]).unwrap();
        let _b = cache.get(&uri("b"), true, || vec![0u8; 200]).unwrap();
        assert_eq!(cache.total_size(), 300);
    }

    #[test]
    fn leased_item_survives_eviction_pressure() {
        let cache = InputCache::new(150);
        let lease_a = cache.get(&uri("a"), true, || vec![0u8; 100]).unwrap();
        // b cannot fit alongside a's lease; allocation fails rather than
        // evicting a leased item.
        assert!(cache.get(&uri("b"), true, || vec![0u8; 100]).is_none());
        drop(lease_a);
        assert!(cache.get(&uri("b"), true, || vec![0u8; 100]).is_some());
    }

    #[test]
    fn second_caller_for_same_uri_joins_without_refetching() {
        let cache = InputCache::new(1024);
        let calls = std::sync::atomic::AtomicU32::new(0);
        let fetch = || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            vec![1, 2, 3]
        };
        let _a = cache.get(&uri("a"), true, fetch).unwrap();
        let _b = cache.get(&uri("a"), true, || vec![9, 9, 9]).unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn flush_clears_only_unleased_items() {
        let cache = InputCache::new(1024);
        let held = cache.get(&uri("held"), true, || vec![0u8; 10]).unwrap();
        cache.get(&uri("free"), true, || vec![0u8; 10]).map(drop);
        cache.flush();
        assert!(cache.contains(&uri("held")));
        assert!(!cache.contains(&uri("free")));
        drop(held);
    }
}
