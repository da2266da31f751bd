//! Process-local TTL cache. One instance per concern, constructed with an
//! explicit TTL; no module-level globals. Read-mostly, safe for concurrent
//! readers, and expired entries are evicted on the next read.

use std::time::{Duration, Instant};

use dashmap::DashMap;

pub struct TtlCache<V: Clone> {
    entries: DashMap<String, Entry<V>>,
    ttl: Duration,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let expired = {
            let entry = self.entries.get(key)?;
            if entry.expires_at > Instant::now() {
                return Some(entry.value.clone());
            }
            true
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: &str, value: V) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("k", 7u32);
        assert_eq!(cache.get("k"), Some(7));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = TtlCache::new(Duration::from_millis(5));
        cache.insert("k", 7u32);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_insert_refreshes_deadline() {
        let cache = TtlCache::new(Duration::from_millis(50));
        cache.insert("k", 1u32);
        std::thread::sleep(Duration::from_millis(30));
        cache.insert("k", 2u32);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k"), Some(2));
    }
}
