//! Bookkeeping of the cache keys a repository has issued.

use std::collections::HashMap;

use super::ReadRequest;

/// Every key a cached repository has handed out, with the read behind it.
///
/// This is the invalidation scope: a write makes every recorded key stale.
/// Keys are never forgotten, so a key invalidated by one write is
/// repopulated and invalidated again by the next.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    keys: HashMap<String, ReadRequest>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key`. Returns true if it was not known before.
    pub fn record(&mut self, key: &str, request: &ReadRequest) -> bool {
        if self.keys.contains_key(key) {
            return false;
        }
        self.keys.insert(key.to_string(), request.clone());
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ReadRequest> {
        self.keys.get(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Recorded keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keys.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copies out every key with its read so the caller can work on them
    /// without holding a lock on the registry.
    pub fn snapshot(&self) -> Vec<(String, ReadRequest)> {
        let mut entries: Vec<(String, ReadRequest)> = self
            .keys
            .iter()
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::cache_key;
    use crate::query::Query;
    use crate::storage::PageRequest;

    #[test]
    fn test_record_is_idempotent() {
        let mut registry = KeyRegistry::new();
        let request = ReadRequest::by_id(3);
        let key = cache_key("tools", &request);

        assert!(registry.record(&key, &request));
        assert!(!registry.record(&key, &request));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&key), Some(&request));
    }

    #[test]
    fn test_snapshot_is_sorted_and_complete() {
        let mut registry = KeyRegistry::new();
        let requests = [
            ReadRequest::paged(Query::all(), PageRequest::new(1, 10)),
            ReadRequest::by_id(3),
            ReadRequest::all(Query::all()),
        ];
        for request in &requests {
            registry.record(&cache_key("tools", request), request);
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 3);
        let keys: Vec<_> = snapshot.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, registry.keys());
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_empty_registry() {
        let registry = KeyRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains("tools:GetById:id=1"));
        assert!(registry.snapshot().is_empty());
    }
}
