//! In-memory cache tier.
//!
//! Maps an exact [`RequestSignature`] to the last successful result. Entries
//! never expire on their own; they live until [`VolatileTier::clear`] or the
//! end of the process.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use nearby_core::Timestamp;

use super::freshness::CacheEntry;
use super::key::RequestSignature;

#[derive(Debug)]
pub struct VolatileTier<T> {
    entries: RwLock<HashMap<RequestSignature, CacheEntry<T>>>,
}

impl<T> Default for VolatileTier<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Clone> VolatileTier<T> {
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are replaced whole, so a poisoned map still holds complete entries.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<RequestSignature, CacheEntry<T>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RequestSignature, CacheEntry<T>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Last result stored for `signature`.
    pub fn get(&self, signature: &RequestSignature) -> Option<CacheEntry<T>> {
        self.read().get(signature).cloned()
    }

    /// Replace the entry for `signature`.
    pub fn insert(&self, signature: RequestSignature, payload: T, updated_at: Timestamp) {
        let entry = CacheEntry::new(signature.as_str(), payload, updated_at);
        self.write().insert(signature, entry);
    }

    /// Drop the entry for `signature`, if any.
    pub fn remove(&self, signature: &RequestSignature) -> Option<CacheEntry<T>> {
        self.write().remove(signature)
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.write();
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nearby_core::Page;

    #[test]
    fn test_insert_replaces_whole_entry() {
        let tier = VolatileTier::new();
        let sig = RequestSignature::for_name("tacos", Page::default());
        let first = Utc::now();
        tier.insert(sig.clone(), vec!["a"], first);
        tier.insert(sig.clone(), vec!["b", "c"], first + chrono::Duration::seconds(1));

        let entry = tier.get(&sig).expect("entry should exist");
        assert_eq!(entry.payload, vec!["b", "c"]);
        assert_eq!(entry.key, sig.as_str());
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_clear() {
        let tier = VolatileTier::new();
        tier.insert(RequestSignature::for_name("a", Page::default()), 1, Utc::now());
        tier.insert(RequestSignature::for_name("b", Page::default()), 2, Utc::now());
        assert_eq!(tier.clear(), 2);
        assert!(tier.is_empty());
    }
}
