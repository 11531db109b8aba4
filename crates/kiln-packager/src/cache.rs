//! Process-lifetime cache of fetched manifests

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::address::CacheAddress;
use crate::manifest::Manifest;

/// Manifests keyed by cache address. Entries stay until invalidated.
#[derive(Debug, Default)]
pub struct ManifestCache {
    entries: RwLock<HashMap<CacheAddress, Arc<Manifest>>>,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &CacheAddress) -> Option<Arc<Manifest>> {
        self.entries.read().get(address).cloned()
    }

    pub fn insert(&self, address: CacheAddress, manifest: Arc<Manifest>) {
        self.entries.write().insert(address, manifest);
    }

    /// Removes one entry, returning whether it was present.
    pub fn invalidate(&self, address: &CacheAddress) -> bool {
        self.entries.write().remove(address).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::DependencySet;

    #[test]
    fn test_insert_invalidate_clear() {
        let cache = ManifestCache::new();
        let a = CacheAddress::new(&[("a", "1.0.0")].into_iter().collect::<DependencySet>(), 1);
        let b = CacheAddress::new(&[("b", "1.0.0")].into_iter().collect::<DependencySet>(), 1);

        cache.insert(a.clone(), Arc::new(Manifest::default()));
        cache.insert(b.clone(), Arc::new(Manifest::default()));
        assert!(cache.get(&a).is_some());

        assert!(cache.invalidate(&a));
        assert!(!cache.invalidate(&a));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
