//! In-memory store.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use super::{KeyValueStore, Namespace, StoreError};

/// A volatile store for tests and embedders without a filesystem
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<HashMap<Namespace, BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, namespace: Namespace, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .namespaces
            .read()
            .get(&namespace)
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn put(&self, namespace: Namespace, key: &str, value: &str) -> Result<(), StoreError> {
        self.namespaces
            .write()
            .entry(namespace)
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, namespace: Namespace, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .namespaces
            .write()
            .get_mut(&namespace)
            .and_then(|entries| entries.remove(key))
            .is_some())
    }

    fn clear(&self, namespace: Namespace) -> Result<usize, StoreError> {
        Ok(self
            .namespaces
            .write()
            .remove(&namespace)
            .map(|entries| entries.len())
            .unwrap_or(0))
    }

    fn entries(&self, namespace: Namespace) -> Result<Vec<(String, String)>, StoreError> {
        Ok(self
            .namespaces
            .read()
            .get(&namespace)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
