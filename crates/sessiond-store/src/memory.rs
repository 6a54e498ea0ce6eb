//! In-process [`CredentialStore`] backed by an ordered map.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

use crate::{CredentialStore, KeyValue, StoreError};

/// A credential store that lives in memory.
///
/// A `BTreeMap` keeps keys sorted, so prefix scans are a range walk
/// instead of a full scan.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with `pairs`.
    pub fn with_entries(pairs: impl IntoIterator<Item = KeyValue>) -> Self {
        Self {
            entries: RwLock::new(pairs.into_iter().collect()),
        }
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl CredentialStore for MemoryStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, pairs: Vec<KeyValue>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let count = pairs.len();
        entries.extend(pairs);
        tracing::debug!(count, "stored credential entries");
        Ok(())
    }

    async fn delete(&self, keys: Vec<Vec<u8>>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        for key in &keys {
            entries.remove(key);
        }
        tracing::debug!(count = keys.len(), "deleted credential entries");
        Ok(())
    }

    async fn scan(
        &self,
        prefix: &[u8],
        limit: usize,
    ) -> Result<Vec<KeyValue>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn update(
        &self,
        key: &[u8],
        value: Vec<u8>,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let mut entries = self.entries.write().await;
        let old = entries.get(key).cloned();
        if old.as_deref() != Some(value.as_slice()) {
            entries.insert(key.to_vec(), value);
        }
        Ok(old)
    }
}
