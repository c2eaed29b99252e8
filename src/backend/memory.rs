use crate::backend::{ExpiringStore, ObjectCache};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

/// In-memory object cache implementation using HashMap and RwLock.
#[derive(Default)]
pub struct MemoryObjectCache {
    inner: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryObjectCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectCache for MemoryObjectCache {
    fn get(&self, key: &str, group: &str) -> Result<Option<Vec<u8>>> {
        let cache = self.inner.read().unwrap();
        let value = cache.get(&(key.to_string(), group.to_string())).cloned();
        if value.is_some() {
            debug!("Cache HIT for key: {key} in group: {group}");
        } else {
            debug!("Cache MISS for key: {key} in group: {group}");
        }
        Ok(value)
    }

    fn set(&self, key: &str, group: &str, value: &[u8]) -> Result<()> {
        let mut cache = self.inner.write().unwrap();
        debug!("Cache SET for key: {key} in group: {group}");
        cache.insert((key.to_string(), group.to_string()), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str, group: &str) -> Result<bool> {
        let mut cache = self.inner.write().unwrap();
        let removed = cache
            .remove(&(key.to_string(), group.to_string()))
            .is_some();
        debug!("Cache DELETE for key: {key} in group: {group} (removed: {removed})");
        Ok(removed)
    }
}

struct ExpiringValue {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// In-memory expiring-value store. Entries past their TTL read as absent.
#[derive(Default)]
pub struct MemoryExpiringStore {
    inner: RwLock<HashMap<String, ExpiringValue>>,
}

impl MemoryExpiringStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExpiringStore for MemoryExpiringStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.inner.read().unwrap();
        if let Some(entry) = store.get(key) {
            // Check if entry has expired
            if let Some(expiry) = entry.expires_at {
                if expiry < Instant::now() {
                    debug!("Expiring store entry expired for key: {key}");
                    return Ok(None);
                }
            }
            debug!("Expiring store HIT for key: {key}");
            return Ok(Some(entry.value.clone()));
        }
        debug!("Expiring store MISS for key: {key}");
        Ok(None)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut store = self.inner.write().unwrap();
        debug!("Expiring store SET for key: {key}");
        store.insert(
            key.to_string(),
            ExpiringValue {
                value: value.to_vec(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut store = self.inner.write().unwrap();
        let removed = store.remove(key).is_some();
        debug!("Expiring store DELETE for key: {key} (removed: {removed})");
        Ok(removed)
    }
}
