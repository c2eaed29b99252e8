use crate::backend::{ExpiringStore, ObjectCache};
use anyhow::Result;
use fjall::PartitionHandle;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Composite storage key for a (key, group) pair. NUL never appears in
/// cache keys or group names, so the encoding cannot collide.
fn composite_key(key: &str, group: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(group.len() + key.len() + 1);
    buf.extend_from_slice(group.as_bytes());
    buf.push(0);
    buf.extend_from_slice(key.as_bytes());
    buf
}

/// Object cache backed by one fjall partition.
pub struct FjallObjectCache {
    partition: PartitionHandle,
}

impl FjallObjectCache {
    pub fn new(partition: PartitionHandle) -> Self {
        Self { partition }
    }
}

impl ObjectCache for FjallObjectCache {
    fn get(&self, key: &str, group: &str) -> Result<Option<Vec<u8>>> {
        match self.partition.get(composite_key(key, group))? {
            Some(value) => {
                debug!("Cache HIT for key: {key} in group: {group}");
                Ok(Some(value.to_vec()))
            }
            None => {
                debug!("Cache MISS for key: {key} in group: {group}");
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, group: &str, value: &[u8]) -> Result<()> {
        self.partition.insert(composite_key(key, group), value)?;
        debug!("Cache SET for key: {key} in group: {group}");
        Ok(())
    }

    fn delete(&self, key: &str, group: &str) -> Result<bool> {
        let storage_key = composite_key(key, group);
        let existed = self.partition.contains_key(&storage_key)?;
        self.partition.remove(storage_key)?;
        debug!("Cache DELETE for key: {key} in group: {group} (removed: {existed})");
        Ok(existed)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredValue {
    value: Vec<u8>,
    expires_at: Option<SystemTime>,
}

/// Expiring-value store backed by one fjall partition. Expiry is checked
/// lazily on read, the way the in-memory store does it.
pub struct FjallExpiringStore {
    partition: PartitionHandle,
}

impl FjallExpiringStore {
    pub fn new(partition: PartitionHandle) -> Self {
        Self { partition }
    }
}

impl ExpiringStore for FjallExpiringStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(raw) = self.partition.get(key.as_bytes())? {
            let entry: StoredValue = serde_json::from_slice(&raw)?;
            if let Some(expires_at) = entry.expires_at {
                if SystemTime::now() > expires_at {
                    debug!("Expiring store entry expired for key: {key}");
                    self.partition.remove(key.as_bytes())?;
                    return Ok(None);
                }
            }
            debug!("Expiring store HIT for key: {key}");
            return Ok(Some(entry.value));
        }
        debug!("Expiring store MISS for key: {key}");
        Ok(None)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let entry = StoredValue {
            value: value.to_vec(),
            expires_at: Some(SystemTime::now() + ttl),
        };
        self.partition
            .insert(key.as_bytes(), serde_json::to_vec(&entry)?)?;
        debug!("Expiring store SET for key: {key}");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let existed = self.partition.contains_key(key.as_bytes())?;
        self.partition.remove(key.as_bytes())?;
        debug!("Expiring store DELETE for key: {key} (removed: {existed})");
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjall::PartitionCreateOptions;
    use tempfile::tempdir;

    fn open_partition(path: &std::path::Path, name: &str) -> PartitionHandle {
        let keyspace = fjall::Config::new(path).open().unwrap();
        keyspace
            .open_partition(name, PartitionCreateOptions::default())
            .unwrap()
    }

    #[test]
    fn test_object_cache_get_set_delete() {
        let dir = tempdir().unwrap();
        let cache = FjallObjectCache::new(open_partition(dir.path(), "object-cache"));

        assert!(cache.get("key1", "").unwrap().is_none());

        cache.set("key1", "", b"value").unwrap();
        assert_eq!(cache.get("key1", "").unwrap(), Some(b"value".to_vec()));

        // Same key in another group is a different slot
        assert!(cache.get("key1", "g").unwrap().is_none());

        assert!(cache.delete("key1", "").unwrap());
        assert!(cache.get("key1", "").unwrap().is_none());
        assert!(!cache.delete("key1", "").unwrap());
    }

    #[test]
    fn test_expiring_store_ttl() {
        let dir = tempdir().unwrap();
        let store = FjallExpiringStore::new(open_partition(dir.path(), "expiring"));

        store
            .set("key1", b"value", Duration::from_millis(10))
            .unwrap();
        assert_eq!(store.get("key1").unwrap(), Some(b"value".to_vec()));

        // Wait for TTL expiration
        std::thread::sleep(Duration::from_millis(20));
        assert!(store.get("key1").unwrap().is_none());
    }

    #[test]
    fn test_expiring_store_delete() {
        let dir = tempdir().unwrap();
        let store = FjallExpiringStore::new(open_partition(dir.path(), "expiring"));

        store
            .set("key1", b"value", Duration::from_secs(60))
            .unwrap();
        assert!(store.delete("key1").unwrap());
        assert!(store.get("key1").unwrap().is_none());
    }
}
