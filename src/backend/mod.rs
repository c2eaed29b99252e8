pub mod disk;
pub mod memory;

use anyhow::Result;

/// Persistent key-value object cache, addressed by key and group.
///
/// `delete` returns whether a value was actually removed; callers treat a
/// `false` the same as a failed delete (the key is gone either way).
pub trait ObjectCache: Send + Sync {
    fn get(&self, key: &str, group: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, group: &str, value: &[u8]) -> Result<()>;
    fn delete(&self, key: &str, group: &str) -> Result<bool>;
}

/// Self-expiring value store, addressed by key only. Values past their
/// TTL read back as absent.
pub trait ExpiringStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8], ttl: std::time::Duration) -> Result<()>;
    fn delete(&self, key: &str) -> Result<bool>;
}
