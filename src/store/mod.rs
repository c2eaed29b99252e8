pub mod disk;
pub mod memory;

use crate::core::entry::{Entry, EntrySet};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One stored collection record as seen by the sweeper. A record whose
/// blob does not decode carries no resolvable collection name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRecord {
    pub storage_key: String,
    pub collection: Option<String>,
}

/// Persistence contract for collection entry sets.
///
/// One blob per collection, stored under `storage_name(collection)`. There
/// is no optimistic concurrency check: flush/purge perform a plain
/// read-modify-write and the last writer wins.
pub trait CollectionStore: Send + Sync {
    fn load(&self, collection: &str) -> Result<Option<EntrySet>>;
    fn store(&self, collection: &str, entries: &EntrySet) -> Result<()>;
    fn delete(&self, collection: &str) -> Result<()>;
    /// Pages through stored records in storage-key order. Pages start at 1;
    /// an empty page means the end was reached.
    fn list(&self, page: usize, page_size: usize) -> Result<Vec<CollectionRecord>>;
    /// Remove a record by its raw storage key, bypassing name resolution.
    fn delete_record(&self, storage_key: &str) -> Result<()>;
}

/// Storage key for a collection: hex SHA-256 of its name. The name itself
/// travels inside the blob so records stay resolvable when enumerated.
pub fn storage_name(collection: &str) -> String {
    hex::encode(Sha256::digest(collection.as_bytes()))
}

#[derive(Serialize, Deserialize)]
struct StoredCollection {
    collection: String,
    entries: Vec<Entry>,
}

pub(crate) fn encode_blob(collection: &str, entries: &EntrySet) -> Result<Vec<u8>> {
    let stored = StoredCollection {
        collection: collection.to_string(),
        entries: entries.clone().into(),
    };
    Ok(serde_json::to_vec(&stored)?)
}

pub(crate) fn decode_blob(blob: &[u8]) -> Option<(String, EntrySet)> {
    serde_json::from_slice::<StoredCollection>(blob)
        .ok()
        .map(|stored| (stored.collection, EntrySet::from(stored.entries)))
}
