use crate::core::entry::EntrySet;
use crate::store::{CollectionRecord, CollectionStore, decode_blob, encode_blob, storage_name};
use anyhow::Result;
use fjall::PartitionHandle;
use tracing::debug;

/// Collection store backed by one fjall partition. Blobs live under the
/// hashed storage name; enumeration walks the partition in key order.
pub struct FjallStore {
    partition: PartitionHandle,
}

impl FjallStore {
    pub fn new(partition: PartitionHandle) -> Self {
        Self { partition }
    }
}

impl CollectionStore for FjallStore {
    fn load(&self, collection: &str) -> Result<Option<EntrySet>> {
        let entries = self
            .partition
            .get(storage_name(collection).as_bytes())?
            .and_then(|blob| decode_blob(&blob))
            .map(|(_, entries)| entries);
        debug!(
            collection,
            found = entries.is_some(),
            "Loaded collection from disk store"
        );
        Ok(entries)
    }

    fn store(&self, collection: &str, entries: &EntrySet) -> Result<()> {
        let blob = encode_blob(collection, entries)?;
        self.partition
            .insert(storage_name(collection).as_bytes(), blob)?;
        Ok(())
    }

    fn delete(&self, collection: &str) -> Result<()> {
        self.partition
            .remove(storage_name(collection).as_bytes())?;
        Ok(())
    }

    fn list(&self, page: usize, page_size: usize) -> Result<Vec<CollectionRecord>> {
        let mut records = Vec::new();
        for kv in self
            .partition
            .iter()
            .skip(page.saturating_sub(1) * page_size)
            .take(page_size)
        {
            let (key, blob) = kv?;
            records.push(CollectionRecord {
                storage_key: String::from_utf8_lossy(&key).into_owned(),
                collection: decode_blob(&blob).map(|(collection, _)| collection),
            });
        }
        Ok(records)
    }

    fn delete_record(&self, storage_key: &str) -> Result<()> {
        self.partition.remove(storage_key.as_bytes())?;
        Ok(())
    }
}
