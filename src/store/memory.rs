use crate::core::entry::EntrySet;
use crate::store::{CollectionRecord, CollectionStore, decode_blob, encode_blob, storage_name};
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

/// In-memory collection store, used by tests and embedders that do not
/// need persistence across restarts. Stores the same encoded blobs as the
/// disk store so both exercise identical round-trip behavior.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw blob under a storage key, bypassing the codec. Lets
    /// tests plant undecodable records.
    pub fn insert_raw(&self, storage_key: &str, blob: Vec<u8>) {
        let mut records = self.inner.write().unwrap();
        records.insert(storage_key.to_string(), blob);
    }
}

impl CollectionStore for MemoryStore {
    fn load(&self, collection: &str) -> Result<Option<EntrySet>> {
        let records = self.inner.read().unwrap();
        let entries = records
            .get(&storage_name(collection))
            .and_then(|blob| decode_blob(blob))
            .map(|(_, entries)| entries);
        debug!(
            collection,
            found = entries.is_some(),
            "Loaded collection from memory store"
        );
        Ok(entries)
    }

    fn store(&self, collection: &str, entries: &EntrySet) -> Result<()> {
        let blob = encode_blob(collection, entries)?;
        let mut records = self.inner.write().unwrap();
        records.insert(storage_name(collection), blob);
        Ok(())
    }

    fn delete(&self, collection: &str) -> Result<()> {
        let mut records = self.inner.write().unwrap();
        records.remove(&storage_name(collection));
        Ok(())
    }

    fn list(&self, page: usize, page_size: usize) -> Result<Vec<CollectionRecord>> {
        let records = self.inner.read().unwrap();
        Ok(records
            .iter()
            .skip(page.saturating_sub(1) * page_size)
            .take(page_size)
            .map(|(storage_key, blob)| CollectionRecord {
                storage_key: storage_key.clone(),
                collection: decode_blob(blob).map(|(collection, _)| collection),
            })
            .collect())
    }

    fn delete_record(&self, storage_key: &str) -> Result<()> {
        let mut records = self.inner.write().unwrap();
        records.remove(storage_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::{Backend, EntryId};

    #[test]
    fn test_load_absent_collection() {
        let store = MemoryStore::new();
        assert!(store.load("missing").unwrap().is_none());
    }

    #[test]
    fn test_store_load_delete() {
        let store = MemoryStore::new();
        let mut entries = EntrySet::new();
        entries.touch(EntryId::new("k", ""), Backend::ObjectCache, 100);

        store.store("c", &entries).unwrap();
        assert_eq!(store.load("c").unwrap(), Some(entries));

        store.delete("c").unwrap();
        assert!(store.load("c").unwrap().is_none());
    }

    #[test]
    fn test_list_pages_in_order() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .store(&format!("c{i}"), &EntrySet::new())
                .unwrap();
        }

        let page1 = store.list(1, 2).unwrap();
        let page2 = store.list(2, 2).unwrap();
        let page3 = store.list(3, 2).unwrap();
        let page4 = store.list(4, 2).unwrap();

        assert_eq!(page1.len(), 2);
        assert_eq!(page2.len(), 2);
        assert_eq!(page3.len(), 1);
        assert!(page4.is_empty());

        let mut names: Vec<_> = [page1, page2, page3]
            .into_iter()
            .flatten()
            .filter_map(|record| record.collection)
            .collect();
        names.sort();
        assert_eq!(names, vec!["c0", "c1", "c2", "c3", "c4"]);
    }

    #[test]
    fn test_list_surfaces_unresolvable_records() {
        let store = MemoryStore::new();
        store.insert_raw("deadbeef", b"not json".to_vec());

        let records = store.list(1, 10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].storage_key, "deadbeef");
        assert!(records[0].collection.is_none());
    }
}
