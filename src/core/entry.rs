use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Current unix timestamp in seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Cache backend that owns a tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Persistent key-value object cache, addressed by key and group.
    ObjectCache,
    /// Self-expiring value store, addressed by key only.
    ExpiringStore,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::ObjectCache => write!(f, "object_cache"),
            Backend::ExpiringStore => write!(f, "expiring_store"),
        }
    }
}

/// Identity of a tracked cache entry.
///
/// The empty group is a real group, not "no group": `(k, "")` and
/// `(k, "g")` are distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId {
    pub key: String,
    pub group: String,
}

impl EntryId {
    pub fn new(key: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            group: group.into(),
        }
    }
}

/// Mutable attributes of a tracked entry. Not part of its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    /// Absolute expiry in unix seconds. Zero means no expiry.
    pub expires_at: i64,
    pub backend: Backend,
}

impl EntryMeta {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at != 0 && self.expires_at < now
    }
}

/// One tracked cache entry in its persisted, flattened form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub group: String,
    pub backend: Backend,
    pub expires_at: i64,
}

impl Entry {
    pub fn id(&self) -> EntryId {
        EntryId::new(self.key.clone(), self.group.clone())
    }
}

/// The set of entries tracked for one collection, keyed by `(key, group)`.
///
/// Serializes as a flat list of entries; the map form guarantees there is
/// never more than one entry per identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Entry>", into = "Vec<Entry>")]
pub struct EntrySet {
    entries: BTreeMap<EntryId, EntryMeta>,
}

impl EntrySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &EntryId) -> Option<&EntryMeta> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntryId, &EntryMeta)> {
        self.entries.iter()
    }

    pub fn insert(&mut self, id: EntryId, meta: EntryMeta) {
        self.entries.insert(id, meta);
    }

    pub fn remove(&mut self, id: &EntryId) -> Option<EntryMeta> {
        self.entries.remove(id)
    }

    /// Register or refresh an identity.
    ///
    /// An existing entry keeps its stored backend and only has its expiry
    /// pushed forward; a new identity is inserted with the given backend.
    pub fn touch(&mut self, id: EntryId, backend: Backend, expires_at: i64) {
        self.entries
            .entry(id)
            .and_modify(|meta| meta.expires_at = expires_at)
            .or_insert(EntryMeta {
                expires_at,
                backend,
            });
    }

    /// Drop every entry whose expiry is set and in the past. Returns the
    /// number of entries removed.
    pub fn prune(&mut self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, meta| !meta.is_expired(now));
        before - self.entries.len()
    }
}

impl From<Vec<Entry>> for EntrySet {
    fn from(entries: Vec<Entry>) -> Self {
        let mut set = EntrySet::new();
        for entry in entries {
            let meta = EntryMeta {
                expires_at: entry.expires_at,
                backend: entry.backend,
            };
            set.insert(entry.id(), meta);
        }
        set
    }
}

impl From<EntrySet> for Vec<Entry> {
    fn from(set: EntrySet) -> Self {
        set.entries
            .into_iter()
            .map(|(id, meta)| Entry {
                key: id.key,
                group: id.group,
                backend: meta.backend,
                expires_at: meta.expires_at,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_is_idempotent_per_identity() {
        let mut set = EntrySet::new();
        set.touch(EntryId::new("k", ""), Backend::ObjectCache, 100);
        set.touch(EntryId::new("k", ""), Backend::ObjectCache, 200);

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&EntryId::new("k", "")).unwrap().expires_at, 200);
    }

    #[test]
    fn test_touch_keeps_stored_backend() {
        let mut set = EntrySet::new();
        set.touch(EntryId::new("k", ""), Backend::ExpiringStore, 100);
        set.touch(EntryId::new("k", ""), Backend::ObjectCache, 200);

        let meta = set.get(&EntryId::new("k", "")).unwrap();
        assert_eq!(meta.backend, Backend::ExpiringStore);
        assert_eq!(meta.expires_at, 200);
    }

    #[test]
    fn test_empty_group_is_distinct_from_named_group() {
        let mut set = EntrySet::new();
        set.touch(EntryId::new("k", ""), Backend::ObjectCache, 100);
        set.touch(EntryId::new("k", "g"), Backend::ObjectCache, 100);

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_prune_removes_only_expired() {
        let mut set = EntrySet::new();
        set.touch(EntryId::new("expired", ""), Backend::ObjectCache, 50);
        set.touch(EntryId::new("live", ""), Backend::ObjectCache, 150);
        set.touch(EntryId::new("no-expiry", ""), Backend::ObjectCache, 0);

        let removed = set.prune(100);

        assert_eq!(removed, 1);
        assert!(!set.contains(&EntryId::new("expired", "")));
        assert!(set.contains(&EntryId::new("live", "")));
        assert!(set.contains(&EntryId::new("no-expiry", "")));
    }

    #[test]
    fn test_serde_round_trip_as_entry_list() {
        let mut set = EntrySet::new();
        set.touch(EntryId::new("k1", ""), Backend::ObjectCache, 100);
        set.touch(EntryId::new("k2", "g"), Backend::ExpiringStore, 200);

        let json = serde_json::to_string(&set).unwrap();
        let restored: EntrySet = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, set);
    }

    #[test]
    fn test_deserialize_dedups_identities() {
        let json = r#"[
            {"key": "k", "group": "", "backend": "object_cache", "expires_at": 100},
            {"key": "k", "group": "", "backend": "object_cache", "expires_at": 200}
        ]"#;

        let set: EntrySet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&EntryId::new("k", "")).unwrap().expires_at, 200);
    }
}
