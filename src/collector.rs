use crate::backend::{ExpiringStore, ObjectCache};
use crate::core::config::CollectorConfig;
use crate::core::entry::{Backend, EntryId, EntrySet, unix_now};
use crate::core::error::CollectorError;
use crate::core::subject::{Subject, SubjectKind};
use crate::store::CollectionStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared collaborators handed to every collector and the sweeper,
/// constructed once at startup.
#[derive(Clone)]
pub struct CollectorEnv {
    pub store: Arc<dyn CollectionStore>,
    pub object_cache: Arc<dyn ObjectCache>,
    pub expiring: Arc<dyn ExpiringStore>,
    pub config: CollectorConfig,
}

/// Collects cache keys for one named collection so they can be purged
/// together later.
///
/// `register` only touches the in-memory pending buffer; `flush` merges it
/// into the persisted entry set, pruning expired entries along the way.
/// A collector dropped with unflushed registrations flushes itself so
/// nothing is silently lost.
pub struct Collector {
    collection: String,
    env: CollectorEnv,
    pending: BTreeMap<EntryId, Backend>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("collection", &self.collection)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Collector {
    /// Bind to a collection name. Performs no I/O.
    pub fn new(env: CollectorEnv, collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            env,
            pending: BTreeMap::new(),
        }
    }

    /// Bind to the collection of a content subject, e.g. `post-42`.
    pub fn for_subject(
        env: CollectorEnv,
        kind: SubjectKind,
        id: u64,
    ) -> Result<Self, CollectorError> {
        let subject = Subject::new(kind, id)?;
        Ok(Self::new(env, subject.collection_name()))
    }

    /// Purge a subject's collection if it was modified recently enough.
    ///
    /// Subjects older than the update threshold are skipped: their cache
    /// entries are assumed already cold under their own TTLs.
    pub fn on_subject_update(
        env: &CollectorEnv,
        kind: SubjectKind,
        id: u64,
        modified_at: DateTime<Utc>,
    ) -> Result<(), CollectorError> {
        let threshold = i64::try_from(env.config.update_threshold.as_secs()).unwrap_or(i64::MAX);

        if modified_at.timestamp() >= unix_now().saturating_sub(threshold) {
            Self::for_subject(env.clone(), kind, id)?.purge();
        } else {
            debug!(%kind, id, "Subject older than update threshold, skipping purge");
        }

        Ok(())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Add a cache key to the pending buffer. Re-registering the same
    /// `(key, group)` overwrites the backend; no I/O happens until flush.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        group: impl Into<String>,
        backend: Backend,
    ) -> &mut Self {
        self.pending.insert(EntryId::new(key, group), backend);
        self
    }

    /// Merge pending registrations into the persisted entry set.
    ///
    /// Expired entries are pruned, every pending identity gets
    /// `now + default_ttl` as its new expiry, and the result is written
    /// back in a single store call. An entry set left empty after pruning
    /// has its blob deleted instead of being written as an empty map.
    /// Persistence failures are logged and swallowed; the previous state
    /// stays visible on the next load. A failed load aborts the flush
    /// outright, keeping the pending buffer for a later retry.
    pub fn flush(&mut self) -> &mut Self {
        let now = unix_now();
        let (mut entries, existed) = match self.load_entries() {
            Ok(Some(entries)) => (entries, true),
            Ok(None) => (EntrySet::new(), false),
            Err(e) => {
                // Merging into a set rebuilt from the pending buffer alone
                // would discard every previously tracked key. Abort and keep
                // the buffer for a later retry.
                error!(
                    collection = %self.collection,
                    error = %e,
                    "Failed to load cache collection, keeping pending registrations"
                );
                return self;
            }
        };

        let pruned = entries.prune(now);
        let ttl = i64::try_from(self.env.config.default_ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl);

        let pending = std::mem::take(&mut self.pending);
        let registered = pending.len();
        for (id, backend) in pending {
            entries.touch(id, backend, expires_at);
        }

        if entries.is_empty() {
            if existed {
                match self.env.store.delete(&self.collection) {
                    Ok(()) => {
                        info!(collection = %self.collection, "Deleted empty cache collection")
                    }
                    Err(e) => {
                        error!(collection = %self.collection, error = %e, "Failed to delete cache collection")
                    }
                }
            }
        } else {
            match self.env.store.store(&self.collection, &entries) {
                Ok(()) => info!(
                    collection = %self.collection,
                    entries = entries.len(),
                    registered,
                    pruned,
                    "Saved cache collection"
                ),
                Err(e) => {
                    error!(collection = %self.collection, error = %e, "Failed to save cache collection")
                }
            }
        }

        self
    }

    /// Read-only snapshot of the persisted entry set. Does not consult or
    /// clear the pending buffer.
    pub fn keys(&self) -> EntrySet {
        match self.load_entries() {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                error!(collection = %self.collection, error = %e, "Failed to load cache collection");
                EntrySet::new()
            }
        }
    }

    /// Delete every live entry of this collection from its backend.
    ///
    /// Expired entries are dropped from bookkeeping without a backend
    /// call. A failed backend delete is logged and the entry is dropped
    /// anyway: the key being gone is the outcome that matters. Purging an
    /// already-empty collection is a no-op and rewrites nothing.
    pub fn purge(&mut self) -> &mut Self {
        let now = unix_now();
        let entries = match self.load_entries() {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                info!(collection = %self.collection, "No keys to purge");
                return self;
            }
            Err(e) => {
                error!(
                    collection = %self.collection,
                    error = %e,
                    "Failed to load cache collection, skipping purge"
                );
                return self;
            }
        };

        if entries.is_empty() {
            info!(collection = %self.collection, "No keys to purge");
            return self;
        }

        let mut purged = 0usize;
        let mut failed = 0usize;
        let mut expired = 0usize;

        for (id, meta) in entries.iter() {
            if meta.is_expired(now) {
                expired += 1;
                debug!(key = %id.key, group = %id.group, "Skipping expired cache key");
                continue;
            }

            let deleted = match meta.backend {
                Backend::ObjectCache => self.env.object_cache.delete(&id.key, &id.group),
                Backend::ExpiringStore => self.env.expiring.delete(&id.key),
            };

            match deleted {
                Ok(true) => {
                    purged += 1;
                    debug!(
                        key = %id.key,
                        group = %id.group,
                        backend = %meta.backend,
                        "Purged cache key"
                    );
                }
                Ok(false) => {
                    failed += 1;
                    debug!(
                        key = %id.key,
                        group = %id.group,
                        backend = %meta.backend,
                        "Failed to purge cache key"
                    );
                }
                Err(e) => {
                    failed += 1;
                    debug!(
                        key = %id.key,
                        group = %id.group,
                        backend = %meta.backend,
                        error = %e,
                        "Failed to purge cache key"
                    );
                }
            }
        }

        // Every processed entry leaves bookkeeping, so the blob goes away.
        if let Err(e) = self.env.store.delete(&self.collection) {
            error!(collection = %self.collection, error = %e, "Failed to delete cache collection");
        }

        info!(
            collection = %self.collection,
            purged,
            failed,
            expired,
            "Purged cache collection"
        );

        self
    }

    fn load_entries(&self) -> Result<Option<EntrySet>> {
        self.env.store.load(&self.collection)
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                collection = %self.collection,
                pending = self.pending.len(),
                "Collector dropped with pending registrations, flushing"
            );
            self.flush();
        }
    }
}
