use crate::collector::{Collector, CollectorEnv};
use tracing::{debug, error, info, warn};

/// Periodic maintenance pass over every persisted collection.
///
/// Re-applies the collector's flush logic to each stored collection so
/// expired entries get pruned and emptied collections disappear. Never
/// purges: cleanup trims bookkeeping, it does not delete from cache
/// backends. Scheduling (typically daily) belongs to the host.
pub struct Sweeper {
    env: CollectorEnv,
}

impl Sweeper {
    pub fn new(env: CollectorEnv) -> Self {
        Self { env }
    }

    pub fn cleanup(&self) {
        let page_size = self.env.config.sweep_page_size;
        let page_limit = self.env.config.sweep_page_limit;
        let mut page = 1;
        let mut flushed = 0usize;
        let mut deleted = 0usize;

        loop {
            if page > page_limit {
                // No checkpoint is kept; the next scheduled run rescans
                // from the start.
                warn!(page_limit, "Reached page limit while sweeping cache collections");
                break;
            }

            let records = match self.env.store.list(page, page_size) {
                Ok(records) => records,
                Err(e) => {
                    error!(page, error = %e, "Failed to list cache collections");
                    break;
                }
            };

            if records.is_empty() {
                break;
            }

            for record in records {
                match record.collection {
                    Some(collection) => {
                        debug!(collection = %collection, "Sweeping cache collection");
                        Collector::new(self.env.clone(), collection).flush();
                        flushed += 1;
                    }
                    None => {
                        // Data integrity cleanup: a record we cannot map
                        // back to a collection name is useless.
                        warn!(
                            storage_key = %record.storage_key,
                            "Deleting cache collection record with no resolvable name"
                        );
                        if let Err(e) = self.env.store.delete_record(&record.storage_key) {
                            error!(storage_key = %record.storage_key, error = %e, "Failed to delete record");
                        }
                        deleted += 1;
                    }
                }
            }

            page += 1;
        }

        info!(flushed, deleted, "Finished sweeping cache collections");
    }
}
