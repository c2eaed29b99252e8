pub mod backend;
pub mod collector;
pub mod core;
pub mod store;
pub mod sweeper;

pub use crate::collector::{Collector, CollectorEnv};
pub use crate::core::config::{AppConfig, CollectorConfig};
pub use crate::core::entry::{Backend, Entry, EntryId, EntrySet};
pub use crate::core::error::CollectorError;
pub use crate::core::subject::{Subject, SubjectKind};
pub use crate::sweeper::Sweeper;

use anyhow::{Context, Result};
use fjall::PartitionCreateOptions;
use std::sync::Arc;
use tracing::{debug, info};

/// Open the disk-backed environment described by the config: one fjall
/// keyspace with a partition per concern.
pub fn open_env(config: &AppConfig) -> Result<CollectorEnv> {
    let data_path = config.default_data_path()?;
    std::fs::create_dir_all(&data_path)
        .with_context(|| format!("Failed to create data directory: {}", data_path.display()))?;

    let keyspace = fjall::Config::new(&data_path)
        .open()
        .with_context(|| format!("Failed to open keyspace at {}", data_path.display()))?;

    let collections = keyspace.open_partition("collections", PartitionCreateOptions::default())?;
    let object_cache = keyspace.open_partition("object-cache", PartitionCreateOptions::default())?;
    let expiring = keyspace.open_partition("expiring", PartitionCreateOptions::default())?;
    debug!(data_path = %data_path.display(), "Opened collector environment");

    Ok(CollectorEnv {
        store: Arc::new(store::disk::FjallStore::new(collections)),
        object_cache: Arc::new(backend::disk::FjallObjectCache::new(object_cache)),
        expiring: Arc::new(backend::disk::FjallExpiringStore::new(expiring)),
        config: CollectorConfig::from(config),
    })
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

/// Purge one collection. Per-key backend failures are logged and never
/// fail the operation.
pub fn run_purge(collection: &str, config_path: Option<&str>) -> Result<()> {
    info!(collection, "Purging cache collection");

    let config = load_config(config_path)?;
    let env = open_env(&config)?;

    Collector::new(env, collection).purge();
    Ok(())
}

/// Run one sweep over all persisted collections.
pub fn run_cleanup(config_path: Option<&str>) -> Result<()> {
    info!("Cleaning up cache collections");

    let config = load_config(config_path)?;
    let env = open_env(&config)?;

    Sweeper::new(env).cleanup();
    Ok(())
}
