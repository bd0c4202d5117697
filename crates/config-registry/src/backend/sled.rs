//! Sled database backend for the config registry

use super::ConfigBackend;
use crate::{error::Result, models::ConfigRecord};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, error, info};

/// Name of the tree that holds all config records
const CONFIGS_TREE: &str = "configs";

/// Sled-based config backend
///
/// Keys are the UTF-8 service name, values the JSON encoding of the record.
/// The tree is created on first open, so a put never fails just because the
/// database is fresh.
pub struct SledBackend {
    /// Database instance
    db: sled::Db,
    /// Configs tree
    configs: sled::Tree,
}

impl SledBackend {
    /// Create a new sled backend
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure the directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening sled database at {:?}", path);

        let db = sled::open(path)?;
        let configs = db.open_tree(CONFIGS_TREE)?;

        Ok(Self { db, configs })
    }

    /// Create an in-memory sled backend (for testing)
    pub async fn in_memory() -> Result<Self> {
        info!("Creating in-memory sled database");

        let db = sled::Config::new().temporary(true).open()?;
        let configs = db.open_tree(CONFIGS_TREE)?;

        Ok(Self { db, configs })
    }
}

#[async_trait]
impl ConfigBackend for SledBackend {
    async fn init(&self) -> Result<()> {
        // Flush to ensure database is ready
        self.db.flush_async().await?;
        Ok(())
    }

    async fn put_record(&self, record: &ConfigRecord) -> Result<()> {
        debug!("Storing config: {}", record.service_name);

        let value = serde_json::to_vec(record)?;

        self.configs
            .insert(record.service_name.as_bytes(), value)?;

        // Flush to disk
        self.configs.flush_async().await?;

        Ok(())
    }

    async fn get_record(&self, name: &str) -> Result<Option<ConfigRecord>> {
        debug!("Getting config: {}", name);

        match self.configs.get(name.as_bytes())? {
            Some(bytes) => {
                let record: ConfigRecord = serde_json::from_slice(&bytes)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn list_records(&self) -> Result<Vec<ConfigRecord>> {
        debug!("Listing all configs");

        let mut records = Vec::new();

        for result in self.configs.iter() {
            let (_, value) = result?;
            let record: ConfigRecord = serde_json::from_slice(&value)?;
            records.push(record);
        }

        Ok(records)
    }

    async fn remove_record(&self, name: &str) -> Result<Option<ConfigRecord>> {
        debug!("Removing config: {}", name);

        let existing = self.get_record(name).await?;

        if existing.is_some() {
            self.configs.remove(name.as_bytes())?;

            // Flush to disk
            self.configs.flush_async().await?;
        }

        Ok(existing)
    }
}

impl Drop for SledBackend {
    fn drop(&mut self) {
        // Attempt to flush on drop
        if let Err(e) = self.db.flush() {
            error!("Failed to flush database on drop: {}", e);
        }
    }
}
