//! Storage backend implementations

pub mod sled;

use crate::{error::Result, models::ConfigRecord};
use async_trait::async_trait;

/// Trait for config storage backends
///
/// Implementations must serialize concurrent writes and keep reads isolated
/// from in-flight writes; a record that fails to store must leave every other
/// record intact.
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    /// Initialize the backend
    async fn init(&self) -> Result<()>;

    /// Store a config record keyed by its service name
    async fn put_record(&self, record: &ConfigRecord) -> Result<()>;

    /// Get a record by service name
    async fn get_record(&self, name: &str) -> Result<Option<ConfigRecord>>;

    /// List all records, in backend iteration order
    async fn list_records(&self) -> Result<Vec<ConfigRecord>>;

    /// Remove a record, returning the previous value if any
    async fn remove_record(&self, name: &str) -> Result<Option<ConfigRecord>>;
}
