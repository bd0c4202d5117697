//! Core registry manager implementation

use crate::{
    backend::ConfigBackend,
    backend::sled::SledBackend,
    error::{Error, Result},
    models::ConfigRecord,
};
use futures::io::{AsyncWrite, AsyncWriteExt};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Timeout for fetching a bulk-import source
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Config registry with pluggable backend
///
/// Owns the persistent store handle for its whole lifetime and tracks whether
/// agents still have to be told about a change via the reload flag. All
/// mutating operations set the flag; the change notifier clears it once every
/// agent has been reached.
pub struct Registry {
    /// Storage backend
    backend: Arc<Box<dyn ConfigBackend>>,
    /// Set by successful mutations, cleared by a fully delivered nudge cycle
    needs_reload: Arc<AtomicBool>,
    /// Client for fetching bulk-import sources
    http: reqwest::Client,
}

impl Registry {
    /// Create a registry with an in-memory sled backend (for testing)
    pub async fn in_memory() -> Result<Self> {
        let backend = SledBackend::in_memory().await?;
        Self::with_backend(Box::new(backend))
    }

    /// Open a registry backed by a persistent sled database
    ///
    /// Creates the database on first use. Failure here is fatal to startup;
    /// there is no registry without its store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening registry at {:?}", path);

        let backend = SledBackend::new(path).await?;
        backend.init().await?;

        Self::with_backend(Box::new(backend))
    }

    /// Create a registry with a custom backend
    pub fn with_backend(backend: Box<dyn ConfigBackend>) -> Result<Self> {
        Ok(Self {
            backend: Arc::new(backend),
            needs_reload: Arc::new(AtomicBool::new(false)),
            http: reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?,
        })
    }

    /// Get the record stored for a service
    ///
    /// A name that was never stored is reported as [`Error::NotFound`],
    /// including on a freshly created store.
    pub async fn get(&self, name: &str) -> Result<ConfigRecord> {
        self.backend
            .get_record(name)
            .await?
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Store a record, overwriting any record with the same service name
    ///
    /// Transports are expected to have validated the service name already;
    /// an empty name is still rejected here so it can never reach the store.
    pub async fn add(&self, record: ConfigRecord) -> Result<()> {
        if record.service_name.trim().is_empty() {
            return Err(Error::Validation(
                "service name cannot be empty".to_string(),
            ));
        }

        info!("Adding config for service: {}", record.service_name);

        self.backend.put_record(&record).await?;
        self.needs_reload.store(true, Ordering::SeqCst);

        Ok(())
    }

    /// Remove the record for a service
    ///
    /// Removing a name that is not stored is a successful no-op.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let removed = self.backend.remove_record(name).await?;
        if removed.is_some() {
            info!("Removed config for service: {}", name);
        } else {
            debug!("Delete of unknown service: {}", name);
        }

        self.needs_reload.store(true, Ordering::SeqCst);

        Ok(())
    }

    /// Merge a partial record into the stored record for a service
    ///
    /// Fails with [`Error::NotFound`] when the service has no stored record,
    /// leaving the registry unchanged. The merged record is written back as a
    /// single key overwrite, so a crash mid-update cannot lose the record.
    pub async fn update(&self, name: &str, partial: &ConfigRecord) -> Result<()> {
        let current = self.get(name).await?;
        let merged = current.merge_from(partial);

        info!("Updating config for service: {}", name);

        self.backend.put_record(&merged).await?;
        self.needs_reload.store(true, Ordering::SeqCst);

        Ok(())
    }

    /// List every stored record, in backend iteration order
    ///
    /// The order is unspecified; callers must not assume sorted or insertion
    /// order. A malformed stored record aborts the listing.
    pub async fn list(&self) -> Result<Vec<ConfigRecord>> {
        self.backend.list_records().await
    }

    /// Stream every record to `sink` as line-delimited JSON
    ///
    /// The output of one instance is a valid import source for another.
    /// Read-only: the reload flag is untouched.
    pub async fn dump_all<W>(&self, sink: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        for record in self.backend.list_records().await? {
            let mut line = serde_json::to_vec(&record)?;
            line.push(b'\n');
            sink.write_all(&line).await?;
        }
        sink.flush().await?;

        Ok(())
    }

    /// Replay a stream of line-delimited JSON records through [`Registry::add`]
    ///
    /// `source` is an `http(s)://` URL or a local filesystem path. Import
    /// stops on the first malformed record with an error; a cleanly exhausted
    /// stream returns the number of records added. Records stored before a
    /// mid-stream failure remain stored.
    pub async fn load_from(&self, source: &str) -> Result<usize> {
        let payload = self.fetch_source(source).await?;

        let mut count = 0;
        for record in serde_json::Deserializer::from_slice(&payload).into_iter::<ConfigRecord>() {
            self.add(record?).await?;
            count += 1;
        }

        info!("Imported {} config records from {}", count, source);
        Ok(count)
    }

    /// Whether agents still need to be nudged about a change
    pub fn needs_reload(&self) -> bool {
        self.needs_reload.load(Ordering::SeqCst)
    }

    /// Clear the reload flag after a fully delivered nudge cycle
    pub(crate) fn clear_needs_reload(&self) {
        self.needs_reload.store(false, Ordering::SeqCst);
    }

    async fn fetch_source(&self, source: &str) -> Result<Vec<u8>> {
        if source.starts_with("http://") || source.starts_with("https://") {
            debug!("Fetching import source {}", source);
            let response = self.http.get(source).send().await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        } else {
            debug!("Reading import source {}", source);
            Ok(async_fs::read(source).await?)
        }
    }
}
