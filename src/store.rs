//! The store connector boundary.
//!
//! The sink core never talks to a concrete store client directly. It sees a
//! [`StoreConnector`] that can lazily establish a [`StoreHandle`], and the
//! handle's single `write` call. Connection establishment, authentication,
//! timeouts and retry behavior all live behind this boundary; the core only
//! observes success or failure plus a human-readable message.
//!
//! [`SharedHandle`] adds the lifecycle the workers need: one lazily created
//! handle shared by every worker, initialized exactly once even under
//! concurrent first use, and re-attempted on later writes if the first
//! connection failed.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::encode::EncodedRecord;

/// Failure surfaced by a store connector or handle.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("write rejected: {0}")]
    Rejected(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where and under what logical grouping records are persisted.
///
/// Passed verbatim to [`StoreConnector::connect`]; connectors are free to
/// ignore fields that do not apply to their backend.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store location, host:port or a full URI.
    pub uri: String,
    /// Logical namespace for records.
    pub database: String,
    /// Destination within the namespace.
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "127.0.0.1:27017".to_owned(),
            database: "logvault".to_owned(),
            collection: "log".to_owned(),
        }
    }
}

/// An established connection to the store. Shared by all workers, so `write`
/// takes `&self` and must be safe to call concurrently.
pub trait StoreHandle: Send + Sync + 'static {
    fn write(&self, record: &EncodedRecord) -> Result<(), StoreError>;
}

/// Factory for store handles. `connect` pays the full initialization cost
/// (connection, authentication); it is called again on a later write only if
/// every previous attempt failed.
pub trait StoreConnector: Send + Sync + 'static {
    type Handle: StoreHandle;

    fn connect(&self, config: &StoreConfig) -> Result<Self::Handle, StoreError>;
}

/// Lazily-initialized handle shared across the worker pool.
///
/// The slot is double-checked: a read lock serves the common case of an
/// already-established handle, and the write lock ensures exactly one
/// `connect` runs when several workers hit first use at the same time. A
/// failed `connect` leaves the slot empty, so the next write attempt tries
/// again (no circuit breaker, no backoff).
pub(crate) struct SharedHandle<C: StoreConnector> {
    connector: C,
    config: StoreConfig,
    slot: RwLock<Option<Arc<C::Handle>>>,
}

impl<C: StoreConnector> SharedHandle<C> {
    pub(crate) fn new(connector: C, config: StoreConfig) -> Self {
        Self {
            connector,
            config,
            slot: RwLock::new(None),
        }
    }

    pub(crate) fn ensure_connected(&self) -> Result<Arc<C::Handle>, StoreError> {
        if let Some(handle) = self
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(handle));
        }

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.as_ref() {
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(self.connector.connect(&self.config)?);
        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }
}

/// A bundled connector that persists each record as one JSON line on any
/// [`io::Write`] destination.
///
/// Useful as a local fallback store and in tests; a file or a socket works
/// equally well. The writer is shared behind a mutex because handle writes
/// may arrive from several workers at once.
pub struct JsonLineStore<W: Write + Send + 'static> {
    writer: Arc<Mutex<W>>,
}

impl<W: Write + Send + 'static> JsonLineStore<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }
}

impl<W: Write + Send + 'static> StoreConnector for JsonLineStore<W> {
    type Handle = JsonLineHandle<W>;

    fn connect(&self, _config: &StoreConfig) -> Result<Self::Handle, StoreError> {
        Ok(JsonLineHandle {
            writer: Arc::clone(&self.writer),
        })
    }
}

pub struct JsonLineHandle<W: Write + Send + 'static> {
    writer: Arc<Mutex<W>>,
}

impl<W: Write + Send + 'static> StoreHandle for JsonLineHandle<W> {
    fn write(&self, record: &EncodedRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}
