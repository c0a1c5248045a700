//! Asynchronous log-record sink.
//!
//! `logvault` decouples application threads producing log records from the
//! latency of persisting them to a remote durable store. Producers publish
//! into a bounded lock-free queue and return immediately; background writer
//! workers drain the queue and hand each record to a pluggable
//! [`StoreConnector`]. When the queue is full, records are dropped and
//! reported rather than blocking the caller. Delivery is best-effort,
//! at-most-once.
//!
//! # Architecture
//!
//! ```text
//! [Producer Threads] → [Dispatcher] → [Bounded Queue] → [Writer Workers] → [Store]
//!        ↓                 ↓               ↓                  ↓
//!    log macros or     encode +        lock-free          blocking drain,
//!    publish() call    try-enqueue     ArrayQueue         lazy shared handle
//! ```
//!
//! # Usage
//!
//! ```rust, ignore
//! use logvault::{JsonLineStore, LogVaultBuilder};
//!
//! let guard = LogVaultBuilder::new()
//!     .with_store(JsonLineStore::new(std::io::stderr()))
//!     .with_capacity(1000)
//!     .with_workers(2)
//!     .install()?;
//!
//! log::info!("records now flow to the store in the background");
//!
//! // Grace period, then cooperative cancellation of the workers.
//! guard.shutdown();
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_utils::sync::Parker;
use log::LevelFilter;

mod dispatch;
mod encode;
mod logger;
mod queue;
mod record;
mod report;
mod store;
mod worker;

pub use dispatch::Dispatcher;
pub use encode::EncodedRecord;
pub use logger::VaultLogger;
pub use record::{Failure, LogRecord};
pub use report::{Fault, FaultReporter, StderrReporter};
pub use store::{JsonLineStore, StoreConfig, StoreConnector, StoreError, StoreHandle};

use encode::ProcessTags;
use queue::RecordQueue;
use store::SharedHandle;
use worker::WriterWorker;

const DEFAULT_CAPACITY: usize = 500;
const DEFAULT_WORKERS: usize = 1;
const DEFAULT_GRACE: Duration = Duration::from_millis(500);

/// Owns the worker pool lifecycle and performs the graceful shutdown.
///
/// [`shutdown`](Self::shutdown) sleeps for the configured grace period so
/// queued records get a best-effort chance to drain, then signals cancellation
/// to every worker and returns without waiting for them to stop. Dropping the
/// guard without calling `shutdown` runs the same sequence.
pub struct LogVaultGuard {
    handles: Vec<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
    queue: Arc<RecordQueue>,
    grace: Duration,
}

impl LogVaultGuard {
    /// Grace sleep, then fire-and-forget cancellation.
    ///
    /// The grace period is a fixed timer, not tied to queue occupancy:
    /// records still queued when it elapses stay unwritten. Workers blocked
    /// on the queue wake and stop immediately; a worker mid-write finishes
    /// that single write first.
    pub fn shutdown(mut self) {
        self.stop();
    }

    /// Like [`shutdown`](Self::shutdown), but additionally joins the worker
    /// threads after cancellation. Useful when the process is about to exit
    /// and the embedder wants the workers fully stopped.
    pub fn shutdown_and_wait(mut self) {
        self.stop();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }

    fn stop(&mut self) {
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }

        if !self.grace.is_zero() {
            std::thread::sleep(self.grace);
        }

        self.cancelled.store(true, Ordering::Release);
        self.queue.wake_workers(); // wake workers parked on an empty queue
    }
}

impl Drop for LogVaultGuard {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogVaultBuilderError {
    #[error("no configured store connector")]
    NoConfiguredStore,
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
    #[error("worker count must be at least 1")]
    ZeroWorkers,
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
    #[error("{0}")]
    SetLoggerError(#[from] log::SetLoggerError),
}

/// Configures and starts the sink.
///
/// Every option has a default: capacity 500, one writer worker, 500 ms
/// shutdown grace, host name as the node identifier, `Trace` ("all") as the
/// minimum severity, faults to stderr.
pub struct LogVaultBuilder<C: StoreConnector> {
    connector: Option<C>,
    store: StoreConfig,
    capacity: Option<usize>,
    workers: Option<usize>,
    grace: Option<Duration>,
    node: Option<String>,
    level: Option<LevelFilter>,
    reporter: Option<Arc<dyn FaultReporter>>,
}

impl<C: StoreConnector> LogVaultBuilder<C> {
    pub fn new() -> Self {
        Self {
            connector: None,
            store: StoreConfig::default(),
            capacity: None,
            workers: None,
            grace: None,
            node: None,
            level: None,
            reporter: None,
        }
    }

    pub fn with_store(mut self, connector: C) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Store location, host:port or a full URI.
    pub fn with_store_uri(mut self, uri: impl Into<String>) -> Self {
        self.store.uri = uri.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.store.database = database.into();
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.store.collection = collection.into();
        self
    }

    /// Max records buffered before publishes start dropping.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Best-effort drain delay before shutdown cancels the workers.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = Some(grace);
        self
    }

    /// Node identifier stamped on every record; defaults to the host name.
    pub fn with_node_name(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Minimum severity the `log` bridge lets through. Only consulted by
    /// [`install`](Self::install); direct `publish` calls are not filtered.
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn FaultReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Starts the queue and worker pool, returning the producer-facing
    /// dispatcher and the shutdown guard.
    pub fn build(self) -> Result<(Arc<Dispatcher>, LogVaultGuard), LogVaultBuilderError> {
        let capacity = self.capacity.unwrap_or(DEFAULT_CAPACITY);
        if capacity == 0 {
            return Err(LogVaultBuilderError::ZeroCapacity);
        }

        let workers = self.workers.unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(LogVaultBuilderError::ZeroWorkers);
        }

        let connector = self.connector.ok_or(LogVaultBuilderError::NoConfiguredStore)?;
        let reporter = self.reporter.unwrap_or_else(|| Arc::new(StderrReporter));

        // Process-wide constants, resolved once and reused for every record.
        let node = match self.node {
            Some(node) => node,
            None => hostname::get()?.to_string_lossy().into_owned(),
        };
        let tags = ProcessTags {
            pid: std::process::id(),
            node,
        };

        let parkers: Vec<Parker> = (0..workers).map(|_| Parker::new()).collect();
        let waiters = parkers
            .iter()
            .map(|parker| parker.unparker().clone())
            .collect();

        let queue = Arc::new(RecordQueue::new(capacity, waiters));
        let cancelled = Arc::new(AtomicBool::new(false));
        let shared = Arc::new(SharedHandle::new(connector, self.store));

        let mut handles = Vec::with_capacity(workers);
        for (idx, parker) in parkers.into_iter().enumerate() {
            let worker = WriterWorker::new(
                Arc::clone(&queue),
                parker,
                Arc::clone(&shared),
                Arc::clone(&reporter),
                Arc::clone(&cancelled),
            );
            let handle = std::thread::Builder::new()
                .name(format!("logvault-writer-{idx}"))
                .spawn(move || worker.run())?;
            handles.push(handle);
        }

        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&queue), tags, reporter));
        let guard = LogVaultGuard {
            handles,
            cancelled,
            queue,
            grace: self.grace.unwrap_or(DEFAULT_GRACE),
        };

        Ok((dispatcher, guard))
    }

    /// Builds the sink and registers it as the global `log` backend.
    pub fn install(self) -> Result<LogVaultGuard, LogVaultBuilderError> {
        let level = self.level.unwrap_or(LevelFilter::Trace);
        let (dispatcher, guard) = self.build()?;
        log::set_boxed_logger(Box::new(VaultLogger::new(dispatcher, level)))?;
        log::set_max_level(level);
        Ok(guard)
    }
}

impl<C: StoreConnector> Default for LogVaultBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
