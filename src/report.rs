//! The error-reporting channel.
//!
//! Every fault the sink can hit funnels into one [`FaultReporter`] the
//! embedder configures. Faults never propagate to a producer thread and never
//! terminate a worker; a dropped or failed record is simply absent from the
//! store except for what the reporter surfaces.

use crate::store::StoreError;

/// A non-fatal fault raised somewhere in the sink.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    /// The queue was at capacity; the record was discarded. Reported once per
    /// dropped record.
    #[error("queue full, record {seq} dropped")]
    QueueFull { seq: u64 },
    /// The store handle could not be established. The worker continues; the
    /// next dequeued record triggers a fresh attempt.
    #[error("store connection failed, record {seq} dropped: {source}")]
    Connect { seq: u64, source: StoreError },
    /// A single write was rejected or failed. The record is discarded, never
    /// retried.
    #[error("store write failed, record {seq} dropped: {source}")]
    Write { seq: u64, source: StoreError },
}

/// Destination for fault reports. Must tolerate calls from producer threads
/// and worker threads concurrently.
pub trait FaultReporter: Send + Sync + 'static {
    fn report(&self, fault: &Fault);
}

/// Default reporter: one line per fault on stderr.
///
/// Deliberately not routed through the `log` facade, since the sink itself
/// may be installed as the process logger.
pub struct StderrReporter;

impl FaultReporter for StderrReporter {
    fn report(&self, fault: &Fault) {
        eprintln!("logvault: {fault}");
    }
}
