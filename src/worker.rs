//! Writer workers: the background loops that drain the queue into the store.
//!
//! Each worker is an independent thread cycling Running → Writing → Running.
//! A worker blocks only while the queue is empty, parked until a producer
//! push or the shutdown wakeup arrives. Cancellation is cooperative and
//! observed at the wait point: a worker blocked on the queue wakes and stops,
//! a worker mid-write finishes that single write first and stops on its next
//! dequeue.
//!
//! Persistence failures never stop a worker. A failed connect or write is
//! reported through the fault channel, the record is discarded, and the loop
//! returns to the queue; the failed record is not retried or re-queued
//! (at-most-once semantics).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_utils::sync::Parker;

use crate::encode::EncodedRecord;
use crate::queue::RecordQueue;
use crate::report::{Fault, FaultReporter};
use crate::store::{SharedHandle, StoreConnector, StoreHandle};

/// Upper bound on one park; a safety net should a wakeup ever be missed, not
/// the normal wake path.
const PARK_TIMEOUT: Duration = Duration::from_millis(100);

pub(crate) enum Dequeue {
    Record(EncodedRecord),
    Cancelled,
}

pub(crate) struct WriterWorker<C: StoreConnector> {
    queue: Arc<RecordQueue>,
    parker: Parker,
    store: Arc<SharedHandle<C>>,
    reporter: Arc<dyn FaultReporter>,
    cancelled: Arc<AtomicBool>,
}

impl<C: StoreConnector> WriterWorker<C> {
    pub(crate) fn new(
        queue: Arc<RecordQueue>,
        parker: Parker,
        store: Arc<SharedHandle<C>>,
        reporter: Arc<dyn FaultReporter>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            queue,
            parker,
            store,
            reporter,
            cancelled,
        }
    }

    /// Runs until cancellation is observed. Never panics out of the loop.
    pub(crate) fn run(&self) {
        loop {
            match self.dequeue() {
                Dequeue::Record(record) => self.persist(record),
                Dequeue::Cancelled => break,
            }
        }
    }

    /// Blocks until a record is available or cancellation is observed.
    ///
    /// Cancellation is checked before each pop, so once the shutdown signal
    /// lands the worker stops even if records remain queued; draining past
    /// that point is explicitly not guaranteed.
    fn dequeue(&self) -> Dequeue {
        loop {
            if self.cancelled.load(Ordering::Acquire) {
                return Dequeue::Cancelled;
            }
            if let Some(record) = self.queue.pop() {
                return Dequeue::Record(record);
            }
            self.parker.park_timeout(PARK_TIMEOUT);
        }
    }

    /// One write attempt for one record. The store handle is established
    /// lazily by whichever worker gets here first; all others reuse it.
    fn persist(&self, record: EncodedRecord) {
        let handle = match self.store.ensure_connected() {
            Ok(handle) => handle,
            Err(source) => {
                self.reporter.report(&Fault::Connect {
                    seq: record.sequence,
                    source,
                });
                return;
            }
        };

        if let Err(source) = handle.write(&record) {
            self.reporter.report(&Fault::Write {
                seq: record.sequence,
                source,
            });
        }
    }
}
