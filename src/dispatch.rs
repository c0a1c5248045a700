//! Producer-facing entry point.
//!
//! `publish` is the hot path application threads hit: encode the record,
//! attempt a non-blocking enqueue, and report a drop if the queue is at
//! capacity. The caller is never blocked and never observes store latency; a
//! publish under a slow or unreachable store costs the same as one under a
//! healthy store.

use std::sync::Arc;

use crate::encode::{encode, ProcessTags};
use crate::queue::RecordQueue;
use crate::record::LogRecord;
use crate::report::{Fault, FaultReporter};

pub struct Dispatcher {
    queue: Arc<RecordQueue>,
    tags: ProcessTags,
    reporter: Arc<dyn FaultReporter>,
}

impl Dispatcher {
    pub(crate) fn new(
        queue: Arc<RecordQueue>,
        tags: ProcessTags,
        reporter: Arc<dyn FaultReporter>,
    ) -> Self {
        Self {
            queue,
            tags,
            reporter,
        }
    }

    /// Encodes and enqueues one record.
    ///
    /// Level filtering is the producer's concern and happens before this
    /// call. On a full queue the record is discarded and a
    /// [`Fault::QueueFull`] goes to the reporter; no error ever propagates
    /// back to the calling thread.
    pub fn publish(&self, record: LogRecord) {
        let encoded = encode(record, &self.tags);
        if let Err(dropped) = self.queue.try_push(encoded) {
            self.reporter.report(&Fault::QueueFull {
                seq: dropped.sequence,
            });
        }
    }

    /// Records currently buffered, for diagnostics.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Configured queue capacity.
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CollectingReporter {
        drops: AtomicUsize,
        faults: Mutex<Vec<String>>,
    }

    impl CollectingReporter {
        fn new() -> Self {
            Self {
                drops: AtomicUsize::new(0),
                faults: Mutex::new(Vec::new()),
            }
        }
    }

    impl FaultReporter for CollectingReporter {
        fn report(&self, fault: &Fault) {
            if matches!(fault, Fault::QueueFull { .. }) {
                self.drops.fetch_add(1, Ordering::SeqCst);
            }
            self.faults.lock().unwrap().push(fault.to_string());
        }
    }

    fn dispatcher(capacity: usize, reporter: Arc<CollectingReporter>) -> Dispatcher {
        let queue = Arc::new(RecordQueue::new(capacity, Vec::new()));
        let tags = ProcessTags {
            pid: 1,
            node: "test".to_owned(),
        };
        Dispatcher::new(queue, tags, reporter)
    }

    #[test]
    fn test_capacity_invariant_with_zero_drain() {
        // N publishes against capacity C with no workers draining: exactly
        // min(N, C) records buffered and N - C drop reports.
        let reporter = Arc::new(CollectingReporter::new());
        let dispatcher = dispatcher(5, Arc::clone(&reporter));

        for seq in 0..7 {
            dispatcher.publish(LogRecord::new(Level::Info, "msg", "app", seq));
        }

        assert_eq!(dispatcher.pending(), 5);
        assert_eq!(reporter.drops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_report_names_dropped_sequence() {
        let reporter = Arc::new(CollectingReporter::new());
        let dispatcher = dispatcher(1, Arc::clone(&reporter));

        dispatcher.publish(LogRecord::new(Level::Info, "kept", "app", 10));
        dispatcher.publish(LogRecord::new(Level::Info, "dropped", "app", 11));

        let faults = reporter.faults.lock().unwrap();
        assert_eq!(faults.len(), 1);
        assert!(faults[0].contains("record 11"));
    }

    #[test]
    fn test_publish_never_panics_on_full_queue() {
        let reporter = Arc::new(CollectingReporter::new());
        let dispatcher = dispatcher(2, reporter);

        for seq in 0..1_000 {
            dispatcher.publish(LogRecord::new(Level::Info, "msg", "app", seq));
        }
        assert_eq!(dispatcher.pending(), 2);
    }
}
