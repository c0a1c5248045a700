//! Bridge from the `log` facade to the dispatcher.
//!
//! `VaultLogger` is the handler front-end: it applies the minimum-severity
//! filter, turns a `log::Record` into a [`LogRecord`], and hands it to
//! [`Dispatcher::publish`]. All of that stays on the producer thread and is
//! cheap; the store never gets a chance to slow a log call down.
//!
//! Sequence numbers come from a process-wide atomic counter, so they are
//! strictly increasing across every thread logging through this bridge.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::LevelFilter;

use crate::dispatch::Dispatcher;
use crate::record::{current_thread_label, epoch_millis, LogRecord};

pub struct VaultLogger {
    dispatcher: Arc<Dispatcher>,
    max_level: LevelFilter,
    sequence: AtomicU64,
}

impl VaultLogger {
    pub fn new(dispatcher: Arc<Dispatcher>, max_level: LevelFilter) -> Self {
        Self {
            dispatcher,
            max_level,
            sequence: AtomicU64::new(0),
        }
    }
}

impl log::Log for VaultLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let source_method = match (record.file(), record.line()) {
            (Some(file), Some(line)) => Some(format!("{file}:{line}")),
            (Some(file), None) => Some(file.to_owned()),
            _ => None,
        };

        self.dispatcher.publish(LogRecord {
            level: record.level(),
            message: record.args().to_string(),
            logger: record.target().to_owned(),
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            thread: current_thread_label(),
            resource_bundle: None,
            timestamp_ms: epoch_millis(),
            source_class: record.module_path().map(str::to_owned),
            source_method,
            failure: None,
        });
    }

    // Records go straight to the queue; the workers own persistence.
    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::ProcessTags;
    use crate::queue::RecordQueue;
    use crate::report::{Fault, FaultReporter};
    use log::{Level, Log, Record};

    struct NullReporter;

    impl FaultReporter for NullReporter {
        fn report(&self, _fault: &Fault) {}
    }

    fn logger(capacity: usize, level: LevelFilter) -> (VaultLogger, Arc<RecordQueue>) {
        let queue = Arc::new(RecordQueue::new(capacity, Vec::new()));
        let tags = ProcessTags {
            pid: 1,
            node: "test".to_owned(),
        };
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&queue),
            tags,
            Arc::new(NullReporter),
        ));
        (VaultLogger::new(dispatcher, level), queue)
    }

    #[test]
    fn test_bridge_encodes_and_enqueues() {
        let (logger, queue) = logger(8, LevelFilter::Info);

        logger.log(
            &Record::builder()
                .args(format_args!("user logged in"))
                .level(Level::Info)
                .target("app::auth")
                .module_path(Some("app::auth"))
                .file(Some("auth.rs"))
                .line(Some(42))
                .build(),
        );

        let encoded = queue.pop().expect("record enqueued");
        assert_eq!(encoded.level, "INFO");
        assert_eq!(encoded.message, "user logged in");
        assert_eq!(encoded.logger, "app::auth");
        assert_eq!(encoded.source_class.as_deref(), Some("app::auth"));
        assert_eq!(encoded.source_method.as_deref(), Some("auth.rs:42"));
        assert_eq!(encoded.node, "test");
    }

    #[test]
    fn test_level_filter_applied_before_publish() {
        let (logger, queue) = logger(8, LevelFilter::Warn);

        logger.log(
            &Record::builder()
                .args(format_args!("chatty"))
                .level(Level::Debug)
                .target("app")
                .build(),
        );

        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_sequence_numbers_strictly_increase() {
        let (logger, queue) = logger(16, LevelFilter::Trace);

        for _ in 0..5 {
            logger.log(
                &Record::builder()
                    .args(format_args!("tick"))
                    .level(Level::Info)
                    .target("app")
                    .build(),
            );
        }

        let mut last = None;
        while let Some(encoded) = queue.pop() {
            if let Some(previous) = last {
                assert!(encoded.sequence > previous);
            }
            last = Some(encoded.sequence);
        }
        assert_eq!(last, Some(4));
    }
}
