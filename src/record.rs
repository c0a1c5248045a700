use log::Level;

/// A failure attached to a log record. Rendered to its full human-readable
/// source chain when the record is encoded.
pub type Failure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One structured log event as handed to [`Dispatcher::publish`](crate::Dispatcher::publish).
///
/// Sequence numbers must be strictly increasing across all records produced by
/// a single process; the producer side is responsible for that invariant (the
/// bundled [`VaultLogger`](crate::VaultLogger) assigns them from a process-wide
/// counter). Process id and node name are not part of the record: they are
/// constants captured once when the sink is built and stamped on every record
/// at encode time.
#[derive(Debug)]
pub struct LogRecord {
    pub level: Level,
    /// Message text with any positional placeholders already resolved.
    pub message: String,
    pub logger: String,
    pub sequence: u64,
    pub thread: String,
    pub resource_bundle: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub source_class: Option<String>,
    pub source_method: Option<String>,
    pub failure: Option<Failure>,
}

impl LogRecord {
    /// Creates a record stamped with the current time and calling thread.
    pub fn new(level: Level, message: impl Into<String>, logger: impl Into<String>, sequence: u64) -> Self {
        Self {
            level,
            message: message.into(),
            logger: logger.into(),
            sequence,
            thread: current_thread_label(),
            resource_bundle: None,
            timestamp_ms: epoch_millis(),
            source_class: None,
            source_method: None,
            failure: None,
        }
    }

    pub fn with_resource_bundle(mut self, bundle: impl Into<String>) -> Self {
        self.resource_bundle = Some(bundle.into());
        self
    }

    pub fn with_source(mut self, class: impl Into<String>, method: impl Into<String>) -> Self {
        self.source_class = Some(class.into());
        self.source_method = Some(method.into());
        self
    }

    pub fn with_failure(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn epoch_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Thread name if set, otherwise the opaque thread id.
pub(crate) fn current_thread_label() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_owned(),
        None => format!("{:?}", thread.id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults() {
        let record = LogRecord::new(Level::Info, "hello", "app.module", 7);
        assert_eq!(record.sequence, 7);
        assert_eq!(record.message, "hello");
        assert!(record.resource_bundle.is_none());
        assert!(record.failure.is_none());
        assert!(record.timestamp_ms > 0);
        assert!(!record.thread.is_empty());
    }

    #[test]
    fn test_record_builders() {
        let record = LogRecord::new(Level::Warn, "boom", "app", 1)
            .with_resource_bundle("messages")
            .with_source("app.Server", "start")
            .with_failure("disk on fire".into());

        assert_eq!(record.resource_bundle.as_deref(), Some("messages"));
        assert_eq!(record.source_class.as_deref(), Some("app.Server"));
        assert_eq!(record.source_method.as_deref(), Some("start"));
        assert!(record.failure.is_some());
    }
}
