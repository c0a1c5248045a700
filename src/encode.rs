//! Conversion of a [`LogRecord`] into the flat field set persisted to the store.
//!
//! The encoder is pure and infallible: every record yields exactly the same
//! twelve fields, with absent optionals carried as explicit nulls rather than
//! omitted. The short field keys (`l`, `m`, `lo`, ...) are the stable wire
//! names stores index on; serde renames keep the Rust struct readable while
//! preserving them.

use serde::Serialize;

use crate::record::{Failure, LogRecord};

/// Process-wide constants stamped on every encoded record.
///
/// Computed once when the sink is built, never per record.
#[derive(Debug, Clone)]
pub struct ProcessTags {
    pub pid: u32,
    pub node: String,
}

/// The immutable, encoded form of one log record.
///
/// Once placed on the queue an `EncodedRecord` is never mutated; workers take
/// ownership and hand a shared reference to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedRecord {
    /// Severity level name (`ERROR`, `WARN`, ...).
    #[serde(rename = "l")]
    pub level: &'static str,
    #[serde(rename = "m")]
    pub message: String,
    #[serde(rename = "lo")]
    pub logger: String,
    #[serde(rename = "ms")]
    pub sequence: u64,
    #[serde(rename = "t")]
    pub thread: String,
    #[serde(rename = "rb")]
    pub resource_bundle: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "ts")]
    pub timestamp_ms: i64,
    #[serde(rename = "sm")]
    pub source_method: Option<String>,
    #[serde(rename = "sc")]
    pub source_class: Option<String>,
    /// Full rendered failure chain, if the record carried one.
    #[serde(rename = "th")]
    pub thrown: Option<String>,
    #[serde(rename = "pid")]
    pub pid: u32,
    #[serde(rename = "nn")]
    pub node: String,
}

/// Encodes a record. Pure, no I/O, never fails; every field is always set.
pub fn encode(record: LogRecord, tags: &ProcessTags) -> EncodedRecord {
    EncodedRecord {
        level: record.level.as_str(),
        message: record.message,
        logger: record.logger,
        sequence: record.sequence,
        thread: record.thread,
        resource_bundle: record.resource_bundle,
        timestamp_ms: record.timestamp_ms,
        source_method: record.source_method,
        source_class: record.source_class,
        thrown: record.failure.as_ref().map(failure_chain),
        pid: tags.pid,
        node: tags.node.clone(),
    }
}

/// Renders a failure and its full source chain, one cause per line.
fn failure_chain(failure: &Failure) -> String {
    let mut out = failure.to_string();
    let mut source = failure.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
