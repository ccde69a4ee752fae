//! Event sink abstraction for keyed record streams
//!
//! Separates stream I/O from control-plane logic:
//! - **EventSink**: how records are published, streams provisioned, and
//!   subscriptions opened
//! - **Pipeline / Listener**: what the records mean (handled separately)
//!
//! # Adding a new sink
//!
//! 1. Create `sink/my_sink.rs`
//! 2. Implement the `EventSink` and `SinkConsumer` traits
//! 3. Add `pub mod my_sink;` here
//! 4. No other changes needed

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;

#[cfg(feature = "kafka")]
pub use kafka::KafkaSink;
pub use memory::MemorySink;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Outbound record handed to [`EventSink::publish`]
#[derive(Debug, Clone)]
pub struct Record {
    /// Target stream name
    pub stream: String,
    /// Explicit partition, or `None` for single-partition streams
    pub partition: Option<i32>,
    /// Routing and compaction key
    pub key: Bytes,
    /// Payload bytes
    pub value: Bytes,
    /// Producer-assigned timestamp, milliseconds since the epoch
    pub timestamp_ms: i64,
}

/// Inbound record yielded by [`SinkConsumer::poll`]
#[derive(Debug, Clone)]
pub struct SinkRecord {
    pub partition: i32,
    /// Position within the partition; strictly increasing
    pub offset: i64,
    pub key: Bytes,
    pub value: Bytes,
    /// Producer-assigned timestamp, milliseconds since the epoch
    pub timestamp_ms: i64,
}

/// Stream provisioning parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSpec {
    pub name: String,
    pub partitions: i32,
    pub replication: i32,
    /// Retain only the latest record per key
    pub compacted: bool,
}

impl StreamSpec {
    /// Partitioned stream retaining all records
    pub fn partitioned(name: impl Into<String>, partitions: i32, replication: i32) -> Self {
        Self {
            name: name.into(),
            partitions,
            replication,
            compacted: false,
        }
    }

    /// Single-partition stream retaining all records
    pub fn single(name: impl Into<String>, replication: i32) -> Self {
        Self::partitioned(name, 1, replication)
    }

    /// Single-partition stream retaining only the latest record per key
    pub fn compacted(name: impl Into<String>, replication: i32) -> Self {
        Self {
            name: name.into(),
            partitions: 1,
            replication,
            compacted: true,
        }
    }
}

/// Trait for pluggable publish/subscribe transports
///
/// A sink handles:
/// - Durable keyed record streams with per-partition ordering
/// - At-least-once consumption with replay from the earliest offset
/// - Idempotent stream provisioning
///
/// A sink does NOT handle:
/// - Wire formats of keys and values (the pipeline's job)
/// - Partition selection for emitted events (the pipeline's job)
/// - Command interpretation (the listener's job)
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    /// Enqueue a record for delivery
    ///
    /// Non-blocking: the record is buffered locally and delivered in the
    /// background, best-effort. An error means it could not even be
    /// buffered.
    fn publish(&self, record: Record) -> Result<()>;

    /// Create the stream if it does not exist
    ///
    /// Idempotent: an existing stream is left untouched whatever its
    /// settings.
    async fn ensure_stream(&self, spec: &StreamSpec) -> Result<()>;

    /// Open a subscription reading the stream from its earliest offset
    ///
    /// `group` is the subscriber identity; a group the sink has never seen
    /// always starts at the beginning of the stream.
    async fn subscribe(&self, stream: &str, group: &str) -> Result<Box<dyn SinkConsumer>>;
}

/// Pollable record source returned by [`EventSink::subscribe`]
#[async_trait]
pub trait SinkConsumer: Send {
    /// Wait up to `timeout` for records
    ///
    /// An empty batch means the timeout elapsed with no traffic. Records
    /// within one partition arrive in offset order.
    async fn poll(&mut self, timeout: Duration) -> Result<Vec<SinkRecord>>;
}
