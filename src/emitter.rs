//! Emission pipeline
//!
//! Behind every logger sits an [`Emitter`]. The production one,
//! [`Pipeline`], serializes registrations and events, routes them to the
//! right stream and partition, and absorbs every failure: telemetry is
//! fire-and-forget, and nothing here ever propagates an error to the
//! calling application.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::warn;

use crate::config::SolConfig;
use crate::constants::{LOG_STREAM_PARTITIONS, REGISTRATION_STATUS_PAYLOAD};
use crate::enabled::EnabledSet;
use crate::event::Event;
use crate::registration::{HostInfo, Registration};
use crate::sink::{EventSink, Record};

/// Emission strategy behind every logger
///
/// An emitter handles:
/// - serializing registrations and events to their wire form
/// - routing records to the right stream and partition
/// - absorbing delivery failures
///
/// Loggers themselves check nothing; whether an event actually goes out
/// is decided here, against the enabled set.
pub trait Emitter: Send + Sync {
    /// Announce a logger to the registry stream
    fn register(&self, logger_name: &str);

    /// Emit one event for a logger, if the logger is enabled
    fn log(&self, logger_name: &str, event: &Event);
}

/// Emitter that discards everything
///
/// Stands in when connection setup fails, so call sites stay free of
/// error handling.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEmitter;

impl Emitter for NoopEmitter {
    fn register(&self, _logger_name: &str) {}

    fn log(&self, _logger_name: &str, _event: &Event) {}
}

/// Partition for a record key
///
/// Partitioning has to agree across every client implementation reading
/// or writing the log stream, so the function is pinned to the wire
/// format's choice: the 31-polynomial over *signed* bytes computed by
/// `java.util.Arrays.hashCode(byte[])`, folded by absolute value.
/// `unsigned_abs` keeps the fold total where a plain `abs` would hand
/// `i32::MIN` back negative.
pub fn partition_for(key: &[u8], partitions: i32) -> i32 {
    let mut hash: i32 = 1;
    for &b in key {
        hash = hash.wrapping_mul(31).wrapping_add((b as i8) as i32);
    }
    (hash.unsigned_abs() % partitions as u32) as i32
}

/// Production emitter writing to an [`EventSink`]
pub struct Pipeline {
    app_name: String,
    host: HostInfo,
    log_stream: String,
    registry_stream: String,
    partitions: i32,
    /// Serialized registry key per logger; doubles as the partition key
    keys: RwLock<HashMap<String, Bytes>>,
    enabled: Arc<EnabledSet>,
    sink: Arc<dyn EventSink>,
}

impl Pipeline {
    pub fn new(
        config: &SolConfig,
        host: HostInfo,
        enabled: Arc<EnabledSet>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            app_name: config.app_name.clone(),
            host,
            log_stream: config.log_topic.clone(),
            registry_stream: config.sources_topic.clone(),
            partitions: LOG_STREAM_PARTITIONS,
            keys: RwLock::new(HashMap::new()),
            enabled,
            sink,
        }
    }

    /// Cached registry key of a logger, if it has registered
    pub fn registry_key(&self, logger_name: &str) -> Option<Bytes> {
        self.keys.read().get(logger_name).cloned()
    }
}

impl Emitter for Pipeline {
    fn register(&self, logger_name: &str) {
        let registration =
            Registration::new(self.app_name.clone(), self.host.clone(), logger_name);
        let key = match registration.registry_key() {
            Ok(key) => Bytes::from(key),
            Err(e) => {
                warn!(logger = logger_name, "failed to serialize registration: {e}");
                return;
            }
        };

        // Cache before publishing: a lost registration send must not leave
        // the logger permanently mute, and the compacted registry absorbs
        // the duplicate sent on the next process start anyway.
        self.keys
            .write()
            .insert(logger_name.to_string(), key.clone());

        let record = Record {
            stream: self.registry_stream.clone(),
            partition: None,
            key,
            value: Bytes::from_static(REGISTRATION_STATUS_PAYLOAD.as_bytes()),
            timestamp_ms: Utc::now().timestamp_millis(),
        };
        if let Err(e) = self.sink.publish(record) {
            warn!(logger = logger_name, "failed to publish registration: {e}");
        }
    }

    fn log(&self, logger_name: &str, event: &Event) {
        if !self.enabled.contains(logger_name) {
            return;
        }
        let Some(key) = self.registry_key(logger_name) else {
            warn!(logger = logger_name, "attempt to log with an unregistered logger");
            return;
        };
        let value = match serde_json::to_vec(event) {
            Ok(value) => Bytes::from(value),
            Err(e) => {
                warn!(logger = logger_name, "failed to serialize event: {e}");
                return;
            }
        };

        let record = Record {
            stream: self.log_stream.clone(),
            partition: Some(partition_for(&key, self.partitions)),
            key,
            value,
            timestamp_ms: Utc::now().timestamp_millis(),
        };
        if let Err(e) = self.sink.publish(record) {
            warn!(logger = logger_name, "failed to publish event: {e}");
        }
    }
}
