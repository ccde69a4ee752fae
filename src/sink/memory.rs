//! In-memory event sink
//!
//! Backs the test suite and local experimentation without a broker.
//! Streams are provisioned on demand, compacted streams retain only the
//! newest record per key, and every subscription reads from the earliest
//! retained offset. That last point matches how the client consumes: a
//! fresh group per process start, never a resumed one, so the memory sink
//! does not track group progress at all.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use crate::constants::STREAM_REPLICATION;
use crate::error::{Result, SolError};

use super::{EventSink, Record, SinkConsumer, SinkRecord, StreamSpec};

/// Broker-free [`EventSink`] holding every stream in process memory.
///
/// Cloning is cheap and every clone shares the same streams, so a test can
/// keep one handle for inspection while the client publishes through
/// another.
#[derive(Clone, Default)]
pub struct MemorySink {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    streams: HashMap<String, StreamState>,
    /// Wakeup handles for live consumers; dead ones are pruned on publish
    watchers: Vec<Weak<Notify>>,
}

struct StreamState {
    spec: StreamSpec,
    partitions: Vec<Vec<SinkRecord>>,
    next_offsets: Vec<i64>,
}

impl StreamState {
    fn new(spec: StreamSpec) -> Self {
        let count = spec.partitions.max(1) as usize;
        Self {
            spec,
            partitions: vec![Vec::new(); count],
            next_offsets: vec![0; count],
        }
    }

    fn grow_to(&mut self, count: usize) {
        while self.partitions.len() < count {
            self.partitions.push(Vec::new());
            self.next_offsets.push(0);
        }
        self.spec.partitions = self.partitions.len() as i32;
    }

    fn append(&mut self, partition: usize, key: Bytes, value: Bytes, timestamp_ms: i64) {
        if self.spec.compacted {
            // Compaction keeps the newest record per key; offsets of the
            // survivors are untouched, so ordering stays meaningful.
            self.partitions[partition].retain(|r| r.key != key);
        }
        let offset = self.next_offsets[partition];
        self.next_offsets[partition] = offset + 1;
        self.partitions[partition].push(SinkRecord {
            partition: partition as i32,
            offset,
            key,
            value,
            timestamp_ms,
        });
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the stream has been provisioned, by setup or by publish.
    pub fn has_stream(&self, stream: &str) -> bool {
        self.shared.inner.lock().streams.contains_key(stream)
    }

    /// Provisioning parameters of a stream, if it exists.
    pub fn stream_spec(&self, stream: &str) -> Option<StreamSpec> {
        self.shared
            .inner
            .lock()
            .streams
            .get(stream)
            .map(|state| state.spec.clone())
    }

    /// Every retained record of a stream, ordered by partition then offset.
    pub fn records(&self, stream: &str) -> Vec<SinkRecord> {
        let inner = self.shared.inner.lock();
        match inner.streams.get(stream) {
            Some(state) => state.partitions.iter().flatten().cloned().collect(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl EventSink for MemorySink {
    fn publish(&self, record: Record) -> Result<()> {
        let Record {
            stream,
            partition,
            key,
            value,
            timestamp_ms,
        } = record;

        if let Some(p) = partition {
            if p < 0 {
                return Err(SolError::Publish {
                    stream,
                    reason: format!("negative partition {p}"),
                });
            }
        }

        let mut inner = self.shared.inner.lock();

        // Publishing to an unknown stream provisions it, the way brokers
        // with topic auto-creation behave. An explicit partition can also
        // widen a stream that was provisioned narrower.
        let needed = partition.map_or(1, |p| p as usize + 1);
        let state = inner
            .streams
            .entry(stream.clone())
            .or_insert_with(|| {
                StreamState::new(StreamSpec::partitioned(
                    stream.clone(),
                    needed as i32,
                    STREAM_REPLICATION,
                ))
            });
        state.grow_to(needed);
        state.append(partition.unwrap_or(0) as usize, key, value, timestamp_ms);

        inner.watchers.retain(|weak| match weak.upgrade() {
            Some(notify) => {
                notify.notify_one();
                true
            }
            None => false,
        });
        Ok(())
    }

    async fn ensure_stream(&self, spec: &StreamSpec) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        if !inner.streams.contains_key(&spec.name) {
            debug!("created stream '{}'", spec.name);
            inner
                .streams
                .insert(spec.name.clone(), StreamState::new(spec.clone()));
        }
        Ok(())
    }

    async fn subscribe(&self, stream: &str, _group: &str) -> Result<Box<dyn SinkConsumer>> {
        let notify = Arc::new(Notify::new());
        self.shared.inner.lock().watchers.push(Arc::downgrade(&notify));
        Ok(Box::new(MemoryConsumer {
            shared: Arc::clone(&self.shared),
            stream: stream.to_string(),
            notify,
            cursors: HashMap::new(),
        }))
    }
}

struct MemoryConsumer {
    shared: Arc<Shared>,
    stream: String,
    notify: Arc<Notify>,
    /// Next offset to deliver, per partition
    cursors: HashMap<usize, i64>,
}

impl MemoryConsumer {
    fn drain(&mut self) -> Vec<SinkRecord> {
        let inner = self.shared.inner.lock();
        let Some(state) = inner.streams.get(&self.stream) else {
            return Vec::new();
        };
        let mut batch = Vec::new();
        for (index, partition) in state.partitions.iter().enumerate() {
            let cursor = self.cursors.entry(index).or_insert(0);
            let fresh: Vec<SinkRecord> = partition
                .iter()
                .filter(|r| r.offset >= *cursor)
                .cloned()
                .collect();
            if let Some(last) = fresh.last() {
                *cursor = last.offset + 1;
            }
            batch.extend(fresh);
        }
        batch
    }
}

#[async_trait]
impl SinkConsumer for MemoryConsumer {
    async fn poll(&mut self, timeout: Duration) -> Result<Vec<SinkRecord>> {
        let deadline = Instant::now() + timeout;
        loop {
            let batch = self.drain();
            if !batch.is_empty() {
                return Ok(batch);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            // notify_one stores a permit when nobody is waiting yet, so a
            // publish landing between drain and this await is not lost.
            let woken = tokio::time::timeout(deadline - now, self.notify.notified()).await;
            if woken.is_err() {
                return Ok(Vec::new());
            }
        }
    }
}
