//! Kafka event sink
//!
//! Producer settings follow the client's delivery contract: `acks=0`,
//! because emission is fire-and-forget and nobody is waiting for a
//! delivery report. Consumers are created per subscription with the
//! caller's group id; paired with the time-unique groups the listener
//! generates, every subscription starts at the earliest retained offset.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::ClientConfig;
use tracing::{debug, info};

use crate::config::SolConfig;
use crate::constants::PRODUCER_CLIENT_ID;
use crate::error::{Result, SolError};

use super::{EventSink, Record, SinkConsumer, SinkRecord, StreamSpec};

/// [`EventSink`] backed by a Kafka cluster
pub struct KafkaSink {
    brokers: String,
    producer: FutureProducer,
    admin: AdminClient<DefaultClientContext>,
}

impl KafkaSink {
    /// Build a sink against `brokers` (comma-separated host:port list)
    ///
    /// Construction does not touch the network; the first publish or
    /// stream setup does.
    pub fn new(brokers: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", PRODUCER_CLIENT_ID)
            .set("acks", "0")
            .create()
            .map_err(|e| SolError::SinkInit {
                reason: e.to_string(),
            })?;
        let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .create()
            .map_err(|e| SolError::SinkInit {
                reason: e.to_string(),
            })?;
        Ok(Self {
            brokers: brokers.to_string(),
            producer,
            admin,
        })
    }

    pub fn from_config(config: &SolConfig) -> Result<Self> {
        Self::new(&config.bootstrap_servers)
    }

    /// Wait until locally queued records have left the process
    ///
    /// The library never calls this; emission stays non-blocking. Short
    /// lived producers like `sol-ctl` need it before exiting, or their
    /// last records die in the local queue.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        self.producer
            .flush(timeout)
            .map_err(|e| SolError::Flush {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl EventSink for KafkaSink {
    fn publish(&self, record: Record) -> Result<()> {
        let Record {
            stream,
            partition,
            key,
            value,
            timestamp_ms,
        } = record;

        let mut outbound = FutureRecord::to(&stream)
            .key(key.as_ref())
            .payload(value.as_ref())
            .timestamp(timestamp_ms);
        if let Some(p) = partition {
            outbound = outbound.partition(p);
        }

        // The delivery future is discarded on purpose: with acks=0 there
        // is no acknowledgment to wait for. send_result only fails
        // synchronously, on a full local queue or an invalid record.
        self.producer
            .send_result(outbound)
            .map(drop)
            .map_err(|(e, _)| SolError::Publish {
                stream: stream.clone(),
                reason: e.to_string(),
            })
    }

    async fn ensure_stream(&self, spec: &StreamSpec) -> Result<()> {
        let mut topic = NewTopic::new(
            &spec.name,
            spec.partitions,
            TopicReplication::Fixed(spec.replication),
        );
        if spec.compacted {
            topic = topic.set("cleanup.policy", "compact");
        }

        let results = self
            .admin
            .create_topics([&topic], &AdminOptions::new())
            .await
            .map_err(|e| SolError::StreamSetup {
                stream: spec.name.clone(),
                reason: e.to_string(),
            })?;

        for result in results {
            match result {
                Ok(name) => info!("created stream '{name}'"),
                Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    debug!("stream '{name}' already exists");
                }
                Err((name, code)) => {
                    return Err(SolError::StreamSetup {
                        stream: name,
                        reason: code.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn subscribe(&self, stream: &str, group: &str) -> Result<Box<dyn SinkConsumer>> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", group)
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| SolError::Subscribe {
                stream: stream.to_string(),
                reason: e.to_string(),
            })?;
        consumer.subscribe(&[stream]).map_err(|e| SolError::Subscribe {
            stream: stream.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(KafkaSinkConsumer { inner: consumer }))
    }
}

struct KafkaSinkConsumer {
    inner: StreamConsumer,
}

#[async_trait]
impl SinkConsumer for KafkaSinkConsumer {
    /// One record per poll; `recv` yields single messages and the
    /// caller's poll loop absorbs the difference.
    async fn poll(&mut self, timeout: Duration) -> Result<Vec<SinkRecord>> {
        match tokio::time::timeout(timeout, self.inner.recv()).await {
            Ok(Ok(message)) => Ok(vec![SinkRecord {
                partition: message.partition(),
                offset: message.offset(),
                key: Bytes::copy_from_slice(message.key().unwrap_or_default()),
                value: Bytes::copy_from_slice(message.payload().unwrap_or_default()),
                timestamp_ms: message.timestamp().to_millis().unwrap_or_default(),
            }]),
            Ok(Err(e)) => Err(SolError::Consume {
                reason: e.to_string(),
            }),
            Err(_) => Ok(Vec::new()),
        }
    }
}
