//! Integration tests for the telemetry client
//!
//! Runs the complete flow against the in-memory sink: registration,
//! command replay, gated emission, captures, and shutdown.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use sol::constants::{DEFAULT_COMMANDS_TOPIC, DEFAULT_LOG_TOPIC, DEFAULT_SOURCES_TOPIC};
use sol::{
    partition_for, CommandKey, CommandStatus, Event, EventSink, Logger, MemorySink, Record,
    SinkRecord, Sol, SolConfig,
};

// =============================================================================
// Helpers
// =============================================================================

fn test_config() -> SolConfig {
    SolConfig {
        app_name: "demo".to_string(),
        ..SolConfig::default()
    }
}

/// Put an enable/disable command on the command stream, the way sol-ctl
/// does.
fn publish_command(sink: &MemorySink, logger: &str, status: &str) {
    let key = serde_json::to_vec(&CommandKey {
        logger_name: logger.to_string(),
    })
    .unwrap();
    let value = serde_json::to_vec(&CommandStatus {
        status: status.to_string(),
    })
    .unwrap();
    sink.publish(Record {
        stream: DEFAULT_COMMANDS_TOPIC.to_string(),
        partition: None,
        key: key.into(),
        value: value.into(),
        timestamp_ms: 0,
    })
    .unwrap();
}

/// Registry key a logger announced itself under
fn registry_key(sink: &MemorySink, logger: &str) -> Bytes {
    sink.records(DEFAULT_SOURCES_TOPIC)
        .into_iter()
        .map(|r| r.key)
        .find(|key| {
            serde_json::from_slice::<CommandKey>(key)
                .map(|k| k.logger_name == logger)
                .unwrap_or(false)
        })
        .unwrap_or_else(|| panic!("no registration for {logger}"))
}

fn records_for(sink: &MemorySink, stream: &str, key: &[u8]) -> Vec<SinkRecord> {
    sink.records(stream)
        .into_iter()
        .filter(|r| r.key.as_ref() == key)
        .collect()
}

async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Log through `probe` until one of its records lands, proving the
/// command replay has caught up at least past the probe's own enable
/// command.
async fn wait_until_on(sink: &MemorySink, probe: &Logger) {
    let key = registry_key(sink, probe.name());
    eventually("the probe logger to come on", || {
        probe.log(Event::new().with("probe", true));
        !records_for(sink, DEFAULT_LOG_TOPIC, &key).is_empty()
    })
    .await;
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_emission_is_gated_by_enable_commands() {
    let sink = MemorySink::new();
    let sol = Sol::connect(test_config(), Arc::new(sink.clone())).await;
    let logger = sol.get("svc.worker");

    // Nothing emitted while the logger is off, however often it logs.
    logger.log(Event::new().with("hello", "world"));
    logger.log(Event::new().with("hello", "again"));
    assert!(sink.records(DEFAULT_LOG_TOPIC).is_empty());

    publish_command(&sink, "svc.worker", "enabled");
    eventually("the enable command to take effect", || {
        logger.log(Event::new().with("hello", "world"));
        !sink.records(DEFAULT_LOG_TOPIC).is_empty()
    })
    .await;

    sol.shutdown().await;
}

#[tokio::test]
async fn test_log_records_reuse_the_registry_key() {
    let sink = MemorySink::new();
    // Commands retained from earlier runs are replayed on connect.
    publish_command(&sink, "svc.worker", "enabled");
    publish_command(&sink, "svc.gate", "enabled");

    let sol = Sol::connect(test_config(), Arc::new(sink.clone())).await;
    let worker = sol.get("svc.worker");
    let gate = sol.get("svc.gate");
    wait_until_on(&sink, &gate).await;

    worker.log(Event::new().with("hello", "world"));

    let key = registry_key(&sink, "svc.worker");
    let records = records_for(&sink, DEFAULT_LOG_TOPIC, &key);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].partition, partition_for(&key, 5));
    assert_eq!(records[0].value.as_ref(), br#"{"hello":"world"}"#);
    assert!(records[0].timestamp_ms > 0);

    sol.shutdown().await;
}

#[tokio::test]
async fn test_replay_applies_commands_in_offset_order() {
    let sink = MemorySink::new();
    // The newest command per logger wins, whatever came before it.
    publish_command(&sink, "svc.worker", "enabled");
    publish_command(&sink, "svc.worker", "disabled");
    publish_command(&sink, "svc.gate", "enabled");

    let sol = Sol::connect(test_config(), Arc::new(sink.clone())).await;
    let worker = sol.get("svc.worker");
    let gate = sol.get("svc.gate");
    wait_until_on(&sink, &gate).await;

    // The gate command sits after both worker commands, so the worker's
    // final state is settled by now: disabled.
    worker.log(Event::new().with("hello", "world"));
    let key = registry_key(&sink, "svc.worker");
    assert!(records_for(&sink, DEFAULT_LOG_TOPIC, &key).is_empty());

    sol.shutdown().await;
}

#[tokio::test]
async fn test_disable_switches_emission_off() {
    let sink = MemorySink::new();
    publish_command(&sink, "svc.worker", "enabled");

    let sol = Sol::connect(test_config(), Arc::new(sink.clone())).await;
    let logger = sol.get("svc.worker");
    wait_until_on(&sink, &logger).await;

    publish_command(&sink, "svc.worker", "disabled");
    let key = registry_key(&sink, "svc.worker");
    eventually("the disable command to take effect", || {
        let before = records_for(&sink, DEFAULT_LOG_TOPIC, &key).len();
        logger.log(Event::new().with("hello", "world"));
        records_for(&sink, DEFAULT_LOG_TOPIC, &key).len() == before
    })
    .await;

    sol.shutdown().await;
}

#[tokio::test]
async fn test_capture_flushes_one_merged_event() {
    let sink = MemorySink::new();
    publish_command(&sink, "svc.worker", "enabled");

    let sol = Sol::connect(test_config(), Arc::new(sink.clone())).await;
    let logger = sol.get("svc.worker");
    wait_until_on(&sink, &logger).await;

    let key = registry_key(&sink, "svc.worker");
    let before = records_for(&sink, DEFAULT_LOG_TOPIC, &key).len();

    let capture = logger.capture();
    capture.put("x", 1);
    capture.put("y", 2);
    assert_eq!(records_for(&sink, DEFAULT_LOG_TOPIC, &key).len(), before);
    capture.close();

    let records = records_for(&sink, DEFAULT_LOG_TOPIC, &key);
    assert_eq!(records.len(), before + 1);
    assert_eq!(records.last().unwrap().value.as_ref(), br#"{"x":1,"y":2}"#);

    // An untouched capture still flushes, as an empty event.
    logger.capture().close();
    let records = records_for(&sink, DEFAULT_LOG_TOPIC, &key);
    assert_eq!(records.len(), before + 2);
    assert_eq!(records.last().unwrap().value.as_ref(), b"{}");

    sol.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_emission_is_lossless() {
    let sink = MemorySink::new();
    publish_command(&sink, "svc.a", "enabled");
    publish_command(&sink, "svc.b", "enabled");
    publish_command(&sink, "svc.gate", "enabled");

    let sol = Sol::connect(test_config(), Arc::new(sink.clone())).await;
    let a = sol.get("svc.a");
    let b = sol.get("svc.b");
    let gate = sol.get("svc.gate");
    wait_until_on(&sink, &gate).await;

    // Loggers are plain handles; hammer them from real threads.
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let logger = if i % 2 == 0 { a.clone() } else { b.clone() };
            std::thread::spawn(move || {
                for n in 0..25 {
                    logger.log(Event::new().with("n", n));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let a_key = registry_key(&sink, "svc.a");
    let b_key = registry_key(&sink, "svc.b");
    assert_eq!(records_for(&sink, DEFAULT_LOG_TOPIC, &a_key).len(), 100);
    assert_eq!(records_for(&sink, DEFAULT_LOG_TOPIC, &b_key).len(), 100);

    sol.shutdown().await;
}

#[tokio::test]
async fn test_re_registration_compacts_in_the_registry() {
    let sink = MemorySink::new();

    let first = Sol::connect(test_config(), Arc::new(sink.clone())).await;
    first.get("svc.worker");
    first.shutdown().await;

    // A second process start registers the same logger again; the
    // compacted registry keeps one record per key.
    let second = Sol::connect(test_config(), Arc::new(sink.clone())).await;
    second.get("svc.worker");

    let key = registry_key(&sink, "svc.worker");
    assert_eq!(records_for(&sink, DEFAULT_SOURCES_TOPIC, &key).len(), 1);

    second.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_command_processing() {
    let sink = MemorySink::new();
    publish_command(&sink, "svc.worker", "enabled");

    let sol = Sol::connect(test_config(), Arc::new(sink.clone())).await;
    let logger = sol.get("svc.worker");
    wait_until_on(&sink, &logger).await;
    sol.shutdown().await;

    // The disable lands on the stream but nobody is listening anymore.
    publish_command(&sink, "svc.worker", "disabled");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let key = registry_key(&sink, "svc.worker");
    let before = records_for(&sink, DEFAULT_LOG_TOPIC, &key).len();
    logger.log(Event::new().with("hello", "again"));
    assert_eq!(
        records_for(&sink, DEFAULT_LOG_TOPIC, &key).len(),
        before + 1
    );
}

#[tokio::test]
async fn test_connect_survives_a_dead_backend() {
    use async_trait::async_trait;
    use sol::{Result, SinkConsumer, SolError, StreamSpec};

    struct DeadSink;

    #[async_trait]
    impl EventSink for DeadSink {
        fn publish(&self, record: Record) -> Result<()> {
            Err(SolError::Publish {
                stream: record.stream,
                reason: "backend down".into(),
            })
        }

        async fn ensure_stream(&self, spec: &StreamSpec) -> Result<()> {
            Err(SolError::StreamSetup {
                stream: spec.name.clone(),
                reason: "backend down".into(),
            })
        }

        async fn subscribe(&self, stream: &str, _group: &str) -> Result<Box<dyn SinkConsumer>> {
            Err(SolError::Subscribe {
                stream: stream.to_string(),
                reason: "backend down".into(),
            })
        }
    }

    let sol = Sol::connect(test_config(), Arc::new(DeadSink)).await;
    assert!(!sol.has_listener());

    // Loggers still work; their output just goes nowhere.
    let logger = sol.get("svc.worker");
    logger.log(Event::new().with("hello", "world"));
    let capture = logger.capture();
    capture.put("x", 1);
    capture.close();

    sol.shutdown().await;
}
