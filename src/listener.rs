//! Command listener
//!
//! A background task that replays the command stream and applies each
//! enable/disable to the shared [`EnabledSet`]. Every process start
//! subscribes under a fresh time-unique group, so the subscription has no
//! stored progress and the whole command history is replayed from the
//! earliest retained offset. Applying commands in offset order makes the
//! set converge to the newest command per logger.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::{
    COMMAND_GROUP_PREFIX, COMMAND_POLL_TIMEOUT_SECS, POLL_RETRY_DELAY_MS, STATUS_DISABLED,
    STATUS_ENABLED,
};
use crate::enabled::EnabledSet;
use crate::registration::{CommandKey, CommandStatus};
use crate::sink::{SinkConsumer, SinkRecord};

/// Time-unique consumer group for one process start
///
/// Millisecond resolution is enough to keep concurrently starting
/// instances of the same application in separate groups, which is what
/// guarantees each of them a full replay.
pub fn group_id(app_name: &str) -> String {
    format!(
        "{}-{}-{}",
        COMMAND_GROUP_PREFIX,
        app_name,
        Utc::now().timestamp_millis()
    )
}

/// Handle to a running command listener
pub struct ListenerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Request shutdown without waiting for the task to finish
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Stop the listener and wait for its task to finish
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            warn!("command listener task failed: {e}");
        }
    }
}

/// Spawn the listener on the current runtime
pub fn spawn(consumer: Box<dyn SinkConsumer>, enabled: Arc<EnabledSet>) -> ListenerHandle {
    let token = CancellationToken::new();
    let task = tokio::spawn(run(consumer, enabled, token.clone()));
    ListenerHandle { token, task }
}

/// Poll loop; runs until the token is cancelled
pub async fn run(
    mut consumer: Box<dyn SinkConsumer>,
    enabled: Arc<EnabledSet>,
    token: CancellationToken,
) {
    let poll_timeout = Duration::from_secs(COMMAND_POLL_TIMEOUT_SECS);
    let retry_delay = Duration::from_millis(POLL_RETRY_DELAY_MS);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            polled = consumer.poll(poll_timeout) => match polled {
                Ok(batch) => {
                    for record in batch {
                        apply(&record, &enabled);
                    }
                }
                Err(e) => {
                    warn!("command poll failed: {e}");
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(retry_delay) => {}
                    }
                }
            },
        }
    }
    debug!("command listener stopped");
}

/// Apply one command record to the enabled set
///
/// Undecodable records are reported and skipped; a stream shared with
/// other producers must not be able to wedge the listener.
fn apply(record: &SinkRecord, enabled: &EnabledSet) {
    let key: CommandKey = match serde_json::from_slice(&record.key) {
        Ok(key) => key,
        Err(e) => {
            warn!(offset = record.offset, "skipping command with undecodable key: {e}");
            return;
        }
    };
    let status: CommandStatus = match serde_json::from_slice(&record.value) {
        Ok(status) => status,
        Err(e) => {
            warn!(
                logger = %key.logger_name,
                offset = record.offset,
                "skipping command with undecodable status: {e}"
            );
            return;
        }
    };
    debug!(
        logger = %key.logger_name,
        status = %status.status,
        offset = record.offset,
        "received command"
    );
    match status.status.as_str() {
        STATUS_ENABLED => {
            info!("enabling {}", key.logger_name);
            enabled.enable(&key.logger_name);
        }
        STATUS_DISABLED => {
            info!("disabling {}", key.logger_name);
            enabled.disable(&key.logger_name);
        }
        other => {
            warn!(logger = %key.logger_name, "ignoring command with unknown status '{other}'");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SolError};
    use crate::sink::{EventSink, MemorySink, Record};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::VecDeque;

    fn command_record(offset: i64, key: &[u8], value: &[u8]) -> SinkRecord {
        SinkRecord {
            partition: 0,
            offset,
            key: Bytes::copy_from_slice(key),
            value: Bytes::copy_from_slice(value),
            timestamp_ms: 0,
        }
    }

    fn command(logger: &str, status: &str) -> Record {
        Record {
            stream: "cmd".to_string(),
            partition: None,
            key: Bytes::from(format!(r#"{{"logger_name":"{logger}"}}"#)),
            value: Bytes::from(format!(r#"{{"status":"{status}"}}"#)),
            timestamp_ms: 0,
        }
    }

    async fn wait_until(what: &str, check: impl Fn() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {what}");
    }

    #[test]
    fn group_ids_are_unique_per_start() {
        let id = group_id("demo");
        assert!(id.starts_with("sol-command-demo-"));
        // Two starts in the same millisecond are indistinguishable, so
        // step across one.
        std::thread::sleep(Duration::from_millis(2));
        assert_ne!(id, group_id("demo"));
    }

    #[test]
    fn apply_enables_and_disables() {
        let enabled = EnabledSet::new();

        apply(
            &command_record(0, br#"{"logger_name":"svc.worker"}"#, br#"{"status":"enabled"}"#),
            &enabled,
        );
        assert!(enabled.contains("svc.worker"));

        apply(
            &command_record(1, br#"{"logger_name":"svc.worker"}"#, br#"{"status":"disabled"}"#),
            &enabled,
        );
        assert!(!enabled.contains("svc.worker"));
    }

    #[test]
    fn apply_accepts_full_registry_keys() {
        // Commands may reuse a full registration key; only logger_name
        // matters.
        let enabled = EnabledSet::new();
        let key = br#"{"app_name":"demo","host":{"name":"h","addr":"10.0.0.7"},"logger_name":"svc.worker"}"#;
        apply(&command_record(0, key, br#"{"status":"enabled"}"#), &enabled);
        assert!(enabled.contains("svc.worker"));
    }

    #[test]
    fn apply_skips_undecodable_records() {
        let enabled = EnabledSet::new();
        apply(&command_record(0, b"not json", br#"{"status":"enabled"}"#), &enabled);
        apply(&command_record(1, br#"{"logger_name":"svc.worker"}"#, b"not json"), &enabled);
        apply(
            &command_record(2, br#"{"logger_name":"svc.worker"}"#, br#"{"status":"sideways"}"#),
            &enabled,
        );
        assert!(enabled.is_empty());
    }

    #[test]
    fn disabling_a_logger_never_seen_is_harmless() {
        let enabled = EnabledSet::new();
        apply(
            &command_record(0, br#"{"logger_name":"svc.worker"}"#, br#"{"status":"disabled"}"#),
            &enabled,
        );
        assert!(enabled.is_empty());
    }

    #[tokio::test]
    async fn replay_converges_to_the_newest_command_per_logger() {
        let sink = MemorySink::new();
        sink.publish(command("svc.a", "enabled")).unwrap();
        sink.publish(command("svc.b", "enabled")).unwrap();
        sink.publish(command("svc.a", "disabled")).unwrap();

        let enabled = Arc::new(EnabledSet::new());
        let consumer = sink.subscribe("cmd", &group_id("demo")).await.unwrap();
        let handle = spawn(consumer, Arc::clone(&enabled));

        let view = Arc::clone(&enabled);
        wait_until("replay to converge", move || {
            view.contains("svc.b") && !view.contains("svc.a")
        })
        .await;

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn commands_published_after_start_are_applied() {
        let sink = MemorySink::new();
        let enabled = Arc::new(EnabledSet::new());
        let consumer = sink.subscribe("cmd", &group_id("demo")).await.unwrap();
        let handle = spawn(consumer, Arc::clone(&enabled));

        tokio::time::sleep(Duration::from_millis(20)).await;
        sink.publish(command("svc.live", "enabled")).unwrap();

        let view = Arc::clone(&enabled);
        wait_until("live command to apply", move || view.contains("svc.live")).await;

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_interrupts_a_quiet_poll() {
        let sink = MemorySink::new();
        let consumer = sink.subscribe("cmd", &group_id("demo")).await.unwrap();
        let handle = spawn(consumer, Arc::new(EnabledSet::new()));

        // Let the task settle into its poll before cancelling.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let started = tokio::time::Instant::now();
        handle.shutdown().await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    struct ScriptedConsumer {
        polls: VecDeque<Result<Vec<SinkRecord>>>,
    }

    #[async_trait]
    impl SinkConsumer for ScriptedConsumer {
        async fn poll(&mut self, _timeout: Duration) -> Result<Vec<SinkRecord>> {
            match self.polls.pop_front() {
                Some(result) => result,
                None => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    #[tokio::test]
    async fn poll_failures_do_not_stop_the_listener() {
        let consumer = ScriptedConsumer {
            polls: VecDeque::from([
                Err(SolError::Consume {
                    reason: "transient".into(),
                }),
                Ok(vec![command_record(
                    0,
                    br#"{"logger_name":"svc.worker"}"#,
                    br#"{"status":"enabled"}"#,
                )]),
            ]),
        };

        let enabled = Arc::new(EnabledSet::new());
        let handle = spawn(Box::new(consumer), Arc::clone(&enabled));

        let view = Arc::clone(&enabled);
        wait_until("listener to survive the failed poll", move || {
            view.contains("svc.worker")
        })
        .await;

        handle.shutdown().await;
    }
}
