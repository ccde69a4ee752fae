//! Client bootstrap
//!
//! [`Sol::connect`] wires the client together: it validates the
//! configuration, resolves the host identity, provisions the three
//! streams, and starts the command listener. Setup is deliberately
//! non-fatal at every step. An application embedding telemetry must come
//! up even when the telemetry backend is down, so each failure is
//! reported and costs only the feature it would have provided.

use std::sync::{Arc, OnceLock};

use tracing::{info, warn};

use crate::config::SolConfig;
use crate::constants::{LOG_STREAM_PARTITIONS, STREAM_REPLICATION};
use crate::emitter::{NoopEmitter, Pipeline};
use crate::enabled::EnabledSet;
use crate::host;
use crate::listener::{self, ListenerHandle};
use crate::logger::Logger;
use crate::registry::LoggerRegistry;
use crate::sink::{EventSink, StreamSpec};

/// Connected telemetry client
///
/// Owns the logger registry and the background command listener. Loggers
/// handed out by [`get`](Sol::get) stay valid for the life of the
/// process; dropping the `Sol` only detaches the listener task.
pub struct Sol {
    registry: LoggerRegistry,
    listener: Option<ListenerHandle>,
}

impl Sol {
    /// Connect the client against a sink
    ///
    /// Never fails: an invalid configuration or an unreachable sink
    /// degrades to a client that drops everything, reported via
    /// `tracing`.
    pub async fn connect(config: SolConfig, sink: Arc<dyn EventSink>) -> Sol {
        if let Err(e) = config.validate() {
            warn!("invalid configuration, telemetry disabled: {e}");
            return Sol::noop();
        }

        let host = host::resolve();
        let enabled = Arc::new(EnabledSet::new());
        let pipeline = Arc::new(Pipeline::new(
            &config,
            host,
            Arc::clone(&enabled),
            Arc::clone(&sink),
        ));

        // Streams are provisioned independently; losing one costs that
        // stream's feature, not the whole client.
        let log_spec = StreamSpec::partitioned(
            config.log_topic.clone(),
            LOG_STREAM_PARTITIONS,
            STREAM_REPLICATION,
        );
        if let Err(e) = sink.ensure_stream(&log_spec).await {
            warn!("cannot set up the log stream: {e}");
        }

        let registry_spec = StreamSpec::compacted(config.sources_topic.clone(), STREAM_REPLICATION);
        if let Err(e) = sink.ensure_stream(&registry_spec).await {
            warn!("cannot set up the registry stream: {e}");
        }

        let command_spec = StreamSpec::single(config.commands_topic.clone(), STREAM_REPLICATION);
        let listener = match sink.ensure_stream(&command_spec).await {
            Err(e) => {
                // Without the command stream there is nothing to listen
                // to; loggers then stay disabled until a later start.
                warn!("cannot set up the command stream, runtime control disabled: {e}");
                None
            }
            Ok(()) => {
                let group = listener::group_id(&config.app_name);
                match sink.subscribe(&config.commands_topic, &group).await {
                    Ok(consumer) => Some(listener::spawn(consumer, Arc::clone(&enabled))),
                    Err(e) => {
                        warn!(
                            "cannot subscribe to the command stream, runtime control disabled: {e}"
                        );
                        None
                    }
                }
            }
        };

        info!(app = %config.app_name, "telemetry client connected");
        Sol {
            registry: LoggerRegistry::new(pipeline),
            listener,
        }
    }

    /// Client that drops everything
    pub fn noop() -> Sol {
        Sol {
            registry: LoggerRegistry::new(Arc::new(NoopEmitter)),
            listener: None,
        }
    }

    /// Logger for `name`, registering it on first use
    pub fn get(&self, name: &str) -> Logger {
        self.registry.get(name)
    }

    /// True if the command listener is running
    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Stop the command listener and wait for it to finish
    ///
    /// Emission needs no teardown; records are handed to the sink as they
    /// happen.
    pub async fn shutdown(self) {
        if let Some(listener) = self.listener {
            listener.shutdown().await;
        }
    }
}

#[cfg(feature = "kafka")]
impl Sol {
    /// Connect to Kafka, configured from `SOL_CONFIG`
    ///
    /// Reads the config file named by the environment variable; defaults
    /// apply when it is unset. A file that was asked for but cannot be
    /// loaded disables telemetry instead of silently running on
    /// defaults, as does a sink that cannot be constructed.
    pub async fn from_env() -> Sol {
        let config = match crate::config::config_path() {
            None => SolConfig::default(),
            Some(path) => match crate::config::load_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    warn!("telemetry disabled: {e}");
                    return Sol::noop();
                }
            },
        };
        match crate::sink::KafkaSink::from_config(&config) {
            Ok(sink) => Sol::connect(config, Arc::new(sink)).await,
            Err(e) => {
                warn!("cannot construct the Kafka sink, telemetry disabled: {e}");
                Sol::noop()
            }
        }
    }
}

static DEFAULT: OnceLock<Sol> = OnceLock::new();

/// Install a client as the process default served by [`logger`]
///
/// First come wins. Returns `false` and cancels the rejected client's
/// listener if a default is already installed, including the noop one
/// pinned by touching [`logger`] first.
pub fn install(sol: Sol) -> bool {
    match DEFAULT.set(sol) {
        Ok(()) => true,
        Err(rejected) => {
            // The rejected client would otherwise leak its listener task.
            if let Some(listener) = rejected.listener {
                listener.cancel();
            }
            false
        }
    }
}

/// Logger for `name` from the process default client
///
/// Calling this before [`install`] pins a noop client as the default for
/// the rest of the process.
pub fn logger(name: &str) -> Logger {
    DEFAULT.get_or_init(Sol::noop).get(name)
}
