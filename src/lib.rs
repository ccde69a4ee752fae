//! Sol - telemetry emission client with a stream-driven control plane
//!
//! Applications hand out named [`Logger`]s that emit key/value events
//! into a partitioned log stream. Each logger announces itself once to a
//! compacted registry stream, and a background listener replays an
//! append-only command stream to switch loggers on and off at runtime.
//! Emission is fire-and-forget throughout: nothing in this crate returns
//! an error to application code, and a dead backend costs telemetry, not
//! uptime.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sol::{Event, MemorySink, Sol, SolConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = Arc::new(MemorySink::new());
//! let sol = Sol::connect(SolConfig::default(), sink).await;
//!
//! let logger = sol.get("svc.worker");
//! // Dropped until the logger is enabled over the command stream.
//! logger.log(Event::new().with("started", true));
//!
//! let capture = logger.capture();
//! capture.put("items", 12);
//! capture.put("elapsed_ms", 340);
//! capture.close(); // one event carrying both pairs
//! # }
//! ```
//!
//! With the `kafka` feature the same client runs against a real broker
//! via [`Sol::from_env`], and the `sol-ctl` binary drives the command
//! stream.

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod emitter;
pub mod enabled;
pub mod error;
pub mod event;
pub mod host;
pub mod listener;
pub mod logger;
pub mod logging;
pub mod registration;
pub mod registry;
pub mod sink;

pub use bootstrap::{install, logger, Sol};
pub use config::SolConfig;
pub use emitter::{partition_for, Emitter, NoopEmitter, Pipeline};
pub use enabled::EnabledSet;
pub use error::{Result, SolError};
pub use event::Event;
pub use listener::ListenerHandle;
pub use logger::{Capture, Logger};
pub use logging::init_tracing;
pub use registration::{CommandKey, CommandStatus, HostInfo, Registration};
pub use registry::LoggerRegistry;
#[cfg(feature = "kafka")]
pub use sink::KafkaSink;
pub use sink::{EventSink, MemorySink, Record, SinkConsumer, SinkRecord, StreamSpec};
