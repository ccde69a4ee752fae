//! Centralized error types for the client
//!
//! All client errors are represented by the `SolError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, SolError>`.
//!
//! None of these errors ever reach application code through `log`,
//! `register` or `capture`. Telemetry is best-effort and failures are
//! absorbed (and reported via `tracing`) at the pipeline boundary. The
//! enum exists for the fallible seams underneath: configuration loading
//! and sink operations.

use std::fmt;
use std::path::PathBuf;

/// All client errors
#[derive(Debug)]
pub enum SolError {
    // === Configuration ===
    /// Failed to read the config file
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse the config file
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Sink ===
    /// Failed to construct a sink client
    SinkInit { reason: String },
    /// Failed to create or verify a stream
    StreamSetup { stream: String, reason: String },
    /// Failed to publish a record
    Publish { stream: String, reason: String },
    /// Failed to flush pending records
    Flush { reason: String },
    /// Failed to subscribe to a stream
    Subscribe { stream: String, reason: String },
    /// Failed to poll a subscription
    Consume { reason: String },
}

impl std::error::Error for SolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigRead { source, .. } => Some(source),
            Self::ConfigParse { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for SolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigRead { path, .. } => {
                write!(f, "Cannot read config file: {}", path.display())
            }
            Self::ConfigParse { path, source } => {
                write!(f, "Config parse error in {}: {}", path.display(), source)
            }
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::SinkInit { reason } => {
                write!(f, "Cannot initialize sink client: {}", reason)
            }
            Self::StreamSetup { stream, reason } => {
                write!(f, "Cannot set up stream '{}': {}", stream, reason)
            }
            Self::Publish { stream, reason } => {
                write!(f, "Cannot publish to '{}': {}", stream, reason)
            }
            Self::Flush { reason } => {
                write!(f, "Cannot flush pending records: {}", reason)
            }
            Self::Subscribe { stream, reason } => {
                write!(f, "Cannot subscribe to '{}': {}", stream, reason)
            }
            Self::Consume { reason } => write!(f, "Poll failed: {}", reason),
        }
    }
}

/// Alias for Result with SolError
pub type Result<T> = std::result::Result<T, SolError>;
