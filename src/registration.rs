//! Registration and command wire formats
//!
//! The registry key is the JSON serialization of a `Registration`. Struct
//! field declaration order is the serialization order, so identical content
//! always produces identical bytes no matter how the input was assembled.
//! The key doubles as the partition routing key and must be byte-stable
//! across processes and restarts.
//!
//! Wire layout (top-level fields alphabetical, host as name/addr):
//!
//! ```json
//! {"app_name":"demo","host":{"name":"web-1","addr":"10.0.0.7"},"logger_name":"svc.worker"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Result as JsonResult;

/// Host identity embedded in a registration
///
/// Fields may be blank when resolution failed; see [`crate::host`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub name: String,
    pub addr: String,
}

/// One-time descriptor binding a logger to its application and host
///
/// Published once per logger to the compacted registry stream and never
/// mutated. Field order here is the wire order; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub app_name: String,
    pub host: HostInfo,
    pub logger_name: String,
}

impl Registration {
    pub fn new(
        app_name: impl Into<String>,
        host: HostInfo,
        logger_name: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            host,
            logger_name: logger_name.into(),
        }
    }

    /// Canonical bytes used as the registry record key and as the partition
    /// routing key for this logger's events
    pub fn registry_key(&self) -> JsonResult<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Partial registration decoded from a command record key
///
/// Only `logger_name` is required; command keys are usually full registry
/// keys, but anything carrying a `logger_name` is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandKey {
    pub logger_name: String,
}

/// Status payload carried by registry and command records
///
/// Kept as a plain string so unrecognized statuses survive decoding and
/// can be reported before being skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStatus {
    pub status: String,
}
