//! Client-wide constants
//!
//! Centralized defaults and tunables to avoid duplication and ensure
//! consistency between the library, the control tool, and the tests.

// =============================================================================
// Streams
// =============================================================================

/// Default stream for emitted log events
pub const DEFAULT_LOG_TOPIC: &str = "sol-logs";

/// Default compacted stream for logger registrations
pub const DEFAULT_SOURCES_TOPIC: &str = "sol-sources";

/// Default stream for enable/disable commands
pub const DEFAULT_COMMANDS_TOPIC: &str = "sol-commands";

/// Partition count for the log stream
///
/// Every event for one logger lands in `|hash(key)| % LOG_STREAM_PARTITIONS`,
/// so changing this reshuffles per-logger ordering. Fixed per deployment.
pub const LOG_STREAM_PARTITIONS: i32 = 5;

/// Replication factor used when provisioning streams
pub const STREAM_REPLICATION: i32 = 1;

// =============================================================================
// Identity
// =============================================================================

/// Application name used when none is configured
pub const DEFAULT_APP_NAME: &str = "app-noname";

/// Producer client id presented to the sink
pub const PRODUCER_CLIENT_ID: &str = "sol-application-producer";

/// Prefix for command consumer group ids
///
/// The full group id is `sol-command-{app}-{millis}`: unique per process
/// start, so every listener replays the command stream from the beginning.
pub const COMMAND_GROUP_PREFIX: &str = "sol-command";

// =============================================================================
// Timing
// =============================================================================

/// Bounded wait for each command stream poll (seconds)
pub const COMMAND_POLL_TIMEOUT_SECS: u64 = 5;

/// Pause after a failed poll before retrying (milliseconds)
pub const POLL_RETRY_DELAY_MS: u64 = 500;

// =============================================================================
// Wire literals
// =============================================================================

/// Value published to the registry stream alongside a registration key
pub const REGISTRATION_STATUS_PAYLOAD: &str = "{\"status\": \"enabled\"}";

/// Command status value that enables a logger
pub const STATUS_ENABLED: &str = "enabled";

/// Command status value that disables a logger
pub const STATUS_DISABLED: &str = "disabled";

// =============================================================================
// Environment
// =============================================================================

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "SOL_CONFIG";
