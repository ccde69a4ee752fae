//! Live set of loggers permitted to emit
//!
//! Starts empty on every process start and is rebuilt by replaying the
//! command stream. The command listener is the only writer; application
//! threads read on every emit. Never persisted.

use parking_lot::RwLock;
use std::collections::HashSet;

/// Command-driven membership set, shared between the listener and the
/// emission pipeline
#[derive(Debug, Default)]
pub struct EnabledSet {
    inner: RwLock<HashSet<String>>,
}

impl EnabledSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the logger is currently permitted to emit
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains(name)
    }

    /// Permit a logger to emit; returns false if it already was
    pub fn enable(&self, name: &str) -> bool {
        self.inner.write().insert(name.to_string())
    }

    /// Revoke a logger's permission to emit; returns false if it had none
    pub fn disable(&self, name: &str) -> bool {
        self.inner.write().remove(name)
    }

    /// Number of enabled loggers
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// True if no logger is enabled
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Sorted copy of the current membership, for diagnostics
    pub fn snapshot(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().iter().cloned().collect();
        names.sort();
        names
    }
}
