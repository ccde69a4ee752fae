//! Event payloads
//!
//! An `Event` is the unit a logger emits: a mapping from string keys to
//! JSON values. Keys are unique, insertion order is irrelevant. Backed by
//! a `BTreeMap` so the serialized form is key-ordered regardless of how
//! the event was assembled.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key/value payload emitted through a logger
///
/// Build one with the `with` chain or collect from pairs:
///
/// ```
/// use sol::Event;
///
/// let event = Event::new().with("path", "/api/orders").with("status", 200);
/// assert_eq!(event.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(BTreeMap<String, Value>);

impl Event {
    /// Create an empty event
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; last write wins per key
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a key/value pair; last write wins per key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of key/value pairs
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the event holds no pairs
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Value>> for Event {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Event {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Event {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
