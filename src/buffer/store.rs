//! Bounded key/value buffer with budgeted JSON encoding

use super::value::Value;
use crate::error::{TelemetryError, TelemetryResult};
use std::collections::BTreeMap;
use std::fmt;

/// Default telemetry capacity in entries
pub const DEFAULT_TELEMETRY_CAPACITY: usize = 64;
/// Default attribute capacity in entries
pub const DEFAULT_ATTRIBUTE_CAPACITY: usize = 1024;
/// Default encoded telemetry snapshot budget in bytes
pub const DEFAULT_TELEMETRY_BUDGET: usize = 64;

/// Encoded size of an empty JSON object
const EMPTY_OBJECT_LEN: usize = 2;

/// Which buffer an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Time-varying measurements, flushed as one snapshot
    Telemetry,
    /// Long-lived device metadata, flushed key by key
    Attributes,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferKind::Telemetry => f.write_str("telemetry"),
            BufferKind::Attributes => f.write_str("attributes"),
        }
    }
}

/// Key-unique, capacity-bounded mapping from key to [`Value`]
///
/// Entries are kept in ascending key order. Overwrites always succeed; a new
/// key is rejected once the buffer holds `capacity` entries.
#[derive(Debug, Clone)]
pub struct KeyValueBuffer {
    kind: BufferKind,
    capacity: usize,
    entries: BTreeMap<String, Value>,
}

impl KeyValueBuffer {
    pub fn new(kind: BufferKind, capacity: usize) -> Self {
        Self {
            kind,
            capacity,
            entries: BTreeMap::new(),
        }
    }

    pub fn telemetry(capacity: usize) -> Self {
        Self::new(BufferKind::Telemetry, capacity)
    }

    pub fn attributes(capacity: usize) -> Self {
        Self::new(BufferKind::Attributes, capacity)
    }

    /// Insert or overwrite `key`, returning the previous value if any
    pub fn upsert<K, V>(&mut self, key: K, value: V) -> TelemetryResult<Option<Value>>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let key = key.into();
        let value = value.into();

        if let Some(slot) = self.entries.get_mut(&key) {
            return Ok(Some(std::mem::replace(slot, value)));
        }

        if self.entries.len() >= self.capacity {
            return Err(TelemetryError::CapacityExceeded {
                buffer: self.kind,
                key,
                capacity: self.capacity,
            });
        }

        self.entries.insert(key, value);
        Ok(None)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Iterate entries in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Encode the buffer as a flat JSON object no larger than `budget` bytes
    ///
    /// Entries are taken in ascending key order and the longest prefix that
    /// fits is kept. Everything from the first entry that does not fit onward
    /// is dropped, so truncation always removes the alphabetically-last keys.
    pub fn encode_within_budget(&self, budget: usize) -> Snapshot {
        if budget < EMPTY_OBJECT_LEN {
            return Snapshot {
                payload: Vec::new(),
                dropped: self.entries.keys().cloned().collect(),
            };
        }

        let mut body: Vec<u8> = Vec::new();
        let mut dropped = Vec::new();

        for (key, value) in &self.entries {
            if !dropped.is_empty() {
                dropped.push(key.clone());
                continue;
            }

            let entry = match encode_entry(key, value) {
                Ok(entry) => entry,
                Err(_) => {
                    dropped.push(key.clone());
                    continue;
                }
            };

            let separator = usize::from(!body.is_empty());
            if EMPTY_OBJECT_LEN + body.len() + separator + entry.len() > budget {
                dropped.push(key.clone());
                continue;
            }

            if separator == 1 {
                body.push(b',');
            }
            body.extend_from_slice(&entry);
        }

        let mut payload = Vec::with_capacity(body.len() + EMPTY_OBJECT_LEN);
        payload.push(b'{');
        payload.extend_from_slice(&body);
        payload.push(b'}');

        Snapshot { payload, dropped }
    }
}

fn encode_entry(key: &str, value: &Value) -> serde_json::Result<Vec<u8>> {
    let mut entry = serde_json::to_vec(key)?;
    entry.push(b':');
    serde_json::to_writer(&mut entry, value)?;
    Ok(entry)
}

/// One encoded telemetry snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// JSON object bytes, within the requested budget
    pub payload: Vec<u8>,
    /// Keys left out to respect the budget, in key order
    pub dropped: Vec<String>,
}

impl Snapshot {
    pub fn is_truncated(&self) -> bool {
        !self.dropped.is_empty()
    }

    /// Describe the truncation as an overflow error, if any entries were dropped
    pub fn overflow(&self, budget: usize) -> Option<TelemetryError> {
        self.is_truncated()
            .then(|| TelemetryError::SerializationOverflow {
                dropped: self.dropped.clone(),
                budget,
            })
    }
}
