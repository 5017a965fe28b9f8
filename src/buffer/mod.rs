//! Telemetry and attribute buffering
//!
//! Two independent [`KeyValueBuffer`]s hold the values collaborators hand to
//! the coordinator between flushes:
//!
//! - telemetry, encoded as one flat JSON snapshot under a byte budget
//! - attributes, sent key by key and dispatched on the [`Value`] tag
//!
//! Both are upsert-only. Nothing is removed after a flush, so an unchanged
//! value is sent again on every interval.

pub mod store;
pub mod value;

pub use store::{
    BufferKind, KeyValueBuffer, Snapshot, DEFAULT_ATTRIBUTE_CAPACITY, DEFAULT_TELEMETRY_BUDGET,
    DEFAULT_TELEMETRY_CAPACITY,
};
pub use value::Value;
