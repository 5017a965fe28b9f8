//! Observability for the coordinator
//!
//! Structured logging only: absorbed failures are reported through
//! `tracing` events inside tick and link spans.

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};

// Span macros for structured logging
pub use logging::{link_span, tick_span};
