//! Testing utilities and mock implementations
//!
//! Lets the coordinator run without a broker or a wall clock.

pub mod mocks;

pub use mocks::*;
