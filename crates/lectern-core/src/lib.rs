//! lectern-core — Pure types and text processing.
//!
//! No async runtime, no I/O, no platform dependencies.

pub mod highlight;
pub mod quiz;
pub mod segment;
pub mod types;
