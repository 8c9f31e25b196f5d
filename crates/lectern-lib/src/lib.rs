//! lectern-lib — Narration engine.
//!
//! Segment synthesis cache, sequential playback with look-ahead prefetch,
//! word-highlight tracking, content generation client, and HTTP API.
//! Depends on lectern-core for pure types and text processing.

pub mod cache;
pub mod content;
pub mod narrator;
pub mod output;
pub mod pcm;
pub mod server;
pub mod transport;

// Re-export lectern-core for convenience
pub use lectern_core;
