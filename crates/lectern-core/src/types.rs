//! Shared types for the lectern narration engine.
//!
//! These types are used across lectern-lib, lectern-cli, and downstream
//! consumers. Keeping them here means consumers can depend on types without
//! pulling in tokio, rodio, or other heavy deps.

use serde::{Deserialize, Serialize};

// ─── Narration types ───────────────────────────────────────────────────────

/// Default maximum merged-segment length in characters.
pub const DEFAULT_MAX_SEGMENT_LEN: usize = 180;

/// Default look-ahead prefetch window (segments fetched beyond the one
/// currently playing).
pub const DEFAULT_PREFETCH_WINDOW: usize = 5;

/// Default synthesis voice.
pub const DEFAULT_VOICE: &str = "Kore";

/// Narration engine configuration.
#[derive(Debug, Clone)]
pub struct NarrationConfig {
    pub speech_url: String,
    pub voice: String,
    pub rate: f32,
    pub volume: f32,
    pub max_segment_len: usize,
    pub prefetch_window: usize,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            speech_url: "http://localhost:3000/api/generateSpeech".into(),
            voice: DEFAULT_VOICE.into(),
            rate: 1.0,
            volume: 1.0,
            max_segment_len: DEFAULT_MAX_SEGMENT_LEN,
            prefetch_window: DEFAULT_PREFETCH_WINDOW,
        }
    }
}

/// Observable playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Narration status snapshot, published on every externally visible change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationStatus {
    pub state: PlaybackState,
    /// Index of the segment currently playing (or buffering), if any.
    pub active_segment: Option<usize>,
    /// Approximate index of the word being spoken within the active segment.
    pub highlighted_word: Option<usize>,
    /// True while the active segment's audio is being fetched.
    pub buffering: bool,
    pub voice: String,
    pub rate: f32,
    pub volume: f32,
    pub segment_count: usize,
}

impl NarrationStatus {
    pub fn idle(voice: String, rate: f32, volume: f32) -> Self {
        Self {
            state: PlaybackState::Idle,
            active_segment: None,
            highlighted_word: None,
            buffering: false,
            voice,
            rate,
            volume,
            segment_count: 0,
        }
    }
}

// ─── Catalog types ─────────────────────────────────────────────────────────

/// A narratable topic within a chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
}

/// A chapter grouping topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub topics: Vec<Topic>,
}

/// A subject grouping chapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub title: String,
    pub description: String,
    pub chapters: Vec<Chapter>,
}
