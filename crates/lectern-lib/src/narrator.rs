//! Narration engine — segmented text → pipelined synthesis fetch →
//! strictly sequential playback with word-highlight tracking.
//!
//! Session model: every `play`, `seek`, `stop`, or voice change bumps an
//! [`AtomicU64`] epoch. A spawned session loop re-checks its epoch before
//! every externally visible mutation, so work belonging to a superseded
//! session is silently discarded — no locks, no stale callbacks mutating
//! shared state.
//!
//! Pipeline per session: resolve the active segment through the
//! [`AudioCache`] (fan-in dedup), fire non-blocking prefetches for the
//! look-ahead window, play the clip to completion on the single owned
//! output node, advance. Playback of segment N+1 never begins before N has
//! finished; fetches for N+1..N+window overlap N's playback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::debug;

use lectern_core::highlight;
use lectern_core::segment::{Segment, segment_with_limit};
use lectern_core::types::{NarrationConfig, NarrationStatus, PlaybackState};

use crate::cache::AudioCache;
use crate::output::AudioOutput;
use crate::transport::SpeechTransport;

/// Highlight refresh cadence, roughly a display frame.
const HIGHLIGHT_TICK: Duration = Duration::from_millis(33);

/// Cloneable handle to the narration engine. All methods are non-blocking.
pub struct Narrator<T: SpeechTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: SpeechTransport> Clone for Narrator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<T: SpeechTransport> {
    cache: AudioCache<T>,
    output: Arc<dyn AudioOutput>,
    epoch: AtomicU64,
    shared: Mutex<Shared>,
    status_tx: watch::Sender<NarrationStatus>,
    max_segment_len: usize,
    prefetch_window: usize,
}

struct Shared {
    segments: Arc<Vec<Segment>>,
    voice: String,
    rate: f32,
    volume: f32,
    clock: SegmentClock,
}

/// Wall-clock position within the active segment. Pausing freezes it;
/// resuming continues without drift.
#[derive(Default)]
struct SegmentClock {
    started: Option<Instant>,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl SegmentClock {
    fn start(&mut self) {
        self.started = Some(Instant::now());
        self.paused_at = None;
        self.paused_total = Duration::ZERO;
    }

    fn pause(&mut self) {
        if self.started.is_some() && self.paused_at.is_none() {
            self.paused_at = Some(Instant::now());
        }
    }

    fn resume(&mut self) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += paused_at.elapsed();
        }
    }

    fn elapsed(&self) -> Duration {
        match self.started {
            None => Duration::ZERO,
            Some(started) => {
                let end = self.paused_at.unwrap_or_else(Instant::now);
                end.saturating_duration_since(started)
                    .saturating_sub(self.paused_total)
            }
        }
    }
}

impl<T: SpeechTransport> Narrator<T> {
    /// Build an engine over a synthesis transport and an audio output.
    pub fn new(config: NarrationConfig, transport: T, output: Arc<dyn AudioOutput>) -> Self {
        let status = NarrationStatus::idle(config.voice.clone(), config.rate, config.volume);
        let (status_tx, _) = watch::channel(status);

        Self {
            inner: Arc::new(Inner {
                cache: AudioCache::new(transport),
                output,
                epoch: AtomicU64::new(0),
                shared: Mutex::new(Shared {
                    segments: Arc::new(Vec::new()),
                    voice: config.voice,
                    rate: config.rate,
                    volume: config.volume,
                    clock: SegmentClock::default(),
                }),
                status_tx,
                max_segment_len: config.max_segment_len,
                prefetch_window: config.prefetch_window,
            }),
        }
    }

    /// Segment a new source text, replacing the previous sequence and
    /// clearing the audio cache. Stops any active session.
    pub fn load_text(&self, markdown: &str) {
        self.stop();
        let segments = Arc::new(segment_with_limit(markdown, self.inner.max_segment_len));
        let count = segments.len();
        debug!("narrator: loaded {count} segments");
        self.inner.shared.lock().unwrap().segments = segments;
        self.inner.cache.clear();
        self.inner.update_status(|s| s.segment_count = count);
    }

    /// The current segment sequence, read-only.
    pub fn segments(&self) -> Arc<Vec<Segment>> {
        self.inner.shared.lock().unwrap().segments.clone()
    }

    /// Start a fresh playback session at `from`. Out-of-range or empty
    /// sequences make this a no-op.
    pub fn play(&self, from: usize) {
        let segments = self.segments();
        if from >= segments.len() {
            return;
        }
        let epoch = self.inner.bump_epoch();
        self.inner.output.stop();
        self.inner.update_status(|s| {
            s.state = PlaybackState::Playing;
            s.active_segment = Some(from);
            s.highlighted_word = None;
            s.buffering = false;
        });

        let inner = self.inner.clone();
        tokio::spawn(async move {
            session_loop(inner, epoch, segments, from).await;
        });
    }

    /// Jump to a segment: stop, then start a fresh session there.
    pub fn seek(&self, index: usize) {
        self.play(index);
    }

    /// Suspend playback. Only meaningful while playing.
    pub fn pause(&self) {
        if self.state() != PlaybackState::Playing {
            return;
        }
        self.inner.output.pause();
        self.inner.shared.lock().unwrap().clock.pause();
        self.inner.update_status(|s| s.state = PlaybackState::Paused);
    }

    /// Continue from exactly where playback was suspended.
    pub fn resume(&self) {
        if self.state() != PlaybackState::Paused {
            return;
        }
        self.inner.output.resume();
        self.inner.shared.lock().unwrap().clock.resume();
        self.inner.update_status(|s| s.state = PlaybackState::Playing);
    }

    /// End the current session and release the output node. Safe to call
    /// at any time, including when nothing is playing.
    pub fn stop(&self) {
        self.inner.bump_epoch();
        self.inner.output.stop();
        self.inner.update_status(|s| {
            s.state = PlaybackState::Idle;
            s.active_segment = None;
            s.highlighted_word = None;
            s.buffering = false;
        });
    }

    /// Switch voice. A live session restarts from the active segment under
    /// the new voice; already-played segments are not reissued.
    pub fn set_voice(&self, voice: impl Into<String>) {
        let voice = voice.into();
        self.inner.shared.lock().unwrap().voice = voice.clone();
        self.inner.update_status(|s| s.voice = voice);

        let (state, active) = {
            let status = self.inner.status_tx.borrow();
            (status.state, status.active_segment)
        };
        if state != PlaybackState::Idle {
            if let Some(index) = active {
                self.play(index);
            }
        }
    }

    /// Change playback rate, applied live to the in-flight clip.
    pub fn set_rate(&self, rate: f32) {
        self.inner.shared.lock().unwrap().rate = rate;
        self.inner.output.set_rate(rate);
        self.inner.update_status(|s| s.rate = rate);
    }

    /// Change volume, applied live to the in-flight clip.
    pub fn set_volume(&self, volume: f32) {
        self.inner.shared.lock().unwrap().volume = volume;
        self.inner.output.set_volume(volume);
        self.inner.update_status(|s| s.volume = volume);
    }

    /// Current status snapshot.
    pub fn status(&self) -> NarrationStatus {
        self.inner.status_tx.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<NarrationStatus> {
        self.inner.status_tx.subscribe()
    }

    fn state(&self) -> PlaybackState {
        self.inner.status_tx.borrow().state
    }
}

impl<T: SpeechTransport> Inner<T> {
    fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn update_status(&self, f: impl FnOnce(&mut NarrationStatus)) {
        self.status_tx.send_modify(f);
    }
}

/// One playback session. Runs until the sequence is exhausted or the epoch
/// is superseded; every mutation is gated on the epoch still being current.
async fn session_loop<T: SpeechTransport>(
    inner: Arc<Inner<T>>,
    epoch: u64,
    segments: Arc<Vec<Segment>>,
    mut index: usize,
) {
    while index < segments.len() {
        if !inner.is_current(epoch) {
            return;
        }

        let (voice, rate, volume) = {
            let shared = inner.shared.lock().unwrap();
            (shared.voice.clone(), shared.rate, shared.volume)
        };

        inner.update_status(|s| {
            s.active_segment = Some(index);
            s.highlighted_word = None;
        });

        // Look-ahead prefetch: populate the cache for upcoming segments
        // without blocking the current one. Results land in the cache
        // whatever happens to this session.
        let upper = (index + 1 + inner.prefetch_window).min(segments.len());
        for i in index + 1..upper {
            let inner = inner.clone();
            let segment = segments[i].clone();
            let voice = voice.clone();
            tokio::spawn(async move {
                let _ = inner.cache.resolve(&segment, &voice).await;
            });
        }

        let current = &segments[index];
        let was_ready = inner.cache.is_ready(current, &voice);
        if !was_ready {
            inner.update_status(|s| s.buffering = true);
        }
        let clip = inner.cache.resolve(current, &voice).await;
        if !inner.is_current(epoch) {
            return;
        }
        if !was_ready {
            inner.update_status(|s| s.buffering = false);
        }

        let Some(clip) = clip else {
            debug!("narrator: no audio for segment {index}, skipping");
            index += 1;
            continue;
        };

        // A pause issued while buffering holds the session here so no
        // segment ever starts under a paused session.
        let mut status_rx = inner.status_tx.subscribe();
        while status_rx.borrow().state == PlaybackState::Paused {
            if status_rx.changed().await.is_err() || !inner.is_current(epoch) {
                return;
            }
        }
        if !inner.is_current(epoch) {
            return;
        }

        debug!(
            "narrator: playing segment {index} ({} samples)",
            clip.samples.len()
        );
        inner.shared.lock().unwrap().clock.start();
        let done = inner.output.play(clip.clone(), rate, volume);

        // Starting a clip un-pauses the output node, so a pause() racing
        // in from another thread between the gate above and the play call
        // would be lost. Re-apply it against the live clip.
        if inner.status_tx.borrow().state == PlaybackState::Paused {
            inner.output.pause();
            inner.shared.lock().unwrap().clock.pause();
        }

        tokio::spawn(highlight_ticker(
            inner.clone(),
            epoch,
            index,
            clip.duration(),
            current.word_count(),
        ));

        // Resolves on natural completion; closes when the session is torn
        // down. Either way the epoch check below decides what happens next.
        let _ = done.await;
        if !inner.is_current(epoch) {
            return;
        }

        inner.update_status(|s| s.highlighted_word = None);
        index += 1;
    }

    if inner.is_current(epoch) {
        debug!("narrator: sequence complete");
        inner.update_status(|s| {
            s.state = PlaybackState::Idle;
            s.active_segment = None;
            s.highlighted_word = None;
            s.buffering = false;
        });
    }
}

/// Recomputes the highlighted word on a display-refresh cadence while its
/// segment is actively playing. Frozen while paused, gone when the segment
/// ends or the session is superseded.
async fn highlight_ticker<T: SpeechTransport>(
    inner: Arc<Inner<T>>,
    epoch: u64,
    index: usize,
    duration: Duration,
    word_count: usize,
) {
    let mut interval = tokio::time::interval(HIGHLIGHT_TICK);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        if !inner.is_current(epoch) {
            return;
        }

        let state = {
            let status = inner.status_tx.borrow();
            if status.active_segment != Some(index) {
                return;
            }
            status.state
        };
        match state {
            PlaybackState::Idle => return,
            PlaybackState::Paused => continue,
            PlaybackState::Playing => {}
        }

        let (elapsed, rate) = {
            let shared = inner.shared.lock().unwrap();
            (shared.clock.elapsed(), shared.rate)
        };
        let word = highlight::word_index(elapsed, duration, rate, word_count);
        inner.update_status(|s| {
            if s.highlighted_word != word {
                s.highlighted_word = word;
            }
        });
    }
}
