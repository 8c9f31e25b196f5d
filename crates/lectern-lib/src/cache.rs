//! Per-segment synthesis cache with in-flight deduplication.
//!
//! One entry per (voice, segment index, text fingerprint). Concurrent
//! callers asking for the same key fan in to a single network call; a
//! settled failure resolves every waiter to `None` and leaves no entry, so
//! a later attempt may retry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use lectern_core::segment::Segment;

use crate::pcm::{AudioBuffer, decode_base64_pcm};
use crate::transport::SpeechTransport;

/// Characters of segment text folded into the cache key. Guards against a
/// stale index referring to different text after a reflow, without storing
/// the full text as a key.
const FINGERPRINT_LEN: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    voice: String,
    index: usize,
    fingerprint: String,
}

impl CacheKey {
    fn new(segment: &Segment, voice: &str) -> Self {
        Self {
            voice: voice.to_string(),
            index: segment.index,
            fingerprint: segment.text.chars().take(FINGERPRINT_LEN).collect(),
        }
    }
}

type Clip = Option<Arc<AudioBuffer>>;

struct CacheState {
    ready: HashMap<CacheKey, Arc<AudioBuffer>>,
    pending: HashMap<CacheKey, broadcast::Sender<Clip>>,
}

/// Memoized synthesis results for the currently loaded text.
///
/// Cleared in bulk on text change to bound memory.
pub struct AudioCache<T: SpeechTransport> {
    transport: T,
    state: Mutex<CacheState>,
}

enum Action {
    Hit(Arc<AudioBuffer>),
    Wait(broadcast::Receiver<Clip>),
    Fetch,
}

impl<T: SpeechTransport> AudioCache<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(CacheState {
                ready: HashMap::new(),
                pending: HashMap::new(),
            }),
        }
    }

    /// True when the segment's clip is already decoded and ready — the
    /// playback engine uses this to decide whether to surface a buffering
    /// indicator before resolving.
    pub fn is_ready(&self, segment: &Segment, voice: &str) -> bool {
        let key = CacheKey::new(segment, voice);
        self.state.lock().unwrap().ready.contains_key(&key)
    }

    /// Resolve the segment's audio: cache hit, fan in to an in-flight
    /// fetch, or issue a new one. `None` on failure; failures are never
    /// cached.
    pub async fn resolve(&self, segment: &Segment, voice: &str) -> Clip {
        let key = CacheKey::new(segment, voice);

        let action = {
            let mut state = self.state.lock().unwrap();
            if let Some(clip) = state.ready.get(&key) {
                Action::Hit(clip.clone())
            } else if let Some(tx) = state.pending.get(&key) {
                Action::Wait(tx.subscribe())
            } else {
                let (tx, _) = broadcast::channel(1);
                state.pending.insert(key.clone(), tx);
                Action::Fetch
            }
        };

        match action {
            Action::Hit(clip) => Some(clip),
            Action::Wait(mut rx) => {
                debug!("cache: waiting on in-flight fetch for segment {}", key.index);
                rx.recv().await.ok().flatten()
            }
            Action::Fetch => {
                let clip = self.fetch(segment, voice).await;

                // Publish to the ready map before waking waiters so a caller
                // arriving after the pending entry is gone sees the result.
                let tx = {
                    let mut state = self.state.lock().unwrap();
                    if let Some(clip) = &clip {
                        state.ready.insert(key.clone(), clip.clone());
                    }
                    state.pending.remove(&key)
                };
                if let Some(tx) = tx {
                    let _ = tx.send(clip.clone());
                }
                clip
            }
        }
    }

    async fn fetch(&self, segment: &Segment, voice: &str) -> Clip {
        let payload = self.transport.synthesize(&segment.text, voice).await?;
        match decode_base64_pcm(&payload) {
            Some(buffer) => Some(Arc::new(buffer)),
            None => {
                warn!("cache: undecodable payload for segment {}", segment.index);
                None
            }
        }
    }

    /// Drop every entry. Called on topic or tab change.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.ready.clear();
        state.pending.clear();
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

    fn seg(index: usize, text: &str) -> Segment {
        Segment {
            index,
            text: text.to_string(),
            words: text.split_whitespace().map(str::to_string).collect(),
        }
    }

    fn silence_payload(samples: usize) -> String {
        BASE64.encode(vec![0u8; samples * 2])
    }

    /// Transport stub: counts calls, optionally delays, returns a fixed payload.
    struct StubTransport {
        calls: AtomicUsize,
        payload: Option<String>,
        delay: Duration,
    }

    impl StubTransport {
        fn new(payload: Option<String>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                payload,
                delay: Duration::ZERO,
            }
        }

        fn slow(payload: Option<String>) -> Self {
            Self {
                delay: Duration::from_millis(50),
                ..Self::new(payload)
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SpeechTransport for StubTransport {
        async fn synthesize(&self, _text: &str, _voice: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.payload.clone()
        }
    }

    #[tokio::test]
    async fn sequential_resolves_hit_the_cache() {
        let cache = AudioCache::new(StubTransport::new(Some(silence_payload(100))));
        let s = seg(0, "Hello there.");

        let first = cache.resolve(&s, "Kore").await.unwrap();
        let second = cache.resolve(&s, "Kore").await.unwrap();

        assert_eq!(cache.transport.call_count(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn concurrent_resolves_share_one_fetch() {
        let cache = AudioCache::new(StubTransport::slow(Some(silence_payload(100))));
        let s = seg(0, "Hello there.");

        let (a, b) = tokio::join!(cache.resolve(&s, "Kore"), cache.resolve(&s, "Kore"));

        assert_eq!(cache.transport.call_count(), 1);
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    }

    #[tokio::test]
    async fn failure_is_not_cached() {
        let cache = AudioCache::new(StubTransport::new(None));
        let s = seg(0, "Hello there.");

        assert!(cache.resolve(&s, "Kore").await.is_none());
        assert!(cache.resolve(&s, "Kore").await.is_none());

        // Retried, not memoized
        assert_eq!(cache.transport.call_count(), 2);
        assert_eq!(cache.pending_len(), 0);
        assert!(!cache.is_ready(&s, "Kore"));
    }

    #[tokio::test]
    async fn undecodable_payload_resolves_to_none() {
        let cache = AudioCache::new(StubTransport::new(Some("!!not base64!!".into())));
        let s = seg(0, "Hello there.");

        assert!(cache.resolve(&s, "Kore").await.is_none());
        assert_eq!(cache.pending_len(), 0);
    }

    #[tokio::test]
    async fn one_second_of_silence_decodes_to_one_second() {
        let cache = AudioCache::new(StubTransport::new(Some(silence_payload(24_000))));
        let s = seg(0, "One second of silence.");

        let clip = cache.resolve(&s, "Kore").await.unwrap();
        assert_eq!(clip.sample_rate, 24_000);
        assert_eq!(clip.duration(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn voices_are_cached_separately() {
        let cache = AudioCache::new(StubTransport::new(Some(silence_payload(10))));
        let s = seg(0, "Hello there.");

        cache.resolve(&s, "Kore").await.unwrap();
        cache.resolve(&s, "Puck").await.unwrap();

        assert_eq!(cache.transport.call_count(), 2);
        assert!(cache.is_ready(&s, "Kore"));
        assert!(cache.is_ready(&s, "Puck"));
    }

    #[tokio::test]
    async fn same_index_different_text_misses() {
        let cache = AudioCache::new(StubTransport::new(Some(silence_payload(10))));

        cache.resolve(&seg(0, "Original text."), "Kore").await.unwrap();
        cache.resolve(&seg(0, "Reflowed text."), "Kore").await.unwrap();

        assert_eq!(cache.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let cache = AudioCache::new(StubTransport::new(Some(silence_payload(10))));
        let s = seg(0, "Hello there.");

        cache.resolve(&s, "Kore").await.unwrap();
        cache.clear();
        assert!(!cache.is_ready(&s, "Kore"));

        cache.resolve(&s, "Kore").await.unwrap();
        assert_eq!(cache.transport.call_count(), 2);
    }
}
