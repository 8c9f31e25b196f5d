//! Word-highlight estimation — maps elapsed playback time to an approximate
//! currently-spoken word index.
//!
//! The synthesis backend provides no per-word timing, so the estimate assumes
//! uniform word duration across the segment. Good enough for a reading
//! highlight; never used for anything audible.

use std::time::Duration;

/// Estimate the index of the word being spoken.
///
/// `duration` is the audio buffer's length at rate 1.0; `rate` scales it
/// (a segment played at 2.0 finishes in half the time). Returns `None` for
/// an empty segment or zero-length audio, otherwise an index clamped to
/// `[0, word_count - 1]`.
pub fn word_index(
    elapsed: Duration,
    duration: Duration,
    rate: f32,
    word_count: usize,
) -> Option<usize> {
    if word_count == 0 || duration.is_zero() || rate <= 0.0 {
        return None;
    }
    let effective = duration.as_secs_f64() / rate as f64;
    let progress = elapsed.as_secs_f64() / effective;
    let idx = (progress * word_count as f64).floor() as usize;
    Some(idx.min(word_count - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn starts_at_word_zero() {
        assert_eq!(word_index(secs(0.0), secs(10.0), 1.0, 20), Some(0));
    }

    #[test]
    fn advances_linearly() {
        // 10 words over 10 seconds: one word per second
        assert_eq!(word_index(secs(3.5), secs(10.0), 1.0, 10), Some(3));
        assert_eq!(word_index(secs(9.0), secs(10.0), 1.0, 10), Some(9));
    }

    #[test]
    fn clamps_to_last_word() {
        assert_eq!(word_index(secs(99.0), secs(10.0), 1.0, 10), Some(9));
    }

    #[test]
    fn rate_compresses_the_timeline() {
        // At 2x, the 10s buffer plays in 5s: 2 words per wall-clock second
        assert_eq!(word_index(secs(2.0), secs(10.0), 2.0, 10), Some(4));
    }

    #[test]
    fn empty_segment_has_no_highlight() {
        assert_eq!(word_index(secs(1.0), secs(10.0), 1.0, 0), None);
    }

    #[test]
    fn zero_duration_has_no_highlight() {
        assert_eq!(word_index(secs(1.0), secs(0.0), 1.0, 5), None);
    }
}
