//! PCM payload decoding — base64 16-bit signed LE mono at 24 kHz into
//! normalized f32 samples.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tracing::warn;

/// Synthesis payload format: 24 kHz mono 16-bit signed LE.
pub const PCM_SAMPLE_RATE: u32 = 24_000;
pub const PCM_CHANNELS: u16 = 1;

/// A decoded, playable audio clip. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Normalized samples in [-1, 1].
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Clip duration at playback rate 1.0.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Decode a base64 PCM payload into an [`AudioBuffer`].
///
/// `None` on malformed base64 or an empty payload. An odd trailing byte is
/// dropped rather than rejected — truncated streams still play.
pub fn decode_base64_pcm(payload: &str) -> Option<AudioBuffer> {
    let bytes = match BASE64.decode(payload.trim()) {
        Ok(b) => b,
        Err(e) => {
            warn!("pcm: invalid base64 payload: {e}");
            return None;
        }
    };

    if bytes.len() < 2 {
        warn!("pcm: empty audio payload");
        return None;
    }

    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    Some(AudioBuffer {
        samples,
        sample_rate: PCM_SAMPLE_RATE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(samples: &[i16]) -> String {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        BASE64.encode(bytes)
    }

    #[test]
    fn decodes_normalized_samples() {
        let payload = encode(&[0, 16384, -16384, 32767]);
        let buf = decode_base64_pcm(&payload).unwrap();
        assert_eq!(buf.sample_rate, 24_000);
        assert_eq!(buf.samples[0], 0.0);
        assert_eq!(buf.samples[1], 0.5);
        assert_eq!(buf.samples[2], -0.5);
        assert!((buf.samples[3] - 32767.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn one_second_of_silence() {
        let payload = encode(&vec![0i16; 24_000]);
        let buf = decode_base64_pcm(&payload).unwrap();
        assert_eq!(buf.samples.len(), 24_000);
        assert_eq!(buf.duration(), Duration::from_secs(1));
    }

    #[test]
    fn odd_trailing_byte_dropped() {
        let mut bytes = 100i16.to_le_bytes().to_vec();
        bytes.push(0x42);
        let buf = decode_base64_pcm(&BASE64.encode(bytes)).unwrap();
        assert_eq!(buf.samples.len(), 1);
    }

    #[test]
    fn invalid_base64_is_none() {
        assert!(decode_base64_pcm("not-base-64!!!").is_none());
    }

    #[test]
    fn empty_payload_is_none() {
        assert!(decode_base64_pcm("").is_none());
    }
}
