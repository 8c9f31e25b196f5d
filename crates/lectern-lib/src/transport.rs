//! Synthesis transport — the remote text-to-speech boundary.
//!
//! The endpoint is treated as unreliable and possibly slow. Every failure
//! mode (HTTP error, missing payload, timeout) collapses to `None`; the
//! caller decides what a missing clip means.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Bound on a single synthesis request. A hung fetch is treated as a
/// failure rather than stalling its segment's buffering state forever.
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote speech synthesis: `(text, voice) -> base64 audio payload`.
pub trait SpeechTransport: Send + Sync + 'static {
    /// Synthesize `text` with `voice`. `None` on any failure.
    fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> impl Future<Output = Option<String>> + Send;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechRequest<'a> {
    text: &'a str,
    voice_name: &'a str,
}

#[derive(Deserialize)]
struct SpeechResponse {
    audio: Option<String>,
}

/// HTTP transport against the speech generation endpoint:
/// `POST { text, voiceName } -> { audio: base64 | null }`.
#[derive(Clone)]
pub struct HttpSpeechTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpSpeechTransport {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SYNTHESIS_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }
}

impl SpeechTransport for HttpSpeechTransport {
    async fn synthesize(&self, text: &str, voice: &str) -> Option<String> {
        debug!("synthesize: POST {} chars, voice {voice}", text.len());

        let resp = match self
            .client
            .post(&self.url)
            .json(&SpeechRequest {
                text,
                voice_name: voice,
            })
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                error!("synthesize: endpoint returned {}", resp.status());
                return None;
            }
            Err(e) => {
                error!("synthesize: request failed: {e}");
                return None;
            }
        };

        match resp.json::<SpeechResponse>().await {
            Ok(body) => body.audio,
            Err(e) => {
                error!("synthesize: malformed response body: {e}");
                None
            }
        }
    }
}
