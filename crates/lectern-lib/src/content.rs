//! Content generation client — lesson notes, summaries, and quizzes from
//! the generative-language backend.
//!
//! Thin request/response proxies; the interesting engineering lives in the
//! narration pipeline, not here. Unlike synthesis, generation failures are
//! surfaced to the caller rather than degraded silently.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("backend returned no content")]
    Empty,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LessonRequest<'a> {
    topic_title: &'a str,
    chapter_title: &'a str,
    subject_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRequest<'a> {
    topic_title: &'a str,
    chapter_title: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuizRequest<'a> {
    topic_title: &'a str,
}

#[derive(Deserialize)]
struct GenerationResponse {
    content: Option<String>,
    error: Option<String>,
}

/// Client for the generateContent/generateSummary/generateQuiz endpoints.
/// Each takes a JSON body and answers `{ content }`, or `{ error }` with a
/// non-2xx status.
#[derive(Clone)]
pub struct ContentClient {
    client: reqwest::Client,
    base_url: String,
}

impl ContentClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Generate lecture notes for a topic.
    pub async fn lesson(
        &self,
        topic_title: &str,
        chapter_title: &str,
        subject_id: &str,
    ) -> Result<String, ContentError> {
        self.generate(
            "generateContent",
            &LessonRequest {
                topic_title,
                chapter_title,
                subject_id,
            },
        )
        .await
    }

    /// Generate a key-point summary for a topic.
    pub async fn summary(
        &self,
        topic_title: &str,
        chapter_title: &str,
    ) -> Result<String, ContentError> {
        self.generate(
            "generateSummary",
            &SummaryRequest {
                topic_title,
                chapter_title,
            },
        )
        .await
    }

    /// Generate raw quiz markdown for a topic. Parse it with
    /// [`lectern_core::quiz::parse_quiz`].
    pub async fn quiz(&self, topic_title: &str) -> Result<String, ContentError> {
        self.generate("generateQuiz", &QuizRequest { topic_title }).await
    }

    async fn generate<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<String, ContentError> {
        let url = format!("{}/{endpoint}", self.base_url.trim_end_matches('/'));
        debug!("content: POST {url}");

        let resp = self.client.post(&url).json(body).send().await?;
        let status = resp.status();
        let parsed: GenerationResponse = resp.json().await?;

        if !status.is_success() {
            return Err(ContentError::Backend(
                parsed.error.unwrap_or_else(|| status.to_string()),
            ));
        }
        parsed.content.filter(|c| !c.is_empty()).ok_or(ContentError::Empty)
    }
}
