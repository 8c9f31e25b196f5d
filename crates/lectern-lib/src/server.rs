//! HTTP API for the narration engine.
//!
//! CORS-permissive so a local web frontend can drive playback directly.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use lectern_core::segment::Segment;
use lectern_core::types::NarrationStatus;

use crate::narrator::Narrator;
use crate::transport::SpeechTransport;

/// Build the axum router over a shared [`Narrator`].
pub fn router<T: SpeechTransport>(narrator: Narrator<T>) -> Router {
    Router::new()
        .route("/load", post(load::<T>))
        .route("/play", post(play::<T>))
        .route("/pause", post(pause::<T>))
        .route("/resume", post(resume::<T>))
        .route("/stop", post(stop::<T>))
        .route("/seek", post(seek::<T>))
        .route("/voice", post(voice::<T>))
        .route("/rate", post(rate::<T>))
        .route("/volume", post(volume::<T>))
        .route("/status", get(status::<T>))
        .route("/segments", get(segments::<T>))
        .layer(CorsLayer::permissive())
        .with_state(narrator)
}

#[derive(serde::Deserialize)]
struct LoadRequest {
    text: String,
}

#[derive(serde::Serialize)]
struct LoadResponse {
    ok: bool,
    segments: usize,
}

#[derive(serde::Deserialize)]
struct PlayRequest {
    #[serde(default)]
    from: usize,
}

#[derive(serde::Deserialize)]
struct SeekRequest {
    index: usize,
}

#[derive(serde::Deserialize)]
struct VoiceRequest {
    voice: String,
}

#[derive(serde::Deserialize)]
struct ValueRequest {
    value: f32,
}

#[derive(serde::Serialize)]
struct OkResponse {
    ok: bool,
}

const OK: OkResponse = OkResponse { ok: true };

async fn load<T: SpeechTransport>(
    State(narrator): State<Narrator<T>>,
    Json(req): Json<LoadRequest>,
) -> Json<LoadResponse> {
    narrator.load_text(&req.text);
    Json(LoadResponse {
        ok: true,
        segments: narrator.segments().len(),
    })
}

async fn play<T: SpeechTransport>(
    State(narrator): State<Narrator<T>>,
    Json(req): Json<PlayRequest>,
) -> Json<OkResponse> {
    narrator.play(req.from);
    Json(OK)
}

async fn pause<T: SpeechTransport>(State(narrator): State<Narrator<T>>) -> Json<OkResponse> {
    narrator.pause();
    Json(OK)
}

async fn resume<T: SpeechTransport>(State(narrator): State<Narrator<T>>) -> Json<OkResponse> {
    narrator.resume();
    Json(OK)
}

async fn stop<T: SpeechTransport>(State(narrator): State<Narrator<T>>) -> Json<OkResponse> {
    narrator.stop();
    Json(OK)
}

async fn seek<T: SpeechTransport>(
    State(narrator): State<Narrator<T>>,
    Json(req): Json<SeekRequest>,
) -> Json<OkResponse> {
    narrator.seek(req.index);
    Json(OK)
}

async fn voice<T: SpeechTransport>(
    State(narrator): State<Narrator<T>>,
    Json(req): Json<VoiceRequest>,
) -> Json<OkResponse> {
    narrator.set_voice(req.voice);
    Json(OK)
}

async fn rate<T: SpeechTransport>(
    State(narrator): State<Narrator<T>>,
    Json(req): Json<ValueRequest>,
) -> Json<OkResponse> {
    narrator.set_rate(req.value);
    Json(OK)
}

async fn volume<T: SpeechTransport>(
    State(narrator): State<Narrator<T>>,
    Json(req): Json<ValueRequest>,
) -> Json<OkResponse> {
    narrator.set_volume(req.value);
    Json(OK)
}

async fn status<T: SpeechTransport>(
    State(narrator): State<Narrator<T>>,
) -> Json<NarrationStatus> {
    Json(narrator.status())
}

async fn segments<T: SpeechTransport>(
    State(narrator): State<Narrator<T>>,
) -> Json<Vec<Segment>> {
    Json(narrator.segments().as_ref().clone())
}
