//! REST API handlers for the chat front-end.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use base64::Engine;
use serde::Deserialize;
use tracing::warn;

use super::AppState;
use crate::agent::ChatError;

const DEFAULT_SESSION_ID: &str = "default";

// ── Request bodies ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChatBody {
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Deserialize)]
pub struct VoiceBody {
    pub session_id: Option<String>,
    /// Base64-encoded audio clip.
    pub audio: String,
    /// Container format of the clip (wav, mp3, m4a, webm, ogg).
    pub format: Option<String>,
}

// ── Helpers ─────────────────────────────────────────────────────

fn bad_request(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": message})),
    )
}

fn exchange_error(err: &ChatError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match err {
        ChatError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ChatError::Completion(_) | ChatError::Store(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(serde_json::json!({"error": err.to_string()})))
}

/// Empty and whitespace-only messages are rejected before the core runs.
fn validate_message(message: &str) -> Option<&str> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn session_or_default(session_id: Option<String>) -> String {
    session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string())
}

// ── Handlers ────────────────────────────────────────────────────

/// POST /api/chat — run one typed exchange
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> impl IntoResponse {
    let Some(message) = validate_message(&body.message) else {
        return bad_request("message must not be empty").into_response();
    };
    let session_id = session_or_default(body.session_id);

    match state.orchestrator.respond(&session_id, message).await {
        Ok(reply) => Json(serde_json::json!({
            "session_id": session_id,
            "reply": reply,
        }))
        .into_response(),
        Err(err) => exchange_error(&err).into_response(),
    }
}

/// POST /api/voice — transcribe a clip, run the exchange, optionally speak it
pub async fn handle_voice(
    State(state): State<AppState>,
    Json(body): Json<VoiceBody>,
) -> impl IntoResponse {
    let Some(transcriber) = state.transcriber.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": "voice support is disabled"})),
        )
            .into_response();
    };

    let audio = match base64::engine::general_purpose::STANDARD.decode(&body.audio) {
        Ok(bytes) if !bytes.is_empty() => bytes,
        Ok(_) => return bad_request("audio must not be empty").into_response(),
        Err(_) => return bad_request("audio must be valid base64").into_response(),
    };

    let format = body.format.as_deref().unwrap_or("wav");
    let filename = format!("clip.{format}");

    let transcript = match transcriber.transcribe(&audio, &filename).await {
        Ok(Some(text)) => text,
        // Unintelligible audio is an expected outcome: no turn is appended
        // anywhere, the caller just asks the user to try again.
        Ok(None) => {
            return Json(serde_json::json!({
                "transcript": null,
                "hint": "Could not understand the audio. Please try again.",
            }))
            .into_response();
        }
        Err(err) => {
            return (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": format!("transcription failed: {err}")})),
            )
                .into_response();
        }
    };

    let session_id = session_or_default(body.session_id);

    let reply = match state.orchestrator.respond(&session_id, &transcript).await {
        Ok(reply) => reply,
        Err(err) => return exchange_error(&err).into_response(),
    };

    // Synthesis is a rendering side effect; its failure never loses the reply.
    let audio_reply = match state.synthesizer.as_ref() {
        Some(synth) => match synth.synthesize(&reply).await {
            Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            Err(err) => {
                warn!(error = %err, "speech synthesis failed");
                None
            }
        },
        None => None,
    };

    Json(serde_json::json!({
        "session_id": session_id,
        "transcript": transcript,
        "reply": reply,
        "audio": audio_reply,
    }))
    .into_response()
}

/// GET /api/sessions — sessions ordered by recency
pub async fn handle_sessions_list(State(state): State<AppState>) -> impl IntoResponse {
    match state.sessions.list().await {
        Ok(sessions) => Json(serde_json::json!({"sessions": sessions})).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": format!("session list failed: {err}")})),
        )
            .into_response(),
    }
}

/// GET /api/sessions/{id}/transcript — ordered conversation history
pub async fn handle_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.sessions.transcript(&id, None).await {
        Ok(turns) => Json(serde_json::json!({
            "session_id": id,
            "turns": turns,
        }))
        .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": format!("transcript read failed: {err}")})),
        )
            .into_response(),
    }
}

/// DELETE /api/sessions/{id} — clear conversation, next exchange starts fresh
pub async fn handle_session_clear(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.clear(&id).await {
        Ok(cleared) => {
            Json(serde_json::json!({"status": "ok", "cleared": cleared})).into_response()
        }
        Err(err) => exchange_error(&err).into_response(),
    }
}

/// GET /api/status — system status overview
pub async fn handle_status(State(state): State<AppState>) -> impl IntoResponse {
    let session_count = state.sessions.list().await.map(|s| s.len()).unwrap_or(0);

    Json(serde_json::json!({
        "provider": state.orchestrator.provider_name(),
        "model": state.orchestrator.model(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "sessions": session_count,
        "session_store": state.sessions.name(),
        "voice": state.transcriber.is_some(),
    }))
    .into_response()
}

/// GET /health — liveness probe
pub async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}
