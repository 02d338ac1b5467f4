//! HTTP gateway — the chat UI's entry point into the orchestrator.

pub mod api;

use anyhow::{Context, Result};
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::agent::Orchestrator;
use crate::config::Config;
use crate::sessions::{self, SessionStore};
use crate::voice::{self, SpeechSynthesizer, Transcriber};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<dyn SessionStore>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    pub started_at: std::time::Instant,
}

/// Build the orchestrator and collaborators once, then the router over them.
pub fn build_state(config: &Config) -> Result<AppState> {
    let provider_name = config.default_provider.as_deref().unwrap_or("groq");
    let provider = crate::providers::create_provider_with_url(
        provider_name,
        config.api_key.as_deref(),
        config.api_url.as_deref(),
    )?;

    let sessions: Arc<dyn SessionStore> = Arc::from(sessions::create_session_store());

    let model = config
        .default_model
        .clone()
        .unwrap_or_else(|| "llama-3.1-8b-instant".to_string());

    let orchestrator = Arc::new(
        Orchestrator::new(
            Arc::from(provider),
            Arc::clone(&sessions),
            model,
            config.default_temperature,
        )
        .with_system_prompt(config.agent.system_prompt.clone())
        .with_request_timeout(Duration::from_secs(config.agent.request_timeout_secs))
        .with_max_history_turns(config.agent.max_history_turns),
    );

    let transcriber = if config.voice.enabled {
        Some(Arc::from(voice::create_transcriber(
            &config.voice,
            config.api_key.as_deref(),
        )?))
    } else {
        None
    };

    let synthesizer = if config.voice.enabled && config.voice.reply_audio {
        Some(Arc::from(voice::create_synthesizer(
            &config.voice,
            config.api_key.as_deref(),
        )?))
    } else {
        None
    };

    Ok(AppState {
        orchestrator,
        sessions,
        transcriber,
        synthesizer,
        started_at: std::time::Instant::now(),
    })
}

/// Assemble the router with body-size and timeout layers.
pub fn build_router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/api/chat", post(api::handle_chat))
        .route("/api/voice", post(api::handle_voice))
        .route("/api/sessions", get(api::handle_sessions_list))
        .route(
            "/api/sessions/{id}/transcript",
            get(api::handle_transcript),
        )
        .route("/api/sessions/{id}", delete(api::handle_session_clear))
        .route("/api/status", get(api::handle_status))
        .route("/health", get(api::handle_health))
        .layer(RequestBodyLimitLayer::new(config.gateway.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.gateway.request_timeout_secs,
        )))
        .with_state(state)
}

/// Run the gateway until the process is stopped.
pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local = listener.local_addr()?;
    info!(%local, "gateway listening");

    axum::serve(listener, app)
        .await
        .context("gateway server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_builds_from_default_config() {
        let mut config = Config::default();
        config.api_key = Some("gsk_test".into());
        let state = build_state(&config).unwrap();
        assert_eq!(state.orchestrator.provider_name(), "groq");
        assert!(state.transcriber.is_none());
        assert!(state.synthesizer.is_none());
    }

    #[test]
    fn voice_collaborators_follow_config() {
        let mut config = Config::default();
        config.api_key = Some("gsk_test".into());
        config.voice.enabled = true;
        let state = build_state(&config).unwrap();
        assert!(state.transcriber.is_some());
        assert!(state.synthesizer.is_some());

        config.voice.reply_audio = false;
        let state = build_state(&config).unwrap();
        assert!(state.transcriber.is_some());
        assert!(state.synthesizer.is_none());
    }

    #[test]
    fn router_assembles() {
        let mut config = Config::default();
        config.api_key = Some("gsk_test".into());
        let state = build_state(&config).unwrap();
        let _router = build_router(state, &config);
    }
}
