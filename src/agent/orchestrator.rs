//! Turn orchestration — one user↔assistant exchange against a session.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::providers::{ChatMessage, Provider};
use crate::sessions::{SessionStore, Turn};

/// System instruction sent ahead of every transcript.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Continue \
the conversation with memory and reply in the same language the user speaks.";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Why an exchange failed. The user turn appended at the start of the
/// exchange always remains in the transcript; the assistant turn is only
/// appended on success.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The completion backend could not produce a reply.
    #[error("model completion failed: {0}")]
    Completion(anyhow::Error),

    /// The completion backend did not answer within the bounded timeout.
    #[error("model completion timed out after {0}s")]
    Timeout(u64),

    /// The session store failed.
    #[error("session store error: {0}")]
    Store(anyhow::Error),
}

/// Runs exchanges: append the user turn, replay the transcript to the model,
/// append the reply.
///
/// Exchanges within one session are serialized; sessions are independent of
/// each other. The orchestrator never retries; that is caller policy.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    sessions: Arc<dyn SessionStore>,
    model: String,
    temperature: f64,
    system_prompt: String,
    request_timeout: Duration,
    /// Most-recent turns replayed per request; `0` means unlimited.
    max_history_turns: usize,
    exchange_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        sessions: Arc<dyn SessionStore>,
        model: impl Into<String>,
        temperature: f64,
    ) -> Self {
        Self {
            provider,
            sessions,
            model: model.into(),
            temperature,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_history_turns: 0,
            exchange_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_history_turns(mut self, max: usize) -> Self {
        self.max_history_turns = max;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Execute one exchange: the caller has already rejected empty input.
    ///
    /// On failure the transcript keeps the orphaned user turn and no
    /// assistant turn, so the session stays continuable.
    pub async fn respond(&self, session_id: &str, user_text: &str) -> Result<String, ChatError> {
        let lock = self.exchange_lock(session_id);
        let _serialized = lock.lock().await;

        self.sessions
            .get_or_create(session_id)
            .await
            .map_err(ChatError::Store)?;
        self.sessions
            .append(session_id, Turn::user(user_text))
            .await
            .map_err(ChatError::Store)?;

        let limit = match self.max_history_turns {
            0 => None,
            n => Some(n),
        };
        let turns = self
            .sessions
            .transcript(session_id, limit)
            .await
            .map_err(ChatError::Store)?;

        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(ChatMessage::system(&self.system_prompt));
        messages.extend(turns.iter().map(ChatMessage::from));

        debug!(session = session_id, turns = turns.len(), "dispatching exchange");

        let completion = tokio::time::timeout(
            self.request_timeout,
            self.provider
                .chat_with_history(&messages, &self.model, self.temperature),
        )
        .await;

        let reply = match completion {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(session = session_id, error = %e, "completion failed");
                return Err(ChatError::Completion(e));
            }
            Err(_) => {
                warn!(session = session_id, "completion timed out");
                return Err(ChatError::Timeout(self.request_timeout.as_secs()));
            }
        };

        self.sessions
            .append(session_id, Turn::assistant(&reply))
            .await
            .map_err(ChatError::Store)?;

        Ok(reply)
    }

    /// Discard a session so the next exchange starts with empty history.
    pub async fn clear(&self, session_id: &str) -> Result<bool, ChatError> {
        let lock = self.exchange_lock(session_id);
        let _serialized = lock.lock().await;

        // The lock entry is kept: a queued exchange must still serialize
        // against whatever follows the clear.
        self.sessions
            .clear(session_id)
            .await
            .map_err(ChatError::Store)
    }

    fn exchange_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.exchange_locks.lock();
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
