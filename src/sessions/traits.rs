//! Session storage traits and types for conversation transcripts.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name as chat-completion APIs expect it.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A tracked conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Storage for conversation sessions and their ordered transcripts.
///
/// Lookups are idempotent: one transcript exists per id for the life of the
/// store, and appends through any handle are visible to subsequent reads.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return the session for `id`, creating an empty one on first reference.
    ///
    /// Concurrent first-time calls for the same unseen id must create exactly
    /// one session.
    async fn get_or_create(&self, id: &str) -> Result<Session>;

    /// Append a turn to the session's transcript, creating the session lazily.
    async fn append(&self, id: &str, turn: Turn) -> Result<()>;

    /// Ordered transcript snapshot. `limit` keeps the most recent turns.
    /// Unknown ids yield an empty transcript.
    async fn transcript(&self, id: &str, limit: Option<usize>) -> Result<Vec<Turn>>;

    /// Discard a session and its transcript entirely, so the next exchange
    /// starts fresh. Returns whether the session existed.
    async fn clear(&self, id: &str) -> Result<bool>;

    /// List sessions, most recently active first.
    async fn list(&self) -> Result<Vec<Session>>;

    /// The name of this session store implementation.
    fn name(&self) -> &str;
}
