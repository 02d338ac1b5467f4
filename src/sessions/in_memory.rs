//! In-memory session store implementation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use super::traits::{Session, SessionStore, Turn};

struct SessionEntry {
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    transcript: Vec<Turn>,
}

impl SessionEntry {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_activity: now,
            transcript: Vec::new(),
        }
    }

    fn snapshot(&self, id: &str) -> Session {
        Session {
            id: id.to_string(),
            created_at: self.created_at,
            last_activity: self.last_activity,
        }
    }
}

/// An in-memory session store backed by a mutex-protected hash map.
///
/// Get-or-create goes through `HashMap::entry`, so two racing first-time
/// lookups for the same id land on a single transcript.
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, id: &str) -> Result<Session> {
        let mut sessions = self.sessions.lock();
        let entry = sessions
            .entry(id.to_string())
            .or_insert_with(SessionEntry::new);
        Ok(entry.snapshot(id))
    }

    async fn append(&self, id: &str, turn: Turn) -> Result<()> {
        let mut sessions = self.sessions.lock();
        let entry = sessions
            .entry(id.to_string())
            .or_insert_with(SessionEntry::new);
        entry.last_activity = Utc::now();
        entry.transcript.push(turn);
        Ok(())
    }

    async fn transcript(&self, id: &str, limit: Option<usize>) -> Result<Vec<Turn>> {
        let sessions = self.sessions.lock();
        let turns = match sessions.get(id) {
            Some(entry) => entry.transcript.clone(),
            None => return Ok(Vec::new()),
        };

        match limit {
            Some(n) => {
                let start = turns.len().saturating_sub(n);
                Ok(turns[start..].to_vec())
            }
            None => Ok(turns),
        }
    }

    async fn clear(&self, id: &str) -> Result<bool> {
        let mut sessions = self.sessions.lock();
        Ok(sessions.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<Session>> {
        let sessions = self.sessions.lock();
        let mut results: Vec<Session> = sessions
            .iter()
            .map(|(id, entry)| entry.snapshot(id))
            .collect();
        results.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(results)
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::Role;
    use std::sync::Arc;

    #[tokio::test]
    async fn get_or_create_registers_session() {
        let store = InMemorySessionStore::new();

        let created = store.get_or_create("s1").await.unwrap();
        assert_eq!(created.id, "s1");

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "s1");
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = InMemorySessionStore::new();

        let first = store.get_or_create("s1").await.unwrap();
        store.append("s1", Turn::user("hello")).await.unwrap();
        let second = store.get_or_create("s1").await.unwrap();

        // Same underlying session: creation time unchanged, append visible.
        assert_eq!(first.created_at, second.created_at);
        let turns = store.transcript("s1", None).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "hello");
    }

    #[tokio::test]
    async fn transcript_for_unknown_session_is_empty() {
        let store = InMemorySessionStore::new();
        assert!(store.transcript("nope", None).await.unwrap().is_empty());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_preserves_insertion_order() {
        let store = InMemorySessionStore::new();

        for i in 0..5 {
            store
                .append("s1", Turn::user(format!("message {i}")))
                .await
                .unwrap();
        }

        let all = store.transcript("s1", None).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].content, "message 0");
        assert_eq!(all[4].content, "message 4");

        // Limit keeps the most recent turns.
        let last_two = store.transcript("s1", Some(2)).await.unwrap();
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].content, "message 3");
        assert_eq!(last_two[1].content, "message 4");
    }

    #[tokio::test]
    async fn clear_removes_session_and_transcript() {
        let store = InMemorySessionStore::new();
        store.append("s1", Turn::user("hello")).await.unwrap();

        assert!(store.clear("s1").await.unwrap());
        assert!(!store.clear("s1").await.unwrap());
        assert!(store.transcript("s1", None).await.unwrap().is_empty());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_first_time_lookups_create_one_session() {
        let store = Arc::new(InMemorySessionStore::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.get_or_create("shared").await.unwrap()
            }));
        }

        let mut created_at = None;
        for handle in handles {
            let session = handle.await.unwrap();
            match created_at {
                None => created_at = Some(session.created_at),
                Some(t) => assert_eq!(t, session.created_at),
            }
        }

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn roles_round_trip_through_serde() {
        let turn = Turn::new(Role::Assistant, "hi");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"assistant\""));
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::Assistant);
    }
}
