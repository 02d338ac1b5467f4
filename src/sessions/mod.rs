//! Session management — per-conversation transcripts keyed by caller id.

pub mod in_memory;
pub mod traits;

pub use in_memory::InMemorySessionStore;
pub use traits::{Role, Session, SessionStore, Turn};

/// Create a default in-memory session store.
pub fn create_session_store() -> Box<dyn SessionStore> {
    Box::new(InMemorySessionStore::new())
}
