//! Turn orchestration over sessions and a completion provider.

pub mod orchestrator;

pub use orchestrator::{ChatError, Orchestrator, DEFAULT_SYSTEM_PROMPT};
