pub mod schema;

pub use schema::{config_dir, AgentConfig, Config, GatewayConfig, VoiceConfig};
