use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::agent::DEFAULT_SYSTEM_PROMPT;

// ── Top-level config ──────────────────────────────────────────────

/// Top-level parley configuration, loaded from `config.toml`.
///
/// Resolution order: `PARLEY_CONFIG_DIR` env → `~/.parley/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// API key for the selected provider. Overridden by `PARLEY_API_KEY` or `API_KEY` env vars.
    pub api_key: Option<String>,
    /// Base URL override for the provider API (e.g. a local OpenAI-compatible server)
    pub api_url: Option<String>,
    /// Default provider ID (`"groq"`, `"openai"`, `"custom:<URL>"`). Default: `"groq"`.
    pub default_provider: Option<String>,
    /// Default model routed through the selected provider.
    pub default_model: Option<String>,
    /// Default model temperature (0.0–2.0). Default: `0.7`.
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,

    /// Exchange orchestration settings (`[agent]`).
    #[serde(default)]
    pub agent: AgentConfig,

    /// Gateway server configuration (`[gateway]`).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Voice pipeline configuration (`[voice]`).
    #[serde(default)]
    pub voice: VoiceConfig,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_provider() -> String {
    "groq".into()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: config_path(),
            api_key: None,
            api_url: None,
            default_provider: Some(default_provider()),
            default_model: Some(default_model()),
            default_temperature: default_temperature(),
            agent: AgentConfig::default(),
            gateway: GatewayConfig::default(),
            voice: VoiceConfig::default(),
        }
    }
}

// ── Agent ────────────────────────────────────────────────────────

/// Exchange orchestration configuration (`[agent]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// System instruction prepended to every model request.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Most-recent transcript turns replayed per request. `0` = unlimited.
    /// The stored transcript is never truncated. Default: `50`.
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
    /// Bounded timeout for one model completion, in seconds. Default: `120`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_max_history_turns() -> usize {
    50
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_history_turns: default_max_history_turns(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ── Gateway ──────────────────────────────────────────────────────

/// Gateway server configuration (`[gateway]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway port (default: 7321)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Maximum request body size in bytes; voice clips arrive base64-encoded.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_gateway_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gateway_port() -> u16 {
    7321
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_max_body_bytes() -> usize {
    8 * 1024 * 1024
}

fn default_gateway_timeout_secs() -> u64 {
    300
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_gateway_host(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

// ── Voice ────────────────────────────────────────────────────────

/// Voice pipeline configuration (`[voice]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Enable the gateway voice endpoint.
    #[serde(default)]
    pub enabled: bool,
    /// Provider serving the audio endpoints (`"groq"`, `"openai"`, `"custom:<URL>"`).
    #[serde(default = "default_voice_provider")]
    pub provider: String,
    /// Base URL override for the voice provider.
    pub api_url: Option<String>,
    /// Hosted transcription model.
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    /// Spoken-language hint (ISO 639-1); auto-detected when unset.
    pub language: Option<String>,
    /// Hosted speech synthesis model.
    #[serde(default = "default_speech_model")]
    pub speech_model: String,
    /// Synthesis voice name.
    #[serde(default = "default_speech_voice")]
    pub speech_voice: String,
    /// Also return synthesized audio for assistant replies.
    #[serde(default = "default_true")]
    pub reply_audio: bool,
}

fn default_voice_provider() -> String {
    "groq".into()
}

fn default_transcription_model() -> String {
    "whisper-large-v3".into()
}

fn default_speech_model() -> String {
    "playai-tts".into()
}

fn default_speech_voice() -> String {
    "Fritz-PlayAI".into()
}

fn default_true() -> bool {
    true
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_voice_provider(),
            api_url: None,
            transcription_model: default_transcription_model(),
            language: None,
            speech_model: default_speech_model(),
            speech_voice: default_speech_voice(),
            reply_audio: true,
        }
    }
}

// ── Load / save ──────────────────────────────────────────────────

/// Directory holding config.toml.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PARLEY_CONFIG_DIR") {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".parley"))
        .unwrap_or_else(|| PathBuf::from(".parley"))
}

fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl Config {
    /// Load config.toml, writing a default one on first run.
    pub async fn load_or_init() -> Result<Self> {
        let path = config_path();

        if fs::try_exists(&path).await.unwrap_or(false) {
            let raw = fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let mut config: Config = toml::from_str(&raw)
                .with_context(|| format!("invalid config at {}", path.display()))?;
            config.config_path = path;
            return Ok(config);
        }

        let config = Config::default();
        config.save().await?;
        tracing::info!(path = %config.config_path.display(), "wrote default config");
        Ok(config)
    }

    /// Apply environment overrides after load.
    pub fn apply_env_overrides(&mut self) {
        for var in ["PARLEY_API_KEY", "API_KEY"] {
            if let Ok(value) = std::env::var(var) {
                let value = value.trim();
                if !value.is_empty() {
                    self.api_key = Some(value.to_string());
                    break;
                }
            }
        }

        if let Ok(value) = std::env::var("PARLEY_API_URL") {
            let value = value.trim();
            if !value.is_empty() {
                self.api_url = Some(value.to_string());
            }
        }

        if let Ok(value) = std::env::var("PARLEY_PROVIDER") {
            let value = value.trim();
            if !value.is_empty() {
                self.default_provider = Some(value.to_string());
            }
        }

        if let Ok(value) = std::env::var("PARLEY_MODEL") {
            let value = value.trim();
            if !value.is_empty() {
                self.default_model = Some(value.to_string());
            }
        }
    }

    /// Write the config back to its path.
    pub async fn save(&self) -> Result<()> {
        let rendered = toml::to_string_pretty(self).context("failed to serialize config")?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        fs::write(&self.config_path, rendered)
            .await
            .with_context(|| format!("failed to write {}", self.config_path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_groq() {
        let config = Config::default();
        assert_eq!(config.default_provider.as_deref(), Some("groq"));
        assert_eq!(config.default_model.as_deref(), Some("llama-3.1-8b-instant"));
        assert!((config.default_temperature - 0.7).abs() < f64::EPSILON);
        assert!(config.agent.system_prompt.contains("helpful assistant"));
        assert!(!config.voice.enabled);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let raw = r#"
            api_key = "gsk_test"
            default_model = "llama-3.3-70b-versatile"

            [voice]
            enabled = true
            language = "hi"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.default_model.as_deref(), Some("llama-3.3-70b-versatile"));
        assert_eq!(config.agent.max_history_turns, 50);
        assert!(config.voice.enabled);
        assert_eq!(config.voice.language.as_deref(), Some("hi"));
        assert_eq!(config.voice.transcription_model, "whisper-large-v3");
        assert_eq!(config.gateway.port, 7321);
    }

    #[tokio::test]
    async fn save_and_reload_round_trips() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.config_path = tmp.path().join("config.toml");
        config.api_key = Some("gsk_roundtrip".into());
        config.gateway.port = 9090;
        config.save().await.unwrap();

        let raw = tokio::fs::read_to_string(&config.config_path).await.unwrap();
        let reloaded: Config = toml::from_str(&raw).unwrap();
        assert_eq!(reloaded.api_key.as_deref(), Some("gsk_roundtrip"));
        assert_eq!(reloaded.gateway.port, 9090);
        assert_eq!(reloaded.agent.request_timeout_secs, 120);
    }
}
