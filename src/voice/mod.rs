//! Voice collaborators: hosted speech-to-text and text-to-speech clients.
//!
//! Both are optional side channels around the chat core: transcription feeds
//! user text in, synthesis renders assistant text out. Neither touches the
//! session store.

pub mod speak;
pub mod traits;
pub mod transcribe;

pub use speak::SpeechClient;
pub use traits::{SpeechSynthesizer, Transcriber};
pub use transcribe::WhisperTranscriber;

use crate::config::VoiceConfig;
use crate::providers;

/// Resolve a voice provider name into (canonical name, base URL).
fn resolve_endpoint<'a>(
    provider: &'a str,
    api_url: Option<&'a str>,
) -> anyhow::Result<(&'a str, &'a str)> {
    let trimmed = provider.trim();

    if let Some(url) = trimmed.strip_prefix("custom:") {
        let url = url.trim();
        if url.is_empty() {
            anyhow::bail!("custom voice provider requires a URL: custom:<URL>");
        }
        return Ok(("custom", url));
    }

    if let Some(url) = api_url {
        return Ok((trimmed, url));
    }

    match providers::default_base_url(trimmed) {
        Some(url) => Ok((trimmed, url)),
        None => anyhow::bail!(
            "Unknown voice provider: {trimmed}. Supported: groq, openai, custom:<URL>."
        ),
    }
}

/// Factory: create the transcription client from config.
pub fn create_transcriber(
    config: &VoiceConfig,
    api_key: Option<&str>,
) -> anyhow::Result<Box<dyn Transcriber>> {
    let (name, base_url) = resolve_endpoint(&config.provider, config.api_url.as_deref())?;
    let key = providers::resolve_provider_credential(name, api_key);

    Ok(Box::new(
        WhisperTranscriber::new(name, base_url, key.as_deref(), &config.transcription_model)
            .with_language(config.language.clone()),
    ))
}

/// Factory: create the speech synthesis client from config.
pub fn create_synthesizer(
    config: &VoiceConfig,
    api_key: Option<&str>,
) -> anyhow::Result<Box<dyn SpeechSynthesizer>> {
    let (name, base_url) = resolve_endpoint(&config.provider, config.api_url.as_deref())?;
    let key = providers::resolve_provider_credential(name, api_key);

    Ok(Box::new(SpeechClient::new(
        name,
        base_url,
        key.as_deref(),
        &config.speech_model,
        &config.speech_voice,
    )))
}
