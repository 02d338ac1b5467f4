//! Hosted Whisper transcription client (`/audio/transcriptions`).

use async_trait::async_trait;
use serde::Deserialize;

use super::traits::Transcriber;

/// Speech-to-text via an OpenAI-compatible transcription endpoint.
pub struct WhisperTranscriber {
    name: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    /// Spoken-language hint (e.g. `"hi"`); the service auto-detects when unset.
    language: Option<String>,
    client: reqwest::Client,
}

impl WhisperTranscriber {
    pub fn new(name: &str, base_url: &str, api_key: Option<&str>, model: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(ToString::to_string),
            model: model.to_string(),
            language: None,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    fn transcriptions_url(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }
}

/// Guess a MIME type from the uploaded filename extension.
fn mime_for_filename(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("webm") => "audio/webm",
        Some("ogg") => "audio/ogg",
        _ => "audio/wav",
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &[u8], filename: &str) -> anyhow::Result<Option<String>> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            anyhow::anyhow!("{} transcription API key not set", self.name)
        })?;

        tracing::debug!(
            provider = %self.name,
            model = %self.model,
            bytes = audio.len(),
            "transcription request"
        );

        let file_part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime_for_filename(filename))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());

        if let Some(ref language) = self.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post(self.transcriptions_url())
            .header("Authorization", format!("Bearer {api_key}"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(crate::providers::api_error(&self.name, response).await);
        }

        let parsed: TranscriptionResponse = response.json().await?;

        // An empty transcript means the clip was silence or noise, which the
        // caller treats as "please try again" rather than a failure.
        Ok(parsed
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_guessing_covers_common_formats() {
        assert_eq!(mime_for_filename("clip.mp3"), "audio/mpeg");
        assert_eq!(mime_for_filename("clip.m4a"), "audio/mp4");
        assert_eq!(mime_for_filename("clip.webm"), "audio/webm");
        assert_eq!(mime_for_filename("clip.ogg"), "audio/ogg");
        assert_eq!(mime_for_filename("clip.wav"), "audio/wav");
        assert_eq!(mime_for_filename("noextension"), "audio/wav");
    }

    #[test]
    fn transcriptions_url_built_from_base() {
        let t = WhisperTranscriber::new("groq", "https://api.groq.com/openai/v1/", None, "whisper-large-v3");
        assert_eq!(
            t.transcriptions_url(),
            "https://api.groq.com/openai/v1/audio/transcriptions"
        );
    }

    #[tokio::test]
    async fn transcribe_fails_without_key() {
        let t = WhisperTranscriber::new("groq", "https://api.groq.com/openai/v1", None, "whisper-large-v3");
        let result = t.transcribe(b"RIFF", "clip.wav").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not set"));
    }

    #[test]
    fn empty_transcript_maps_to_absent() {
        let parsed = TranscriptionResponse {
            text: Some("   ".to_string()),
        };
        let text = parsed
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        assert!(text.is_none());
    }
}
