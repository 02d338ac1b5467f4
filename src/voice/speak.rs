//! Hosted speech synthesis client (`/audio/speech`).

use async_trait::async_trait;
use serde::Serialize;

use super::traits::SpeechSynthesizer;

/// Text-to-speech via an OpenAI-compatible speech endpoint.
pub struct SpeechClient {
    name: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    voice: String,
    client: reqwest::Client,
}

impl SpeechClient {
    pub fn new(
        name: &str,
        base_url: &str,
        api_key: Option<&str>,
        model: &str,
        voice: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(ToString::to_string),
            model: model.to_string(),
            voice: voice.to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

#[async_trait]
impl SpeechSynthesizer for SpeechClient {
    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            anyhow::anyhow!("{} speech API key not set", self.name)
        })?;

        let request = SpeechRequest {
            model: &self.model,
            voice: &self.voice,
            input: text,
            response_format: "mp3",
        };

        tracing::debug!(provider = %self.name, model = %self.model, chars = text.len(), "speech request");

        let response = self
            .client
            .post(self.speech_url())
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(crate::providers::api_error(&self.name, response).await);
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
