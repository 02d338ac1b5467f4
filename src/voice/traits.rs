//! Voice collaborator traits: speech-to-text and text-to-speech.

use async_trait::async_trait;

/// Converts a captured audio clip to text.
///
/// `Ok(None)` means the audio could not be understood. That is an expected
/// outcome surfaced to the UI as "please try again", never an error, and no
/// conversation turn is recorded for it.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], filename: &str) -> anyhow::Result<Option<String>>;
    fn name(&self) -> &str;
}

/// Renders assistant text to playable audio.
///
/// Purely a rendering side effect; has no bearing on sessions or transcripts.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>>;
    fn name(&self) -> &str;
}
