//! `SpeechSynthesizer` trait and its API-backed implementation.

use async_trait::async_trait;

use crate::llm::client::{LlmError, OpenAiClient};

/// Turns text into encoded audio bytes (mp3).
///
/// Synthesis must be idempotent: the audio cache accepts redundant calls for
/// the same key when two misses race.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// `voice_id` is the provider's identifier, not the display name.
    async fn synthesize(&self, text: &str, voice_id: &str, speed: f32) -> Result<Vec<u8>, LlmError>;
}

/// Synthesizes speech through `/v1/audio/speech`.
pub struct ApiSynthesizer {
    client: OpenAiClient,
}

impl ApiSynthesizer {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpeechSynthesizer for ApiSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str, speed: f32) -> Result<Vec<u8>, LlmError> {
        log::debug!("tts: voice={voice_id} speed={speed} chars={}", text.chars().count());
        let audio = self.client.speech(text, voice_id, speed).await?;
        log::debug!("tts: received {} bytes", audio.len());
        Ok(audio)
    }
}
