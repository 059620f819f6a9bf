//! `SentenceGenerator` trait and its API-backed implementation.

use async_trait::async_trait;

use crate::config::{Level, Topic};
use crate::llm::client::{LlmError, OpenAiClient};
use crate::llm::prompt::Prompt;
use crate::llm::scene::SceneLibrary;

/// Produces one dictation sentence for a level, topic and length.
///
/// Implementors must be `Send + Sync` so they can be shared between the
/// foreground round and the background pre-generation task behind an
/// `Arc<dyn SentenceGenerator>`.
#[async_trait]
pub trait SentenceGenerator: Send + Sync {
    /// Returns the sentence, or `LlmError::EmptyResponse` when the provider
    /// gave nothing usable.
    async fn generate(&self, level: Level, topic: Topic, word_count: u32) -> Result<String, LlmError>;
}

/// Generates sentences through a chat-completions endpoint.
pub struct ApiGenerator {
    client: OpenAiClient,
    scenes: SceneLibrary,
}

impl ApiGenerator {
    pub fn new(client: OpenAiClient) -> Self {
        Self {
            client,
            scenes: SceneLibrary::default(),
        }
    }

    /// Draw a scene for each prompt from `scenes`.
    pub fn with_scenes(mut self, scenes: SceneLibrary) -> Self {
        self.scenes = scenes;
        self
    }
}

#[async_trait]
impl SentenceGenerator for ApiGenerator {
    async fn generate(&self, level: Level, topic: Topic, word_count: u32) -> Result<String, LlmError> {
        // `ThreadRng` is not `Send`; build the prompt before the first await.
        let prompt = Prompt::generation_in_scene(
            level,
            topic,
            word_count,
            &self.scenes,
            &mut rand::thread_rng(),
        );
        log::debug!(
            "generator: level={level} topic={:?} words={word_count}",
            prompt.topic
        );

        let raw = self
            .client
            .chat(&self.client.config().generator_model, &prompt, false)
            .await?;

        let sentence = clean_sentence(&raw);
        if sentence.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(sentence)
    }
}

/// Strip wrapping quotes the model sometimes adds around the sentence.
fn clean_sentence(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '“' || c == '”')
        .trim()
        .to_string()
}
