//! Remote collaborators for dictcli.
//!
//! This module provides:
//! * [`SentenceGenerator`] / [`ApiGenerator`]: dictation sentence generation.
//! * [`SpeechSynthesizer`] / [`ApiSynthesizer`]: text-to-speech.
//! * [`AnswerScorer`] / [`ApiScorer`]: answer evaluation.
//! * [`FallbackScorer`]: wraps any scorer; scores locally on failure.
//! * [`Prompt`]: generation and scoring prompts.
//! * [`SceneLibrary`]: optional per-topic scenes for generation prompts.
//! * [`OpenAiClient`]: the shared OpenAI-compatible HTTP client.
//! * [`LlmError`]: error variants for every remote call.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use dictcli::config::{AppConfig, Level, Topic};
//! use dictcli::llm::{ApiGenerator, OpenAiClient, SentenceGenerator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = OpenAiClient::from_config(&config.llm);
//!
//!     let generator = ApiGenerator::new(client);
//!     let sentence = generator.generate(Level::B1, Topic::Travel, 8).await.unwrap();
//!     println!("{sentence}");
//! }
//! ```

pub mod client;
pub mod fallback;
pub mod generator;
pub mod prompt;
pub mod scene;
pub mod scorer;
pub mod tts;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{LlmError, OpenAiClient};
pub use fallback::FallbackScorer;
pub use generator::{ApiGenerator, SentenceGenerator};
pub use prompt::Prompt;
pub use scene::SceneLibrary;
pub use scorer::{AnswerScorer, ApiScorer};
pub use tts::{ApiSynthesizer, SpeechSynthesizer};
