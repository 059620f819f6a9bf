//! Audio: synthesized-speech cache and external-player playback.
//!
//! # Pipeline
//!
//! ```text
//! (text, voice, speed) ─▶ AudioCache::put ─▶ <cache>/<sha256>.mp3
//!                                                   │
//!                         PlaybackController::play ◀┘ ─▶ afplay / mpg123 / ...
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dictcli::audio::{detect, AudioCache, PlaybackController, PlaybackOptions};
//! use dictcli::config::{AppConfig, Voice};
//! use dictcli::llm::{ApiSynthesizer, OpenAiClient};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AppConfig::default();
//! let cache = AudioCache::from_config(&config.cache);
//! let synth = ApiSynthesizer::new(OpenAiClient::from_config(&config.llm));
//!
//! let path = cache.put("Where is the station?", Voice::Nova, 1.0, &synth).await?;
//! let player = PlaybackController::new(detect()?);
//! player.play(&path, PlaybackOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod player;
pub mod strategy;

pub use cache::{AudioCache, CacheError};
pub use player::{clamp_speed, PlaybackController, PlaybackError, PlaybackOptions, PlaybackStatus};
pub use strategy::{detect, GenericPlayer, MediaPlayer, PlaybackStrategy, RateControlled};

// test-only re-export so the pipeline tests can drive playback without a
// real audio player.
#[cfg(test)]
pub use strategy::{MockOutcome, MockStrategy};
