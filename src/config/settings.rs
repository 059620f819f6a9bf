//! Application configuration structs, defaults and TOML persistence.
//!
//! [`AppConfig`] covers how the tool talks to the outside world (API
//! endpoint and models, cache policy, playback volume).  The learner's
//! practice choices live in [`Settings`](super::Settings) instead, persisted
//! as JSON by a [`SettingsStore`](super::SettingsStore).

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Connection details for the OpenAI-compatible provider used for sentence
/// generation, speech synthesis and scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the API endpoint, without the `/v1/...` suffix.
    pub base_url: String,
    /// API key.  When `None` the `OPENAI_API_KEY` environment variable is
    /// consulted at client construction.
    pub api_key: Option<String>,
    /// Chat model used to generate dictation sentences.
    pub generator_model: String,
    /// Chat model used to score answers.
    pub scorer_model: String,
    /// Speech model used for synthesis.
    pub tts_model: String,
    /// Per-request timeout.  `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            generator_model: "gpt-4o-mini".into(),
            scorer_model: "gpt-4o-mini".into(),
            tts_model: "tts-1-hd".into(),
            timeout_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

/// Audio cache policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory.  `None` uses [`AppPaths::audio_cache_dir`].
    pub dir: Option<PathBuf>,
    /// Seconds a cached file stays valid.
    pub ttl_secs: u64,
    /// Probability (0.0 – 1.0) of running the janitor after a write.
    pub prune_probability: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            ttl_secs: 15 * 60,
            prune_probability: 0.1,
        }
    }
}

impl CacheConfig {
    /// The configured directory, or the platform default.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().audio_cache_dir)
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Audio output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Output volume (0.0 – 1.0).  `None` leaves the player default.
    pub volume: Option<f32>,
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `config.toml`.
///
/// ```rust,no_run
/// use dictcli::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Verbose logging.  `DICTCLI_DEBUG=true` also enables it.
    pub debug: bool,
    pub llm: LlmConfig,
    pub cache: CacheConfig,
    pub playback: PlaybackConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `config.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().config_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `config.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().config_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");

        let mut original = AppConfig::default();
        original.debug = true;
        original.llm.base_url = "http://localhost:8080".into();
        original.llm.api_key = Some("sk-test".into());
        original.llm.timeout_secs = Some(30);
        original.cache.dir = Some(dir.path().join("audio"));
        original.cache.ttl_secs = 60;
        original.playback.volume = Some(0.5);
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert!(loaded.debug);
        assert_eq!(loaded.llm.base_url, "http://localhost:8080");
        assert_eq!(loaded.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(loaded.llm.timeout_secs, Some(30));
        assert_eq!(loaded.llm.tts_model, original.llm.tts_model);
        assert_eq!(loaded.cache.dir, original.cache.dir);
        assert_eq!(loaded.cache.ttl_secs, 60);
        assert_eq!(loaded.playback.volume, Some(0.5));
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert!(!config.debug);
        assert_eq!(config.cache.ttl_secs, 900);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[cache]\nttl_secs = 5\n").unwrap();

        let config = AppConfig::load_from(&path).expect("load");
        assert_eq!(config.cache.ttl_secs, 5);
        assert!((config.cache.prune_probability - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.llm.tts_model, "tts-1-hd");
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.base_url, "https://api.openai.com");
        assert!(cfg.llm.api_key.is_none());
        assert!(cfg.llm.timeout_secs.is_none());
        assert_eq!(cfg.cache.ttl_secs, 15 * 60);
        assert!(cfg.playback.volume.is_none());
    }

    #[test]
    fn resolved_dir_prefers_explicit() {
        let cfg = CacheConfig {
            dir: Some(PathBuf::from("/tmp/x")),
            ..CacheConfig::default()
        };
        assert_eq!(cfg.resolved_dir(), PathBuf::from("/tmp/x"));
    }
}
