//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (app config, practice settings, history, `scenes/`):
//!   Windows: %APPDATA%\dictcli\
//!   macOS:   ~/Library/Application Support/dictcli/
//!   Linux:   ~/.config/dictcli/
//!
//! Cache dir (synthesized audio):
//!   Windows: %LOCALAPPDATA%\dictcli\audio\
//!   macOS:   ~/Library/Caches/dictcli/audio/
//!   Linux:   ~/.cache/dictcli/audio/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding every file below.
    pub config_dir: PathBuf,
    /// Full path to `config.toml` (API, cache and playback configuration).
    pub config_file: PathBuf,
    /// Full path to `settings.json` (the learner's practice settings).
    pub settings_file: PathBuf,
    /// Full path to `history.jsonl` (one scored round per line).
    pub history_file: PathBuf,
    /// Optional per-topic scene files for sentence generation.
    pub scenes_dir: PathBuf,
    /// Default directory for cached TTS audio.
    pub audio_cache_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "dictcli";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory (config) or the system temp
    /// directory (cache) if the platform cannot provide a standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let audio_cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(Self::APP_NAME)
            .join("audio");

        Self {
            config_file: config_dir.join("config.toml"),
            settings_file: config_dir.join("settings.json"),
            history_file: config_dir.join("history.jsonl"),
            scenes_dir: config_dir.join("scenes"),
            config_dir,
            audio_cache_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.json"));
        assert!(paths
            .history_file
            .file_name()
            .is_some_and(|n| n == "history.jsonl"));
        assert!(paths.audio_cache_dir.ends_with("dictcli/audio"));
        assert!(paths.scenes_dir.starts_with(&paths.config_dir));
    }
}
