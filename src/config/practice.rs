//! Practice settings: voice, CEFR level, topic, sentence length and speed.
//!
//! [`Settings`] is a small immutable snapshot taken at the start of each
//! round.  It is persisted as a single JSON object (`settings.json`) keyed
//! by its five fields, through the [`SettingsStore`] trait.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

/// Narrator voice, by display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Voice {
    #[default]
    Alex,
    Sara,
    Evan,
    Nova,
    Nick,
    Faye,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::Alex,
        Voice::Sara,
        Voice::Evan,
        Voice::Nova,
        Voice::Nick,
        Voice::Faye,
    ];

    /// Name shown to the learner and used in cache keys.
    pub fn display_name(self) -> &'static str {
        match self {
            Voice::Alex => "ALEX",
            Voice::Sara => "SARA",
            Voice::Evan => "EVAN",
            Voice::Nova => "NOVA",
            Voice::Nick => "NICK",
            Voice::Faye => "FAYE",
        }
    }

    /// Voice identifier understood by the speech provider.
    pub fn provider_id(self) -> &'static str {
        match self {
            Voice::Alex => "echo",
            Voice::Sara => "shimmer",
            Voice::Evan => "onyx",
            Voice::Nova => "nova",
            Voice::Nick => "fable",
            Voice::Faye => "alloy",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Voice {
    type Err = SettingsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Voice::ALL
            .into_iter()
            .find(|v| v.display_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SettingsParseError::new("voice", s))
    }
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// CEFR proficiency band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Level {
    #[default]
    #[serde(rename = "CEFR_A1")]
    A1,
    #[serde(rename = "CEFR_A2")]
    A2,
    #[serde(rename = "CEFR_B1")]
    B1,
    #[serde(rename = "CEFR_B2")]
    B2,
    #[serde(rename = "CEFR_C1")]
    C1,
    #[serde(rename = "CEFR_C2")]
    C2,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::A1,
        Level::A2,
        Level::B1,
        Level::B2,
        Level::C1,
        Level::C2,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Level::A1 => "CEFR_A1",
            Level::A2 => "CEFR_A2",
            Level::B1 => "CEFR_B1",
            Level::B2 => "CEFR_B2",
            Level::C1 => "CEFR_C1",
            Level::C2 => "CEFR_C2",
        }
    }

    /// What sentences at this level look like, for the generation prompt.
    pub fn description(self) -> &'static str {
        match self {
            Level::A1 => "very simple sentences with basic vocabulary, present tense only",
            Level::A2 => "simple sentences with common vocabulary, present and past tense",
            Level::B1 => "intermediate sentences with everyday expressions and phrasal verbs",
            Level::B2 => "complex sentences with advanced vocabulary and various tenses",
            Level::C1 => "sophisticated sentences with idioms and nuanced expressions",
            Level::C2 => "native-level sentences with complex structures and rare vocabulary",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Level {
    type Err = SettingsParseError;

    /// Accepts both `CEFR_B1` and the short `b1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Level::ALL
            .into_iter()
            .find(|l| {
                l.code().eq_ignore_ascii_case(wanted)
                    || l.code()[5..].eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| SettingsParseError::new("level", s))
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// Subject area for generated sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Topic {
    #[default]
    EverydayLife,
    Travel,
    Technology,
    Health,
    Entertainment,
    Business,
    /// Sentinel: a concrete topic is drawn per generation.
    Random,
}

impl Topic {
    pub const ALL: [Topic; 7] = [
        Topic::EverydayLife,
        Topic::Travel,
        Topic::Technology,
        Topic::Health,
        Topic::Entertainment,
        Topic::Business,
        Topic::Random,
    ];

    /// Every topic except the [`Topic::Random`] sentinel.
    pub const CONCRETE: [Topic; 6] = [
        Topic::EverydayLife,
        Topic::Travel,
        Topic::Technology,
        Topic::Health,
        Topic::Entertainment,
        Topic::Business,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Topic::EverydayLife => "EverydayLife",
            Topic::Travel => "Travel",
            Topic::Technology => "Technology",
            Topic::Health => "Health",
            Topic::Entertainment => "Entertainment",
            Topic::Business => "Business",
            Topic::Random => "Random",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Topic {
    type Err = SettingsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SettingsParseError::new("topic", s))
    }
}

// ---------------------------------------------------------------------------
// SettingsParseError
// ---------------------------------------------------------------------------

/// A settings field value that is not one of the allowed values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {field}: {value:?}")]
pub struct SettingsParseError {
    pub field: &'static str,
    pub value: String,
}

impl SettingsParseError {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Practice settings snapshot.
///
/// Missing JSON keys are filled from [`Settings::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub voice: Voice,
    pub level: Level,
    pub topic: Topic,
    /// Target sentence length, 5–30 words.
    pub word_count: u32,
    /// Speech rate, 0.5–2.0.
    pub speed: f32,
}

impl Settings {
    pub const MIN_WORDS: u32 = 5;
    pub const MAX_WORDS: u32 = 30;
    pub const MIN_SPEED: f32 = 0.5;
    pub const MAX_SPEED: f32 = 2.0;

    /// Clamp `word_count` and `speed` into their allowed ranges.
    ///
    /// ```
    /// use dictcli::config::Settings;
    ///
    /// let s = Settings { word_count: 99, speed: 0.1, ..Settings::default() }.normalized();
    /// assert_eq!(s.word_count, 30);
    /// assert_eq!(s.speed, 0.5);
    /// ```
    pub fn normalized(mut self) -> Self {
        self.word_count = self.word_count.clamp(Self::MIN_WORDS, Self::MAX_WORDS);
        self.speed = if self.speed.is_finite() {
            self.speed.clamp(Self::MIN_SPEED, Self::MAX_SPEED)
        } else {
            1.0
        };
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            voice: Voice::default(),
            level: Level::default(),
            topic: Topic::default(),
            word_count: 10,
            speed: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// SettingsStore
// ---------------------------------------------------------------------------

/// Source and sink for persisted practice settings.
pub trait SettingsStore: Send + Sync {
    /// Load persisted settings.  Never fails: a missing or unreadable file
    /// yields defaults.
    fn load(&self) -> Settings;

    /// Persist `settings`.
    fn save(&self, settings: &Settings) -> anyhow::Result<()>;
}

/// Stores [`Settings`] as pretty-printed JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for JsonSettingsStore {
    fn default() -> Self {
        Self::new(AppPaths::new().settings_file)
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Settings {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("settings: cannot read {}: {e}", self.path.display());
                }
                return Settings::default();
            }
        };

        match serde_json::from_str::<Settings>(&content) {
            Ok(settings) => settings.normalized(),
            Err(e) => {
                log::warn!("settings: invalid {} ({e}); using defaults", self.path.display());
                Settings::default()
            }
        }
    }

    fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
