//! Round phases, the `Round` record and the shared application state.
//!
//! [`RoundPhase`] drives the orchestrator's state machine.  A front end
//! reads [`AppState`] through a [`StateStore`] snapshot to decide what to
//! render.
//!
//! [`StateStore`] wraps `Arc<Mutex<AppState>>`: cheap to clone and safe to
//! share across tasks.  Every method takes the lock for one short critical
//! section and never across an `.await`.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audio::PlaybackStatus;
use crate::config::Settings;
use crate::metrics::{ScoringResult, WordError};

/// Entries kept in [`AppState::debug_logs`].
pub const MAX_DEBUG_LOGS: usize = 50;

// ---------------------------------------------------------------------------
// ViewState / RoundPhase
// ---------------------------------------------------------------------------

/// Which screen a front end should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Learning,
    Result,
    Settings,
}

/// Phases of one dictation round.
///
/// ```text
/// Idle ──start──▶ Generating ──▶ Playing ──▶ AwaitingInput
///      (pre-generated round skips Generating)      │
///                                  submit ─────────┘
///                                    ▼
///                                 Scoring ──▶ Result ──start──▶ ...
/// any failure during start ──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundPhase {
    #[default]
    Idle,
    Generating,
    Playing,
    AwaitingInput,
    Scoring,
    Result,
}

impl RoundPhase {
    /// Returns `true` while the orchestrator is doing work on its own.
    ///
    /// ```
    /// use dictcli::pipeline::RoundPhase;
    ///
    /// assert!(RoundPhase::Generating.is_busy());
    /// assert!(RoundPhase::Scoring.is_busy());
    /// assert!(!RoundPhase::AwaitingInput.is_busy());
    /// ```
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            RoundPhase::Generating | RoundPhase::Playing | RoundPhase::Scoring
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            RoundPhase::Idle => "Idle",
            RoundPhase::Generating => "Generating",
            RoundPhase::Playing => "Playing",
            RoundPhase::AwaitingInput => "Listening",
            RoundPhase::Scoring => "Scoring",
            RoundPhase::Result => "Done",
        }
    }
}

// ---------------------------------------------------------------------------
// Round
// ---------------------------------------------------------------------------

/// One dictation exercise.  Scored at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: Uuid,
    pub sentence: String,
    #[serde(default)]
    pub user_input: String,
    #[serde(default)]
    pub score: u8,
    #[serde(default)]
    pub wer: f64,
    #[serde(default)]
    pub errors: Vec<WordError>,
    #[serde(default)]
    pub alternatives: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl Round {
    /// A fresh, unscored round.
    pub fn new(sentence: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sentence: sentence.into(),
            user_input: String::new(),
            score: 0,
            wer: 0.0,
            errors: Vec::new(),
            alternatives: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// This round with the learner's answer and its evaluation applied.
    pub fn scored(mut self, user_input: impl Into<String>, result: ScoringResult) -> Self {
        self.user_input = user_input.into();
        self.score = result.score.min(100);
        self.wer = result.wer.max(0.0);
        self.errors = result.errors;
        self.alternatives = result.alternatives;
        self
    }
}

/// A round prepared in the background, stamped with the settings it was
/// generated for.
#[derive(Debug, Clone, PartialEq)]
pub struct PreGenerated {
    pub round: Round,
    pub settings: Settings,
}

// ---------------------------------------------------------------------------
// AudioState / RoundState / DebugLog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AudioState {
    pub status: PlaybackStatus,
    pub current_file: Option<PathBuf>,
    /// Speed used to resolve cached audio for playback.
    pub speed: f32,
}

impl Default for AudioState {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            current_file: None,
            speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundState {
    pub phase: RoundPhase,
    pub current_round: Option<Round>,
    /// Scored rounds of this session, oldest first.
    pub round_history: Vec<Round>,
    pub is_generating: bool,
    pub is_scoring: bool,
    pub pre_generated: Option<PreGenerated>,
}

impl RoundState {
    /// Whether the round with `id` has already been scored this session.
    pub fn is_scored(&self, id: Uuid) -> bool {
        self.round_history.iter().any(|r| r.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugKind {
    Api,
    Audio,
    State,
    Error,
}

impl DebugKind {
    pub fn label(self) -> &'static str {
        match self {
            DebugKind::Api => "api",
            DebugKind::Audio => "audio",
            DebugKind::State => "state",
            DebugKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebugLog {
    pub timestamp: DateTime<Utc>,
    pub kind: DebugKind,
    pub message: String,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Everything a front end needs to render the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub view: ViewState,
    pub settings: Settings,
    pub audio: AudioState,
    pub rounds: RoundState,
    /// Most recent last; bounded to [`MAX_DEBUG_LOGS`].
    pub debug_logs: VecDeque<DebugLog>,
}

impl AppState {
    /// Initial state for `settings`; audio speed follows the settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            audio: AudioState {
                speed: settings.speed,
                ..AudioState::default()
            },
            settings,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`AppState`].
///
/// Cheap to clone (`Arc` clone).  Methods lock for a short critical section;
/// a poisoned lock is recovered rather than propagated.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<Mutex<AppState>>,
}

impl StateStore {
    pub fn new(state: AppState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access.  Do not call other store methods from
    /// inside `f`.
    pub fn update<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        f(&mut self.lock())
    }

    /// A copy of the whole state.
    pub fn snapshot(&self) -> AppState {
        self.lock().clone()
    }

    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    pub fn current_round(&self) -> Option<Round> {
        self.lock().rounds.current_round.clone()
    }

    pub fn audio_speed(&self) -> f32 {
        self.lock().audio.speed
    }

    pub fn phase(&self) -> RoundPhase {
        self.lock().rounds.phase
    }

    pub fn set_phase(&self, phase: RoundPhase) {
        self.lock().rounds.phase = phase;
    }

    pub fn set_view(&self, view: ViewState) {
        self.lock().view = view;
    }

    pub fn set_audio_status(&self, status: PlaybackStatus) {
        self.lock().audio.status = status;
    }

    pub fn set_generating(&self, generating: bool) {
        self.lock().rounds.is_generating = generating;
    }

    /// Atomically claim the scoring slot for the current round.
    ///
    /// Returns the round to score, or `None` when there is no round, scoring
    /// is already in progress, or the round has already been scored.
    pub fn try_begin_scoring(&self) -> Option<Round> {
        let mut st = self.lock();
        if st.rounds.is_scoring {
            return None;
        }
        let round = st.rounds.current_round.clone()?;
        if st.rounds.is_scored(round.id) {
            return None;
        }
        st.rounds.is_scoring = true;
        st.rounds.phase = RoundPhase::Scoring;
        Some(round)
    }

    pub fn finish_scoring(&self) {
        self.lock().rounds.is_scoring = false;
    }

    pub fn set_pre_generated(&self, pre: PreGenerated) {
        self.lock().rounds.pre_generated = Some(pre);
    }

    /// Remove and return the pre-generated round, if any.
    pub fn take_pre_generated(&self) -> Option<PreGenerated> {
        self.lock().rounds.pre_generated.take()
    }

    /// Record a debug entry, dropping the oldest beyond [`MAX_DEBUG_LOGS`].
    pub fn add_debug_log(&self, kind: DebugKind, message: impl Into<String>) {
        let entry = DebugLog {
            timestamp: Utc::now(),
            kind,
            message: message.into(),
        };
        let mut st = self.lock();
        st.debug_logs.push_back(entry);
        while st.debug_logs.len() > MAX_DEBUG_LOGS {
            st.debug_logs.pop_front();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
