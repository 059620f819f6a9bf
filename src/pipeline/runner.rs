//! Round orchestrator: generate → synthesize → play → score.
//!
//! [`RoundOrchestrator`] owns no state of its own beyond a re-entrancy flag;
//! everything a front end renders lives in the injected [`StateStore`].
//!
//! # Round flow
//!
//! ```text
//! start_new_round(settings)
//!   ├─ pre-generated round for the same settings?  adopt it
//!   │  else generate sentence + cache.put audio          [Generating]
//!   ├─ publish round, view = Learning
//!   ├─ resolve cached audio at audio.speed               [Playing]
//!   ├─ spawn pre-generation of the next round (fire-and-forget)
//!   └─ play, then wait for the answer                    [AwaitingInput]
//!
//! score_answer(input)
//!   └─ remote scorer, positional fallback on failure     [Scoring]
//!        └─ publish, append history, view = Result       [Result]
//! ```
//!
//! Duplicate calls are dropped, not queued: a second `start_new_round`
//! while one is running returns immediately, as does a second
//! `score_answer` while scoring.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::audio::{AudioCache, CacheError, PlaybackController, PlaybackError, PlaybackOptions, PlaybackStatus};
use crate::config::{Settings, SettingsStore};
use crate::history::HistorySink;
use crate::llm::{AnswerScorer, FallbackScorer, LlmError, SentenceGenerator, SpeechSynthesizer};
use crate::locale::UiLanguage;

use super::state::{DebugKind, PreGenerated, Round, RoundPhase, StateStore, ViewState};

// ---------------------------------------------------------------------------
// RoundError
// ---------------------------------------------------------------------------

/// Errors surfaced by [`RoundOrchestrator::start_new_round`].
#[derive(Debug, Error)]
pub enum RoundError {
    #[error("sentence generation failed: {0}")]
    GenerationFailed(#[source] LlmError),

    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(#[source] LlmError),

    #[error("audio cache error: {0}")]
    Cache(#[source] io::Error),

    /// The audio for the sentence is not in the cache at the current speed.
    #[error("audio for the current sentence is not cached at this speed")]
    AudioNotCached,

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl From<CacheError> for RoundError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Synthesis(e) => RoundError::SynthesisFailed(e),
            CacheError::Io(e) => RoundError::Cache(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Everything the orchestrator talks to, built once in `main`.
pub struct Collaborators {
    pub generator: Arc<dyn SentenceGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub scorer: Arc<dyn AnswerScorer>,
    pub cache: Arc<AudioCache>,
    pub player: Arc<PlaybackController>,
    pub history: Arc<dyn HistorySink>,
    pub settings_store: Arc<dyn SettingsStore>,
    /// Picks the local fallback explanation language.
    pub language: UiLanguage,
}

// ---------------------------------------------------------------------------
// RoundOrchestrator
// ---------------------------------------------------------------------------

/// Drives dictation rounds.
///
/// ```rust,no_run
/// # async fn example(parts: dictcli::pipeline::Collaborators) {
/// use dictcli::config::Settings;
/// use dictcli::pipeline::{AppState, RoundOrchestrator, StateStore};
///
/// let settings = Settings::default();
/// let state = StateStore::new(AppState::new(settings.clone()));
/// let orchestrator = RoundOrchestrator::new(state.clone(), parts);
///
/// orchestrator.start_new_round(settings).await.unwrap();
/// let scored = orchestrator.score_answer("what I heard").await;
/// # }
/// ```
pub struct RoundOrchestrator {
    state: StateStore,
    generator: Arc<dyn SentenceGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    scorer: FallbackScorer<Arc<dyn AnswerScorer>>,
    cache: Arc<AudioCache>,
    player: Arc<PlaybackController>,
    history: Arc<dyn HistorySink>,
    settings_store: Arc<dyn SettingsStore>,
    volume: Option<f32>,
    is_running: AtomicBool,
}

impl RoundOrchestrator {
    pub fn new(state: StateStore, parts: Collaborators) -> Self {
        Self {
            state,
            generator: parts.generator,
            synthesizer: parts.synthesizer,
            scorer: FallbackScorer::new(parts.scorer, parts.language),
            cache: parts.cache,
            player: parts.player,
            history: parts.history,
            settings_store: parts.settings_store,
            volume: None,
            is_running: AtomicBool::new(false),
        }
    }

    /// Playback volume (0.0 – 1.0) passed to the player.
    pub fn with_volume(mut self, volume: Option<f32>) -> Self {
        self.volume = volume;
        self
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    // -----------------------------------------------------------------------
    // Rounds
    // -----------------------------------------------------------------------

    /// Prepare and play a new round.
    ///
    /// Returns `Ok(())` without doing anything when a round start is already
    /// in progress.  On failure the state is reset to `Idle` with audio
    /// status `Error` and the error is returned.
    pub async fn start_new_round(&self, settings: Settings) -> Result<(), RoundError> {
        if self
            .is_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("round: start ignored, another start is in progress");
            return Ok(());
        }
        let _running = RunningGuard(&self.is_running);

        let settings = settings.normalized();
        match self.run_round(&settings).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state.update(|st| {
                    st.audio.status = PlaybackStatus::Error;
                    st.rounds.is_generating = false;
                    // An answer given during playback keeps its result.
                    if !matches!(st.rounds.phase, RoundPhase::Scoring | RoundPhase::Result) {
                        st.rounds.phase = RoundPhase::Idle;
                    }
                });
                self.state
                    .add_debug_log(DebugKind::Error, format!("round failed: {e}"));
                log::error!("round: {e}");
                Err(e)
            }
        }
    }

    async fn run_round(&self, settings: &Settings) -> Result<(), RoundError> {
        // ── 1. Round: pre-generated or fresh ─────────────────────────────
        let round = match self.adopt_pre_generated(settings).await {
            Some(round) => round,
            None => self.generate_round(settings).await?,
        };

        // ── 2. Publish ───────────────────────────────────────────────────
        self.state.update(|st| {
            st.settings = settings.clone();
            st.rounds.current_round = Some(round.clone());
            st.view = ViewState::Learning;
        });
        self.state
            .add_debug_log(DebugKind::State, format!("round {} published", round.id));

        // ── 3. Resolve audio ─────────────────────────────────────────────
        let speed = self.state.audio_speed();
        let path = self
            .cache
            .get(&round.sentence, settings.voice, speed)
            .await
            .ok_or(RoundError::AudioNotCached)?;

        self.state.update(|st| {
            st.audio.status = PlaybackStatus::Playing;
            st.audio.current_file = Some(path.clone());
            st.rounds.phase = RoundPhase::Playing;
        });

        // ── 4. Prepare the next round while this one plays ───────────────
        self.spawn_pre_generation(settings.clone());

        // ── 5. Play ──────────────────────────────────────────────────────
        self.state
            .add_debug_log(DebugKind::Audio, format!("playing {}", path.display()));
        self.player.play(&path, self.playback_options(speed)).await?;

        self.state.update(|st| {
            // stop_audio() may already have set Stopped.
            if st.audio.status == PlaybackStatus::Playing {
                st.audio.status = PlaybackStatus::Idle;
            }
            // The learner may have answered while the audio played.
            if st.rounds.phase == RoundPhase::Playing {
                st.rounds.phase = RoundPhase::AwaitingInput;
            }
        });
        Ok(())
    }

    /// Take the pre-generated round if it was made for `settings`.
    ///
    /// Its audio may have expired from the cache since it was prepared, so
    /// it is put again; that is a no-op while the file is still fresh.
    async fn adopt_pre_generated(&self, settings: &Settings) -> Option<Round> {
        let pre = self.state.take_pre_generated()?;
        if pre.settings != *settings {
            log::info!("round: discarding pre-generated round made for other settings");
            self.state
                .add_debug_log(DebugKind::State, "discarded stale pre-generated round");
            return None;
        }
        if let Err(e) = self
            .cache
            .put(&pre.round.sentence, settings.voice, settings.speed, self.synthesizer.as_ref())
            .await
        {
            log::warn!("round: pre-generated audio unavailable ({e}), generating afresh");
            self.state
                .add_debug_log(DebugKind::Error, format!("pre-generated audio unavailable: {e}"));
            return None;
        }
        log::debug!("round: using pre-generated round {}", pre.round.id);
        self.state
            .add_debug_log(DebugKind::State, format!("using pre-generated round {}", pre.round.id));
        Some(pre.round)
    }

    async fn generate_round(&self, settings: &Settings) -> Result<Round, RoundError> {
        self.state.update(|st| {
            st.rounds.is_generating = true;
            st.rounds.phase = RoundPhase::Generating;
        });
        self.state.add_debug_log(
            DebugKind::Api,
            format!(
                "generating {} sentence about {} ({} words)",
                settings.level.code(),
                settings.topic.name(),
                settings.word_count
            ),
        );

        let round = produce_round(
            self.generator.as_ref(),
            self.synthesizer.as_ref(),
            &self.cache,
            settings,
        )
        .await?;

        self.state.set_generating(false);
        Ok(round)
    }

    fn spawn_pre_generation(&self, settings: Settings) {
        let task = PreGeneration {
            state: self.state.clone(),
            generator: Arc::clone(&self.generator),
            synthesizer: Arc::clone(&self.synthesizer),
            cache: Arc::clone(&self.cache),
            settings,
        };
        tokio::spawn(task.run());
    }

    // -----------------------------------------------------------------------
    // Audio controls
    // -----------------------------------------------------------------------

    /// Play the current round again at the current audio speed.
    ///
    /// Failures are logged and reflected as audio status `Error`.
    pub async fn replay_audio(&self) {
        let Some(round) = self.state.current_round() else {
            log::debug!("replay: no current round");
            return;
        };
        let (voice, speed) = self.state.update(|st| (st.settings.voice, st.audio.speed));

        let Some(path) = self.cache.get(&round.sentence, voice, speed).await else {
            log::warn!("replay: audio not cached at speed {speed}");
            self.state.set_audio_status(PlaybackStatus::Error);
            self.state
                .add_debug_log(DebugKind::Error, "replay failed: audio not cached");
            return;
        };

        self.state.update(|st| {
            st.audio.status = PlaybackStatus::Playing;
            st.audio.current_file = Some(path.clone());
        });
        self.state
            .add_debug_log(DebugKind::Audio, format!("replaying {}", path.display()));

        match self.player.play(&path, self.playback_options(speed)).await {
            Ok(()) => self.state.update(|st| {
                if st.audio.status == PlaybackStatus::Playing {
                    st.audio.status = PlaybackStatus::Idle;
                }
            }),
            Err(e) => {
                log::warn!("replay: {e}");
                self.state.set_audio_status(PlaybackStatus::Error);
                self.state
                    .add_debug_log(DebugKind::Error, format!("replay failed: {e}"));
            }
        }
    }

    /// Stop playback.  Never fails.
    pub async fn stop_audio(&self) {
        self.player.stop().await;
        let status = match self.player.status() {
            PlaybackStatus::Error => PlaybackStatus::Error,
            _ => PlaybackStatus::Stopped,
        };
        self.state.set_audio_status(status);
        self.state.add_debug_log(DebugKind::Audio, "playback stopped");
    }

    fn playback_options(&self, speed: f32) -> PlaybackOptions {
        PlaybackOptions {
            speed: Some(speed),
            volume: self.volume,
        }
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    /// Score `input` against the current round.
    ///
    /// Returns the scored round, or `None` when there is no current round,
    /// another answer is being scored, or this round was already scored.
    pub async fn score_answer(&self, input: &str) -> Option<Round> {
        let Some(round) = self.state.try_begin_scoring() else {
            log::info!("score: no unscored round or already scoring, submission ignored");
            return None;
        };
        let _scoring = ScoringGuard(&self.state);

        self.state.add_debug_log(DebugKind::Api, "scoring answer");
        let result = self.scorer.score_or_fallback(&round.sentence, input).await;
        let scored = round.scored(input, result);

        self.state.update(|st| {
            st.rounds.current_round = Some(scored.clone());
            st.rounds.round_history.push(scored.clone());
        });

        if let Err(e) = self.history.append(&scored).await {
            log::warn!("score: cannot save history: {e}");
            self.state
                .add_debug_log(DebugKind::Error, format!("history append failed: {e}"));
        }

        self.state.update(|st| {
            st.view = ViewState::Result;
            st.rounds.phase = RoundPhase::Result;
        });
        self.state
            .add_debug_log(DebugKind::State, format!("scored {}/100", scored.score));
        Some(scored)
    }

    /// The current sentence as a gap-fill hint, or `""` without a round.
    pub fn show_gap_fill(&self) -> String {
        self.state
            .current_round()
            .map(|round| gap_fill(&round.sentence))
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Apply and persist new settings; returns the normalized settings.
    ///
    /// The playback speed follows the new settings and any pre-generated
    /// round is discarded.  Persistence failures are logged only.
    pub fn save_settings(&self, settings: Settings) -> Settings {
        let settings = settings.normalized();
        self.state.update(|st| {
            st.settings = settings.clone();
            st.audio.speed = settings.speed;
            st.rounds.pre_generated = None;
        });

        match self.settings_store.save(&settings) {
            Ok(()) => self.state.add_debug_log(DebugKind::State, "settings saved"),
            Err(e) => {
                log::warn!("settings: cannot save: {e}");
                self.state
                    .add_debug_log(DebugKind::Error, format!("settings save failed: {e}"));
            }
        }
        settings
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Mask every word but the first and last with one `_` per character.
///
/// ```
/// use dictcli::pipeline::gap_fill;
///
/// assert_eq!(gap_fill("I like green tea"), "I ____ _____ tea");
/// assert_eq!(gap_fill("Hello world"), "Hello world");
/// ```
pub fn gap_fill(sentence: &str) -> String {
    let words: Vec<&str> = sentence.split(' ').collect();
    if words.len() <= 2 {
        return sentence.to_string();
    }
    let last = words.len() - 1;
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            if i == 0 || i == last {
                (*word).to_string()
            } else {
                "_".repeat(word.chars().count())
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generate a sentence and make sure its audio is cached.
async fn produce_round(
    generator: &dyn SentenceGenerator,
    synthesizer: &dyn SpeechSynthesizer,
    cache: &AudioCache,
    settings: &Settings,
) -> Result<Round, RoundError> {
    let sentence = generator
        .generate(settings.level, settings.topic, settings.word_count)
        .await
        .map_err(RoundError::GenerationFailed)?;
    cache
        .put(&sentence, settings.voice, settings.speed, synthesizer)
        .await?;
    Ok(Round::new(sentence))
}

/// Background preparation of the next round for a fixed settings snapshot.
struct PreGeneration {
    state: StateStore,
    generator: Arc<dyn SentenceGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    cache: Arc<AudioCache>,
    settings: Settings,
}

impl PreGeneration {
    async fn run(self) {
        let result = produce_round(
            self.generator.as_ref(),
            self.synthesizer.as_ref(),
            &self.cache,
            &self.settings,
        )
        .await;

        match result {
            Ok(round) => {
                log::debug!("pre-generation: round {} ready", round.id);
                self.state
                    .add_debug_log(DebugKind::State, "next round pre-generated");
                self.state.set_pre_generated(PreGenerated {
                    round,
                    settings: self.settings,
                });
            }
            Err(e) => {
                log::warn!("pre-generation failed: {e}");
                self.state
                    .add_debug_log(DebugKind::Error, format!("pre-generation failed: {e}"));
            }
        }
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct ScoringGuard<'a>(&'a StateStore);

impl Drop for ScoringGuard<'_> {
    fn drop(&mut self) {
        self.0.finish_scoring();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
