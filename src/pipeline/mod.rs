//! Round orchestration and the shared application state.
//!
//! # Architecture
//!
//! ```text
//! front end (main.rs loop)
//!        │ start_new_round / replay_audio / score_answer / show_gap_fill
//!        ▼
//! RoundOrchestrator ──▶ SentenceGenerator, AudioCache(SpeechSynthesizer),
//!        │              PlaybackController, FallbackScorer, HistorySink
//!        │
//!        ├─ tokio::spawn(PreGeneration)  → RoundState::pre_generated
//!        ▼
//! StateStore (Arc<Mutex<AppState>>) ◀─── read by the front end via snapshot()
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dictcli::audio::{detect, AudioCache, PlaybackController};
//! use dictcli::config::{AppConfig, JsonSettingsStore, SettingsStore};
//! use dictcli::history::JsonlHistory;
//! use dictcli::llm::{ApiGenerator, ApiScorer, ApiSynthesizer, OpenAiClient};
//! use dictcli::locale::UiLanguage;
//! use dictcli::pipeline::{AppState, Collaborators, RoundOrchestrator, StateStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     let store = JsonSettingsStore::default();
//!     let settings = store.load();
//!     let client = OpenAiClient::from_config(&config.llm);
//!     let language = UiLanguage::detect();
//!
//!     let state = StateStore::new(AppState::new(settings.clone()));
//!     let orchestrator = RoundOrchestrator::new(
//!         state.clone(),
//!         Collaborators {
//!             generator: Arc::new(ApiGenerator::new(client.clone())),
//!             synthesizer: Arc::new(ApiSynthesizer::new(client.clone())),
//!             scorer: Arc::new(ApiScorer::new(client, language)),
//!             cache: Arc::new(AudioCache::from_config(&config.cache)),
//!             player: Arc::new(PlaybackController::new(detect()?)),
//!             history: Arc::new(JsonlHistory::default()),
//!             settings_store: Arc::new(store),
//!             language,
//!         },
//!     );
//!
//!     orchestrator.start_new_round(settings).await?;
//!     Ok(())
//! }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{gap_fill, Collaborators, RoundError, RoundOrchestrator};
pub use state::{
    AppState, AudioState, DebugKind, DebugLog, PreGenerated, Round, RoundPhase, RoundState,
    StateStore, ViewState, MAX_DEBUG_LOGS,
};
