//! Application entry point: dictation practice in the terminal.
//!
//! # Startup sequence
//!
//! 1. Load [`AppConfig`] (default on first run) and initialise logging.
//! 2. Load the learner's practice [`Settings`].
//! 3. Detect an audio player for this platform.
//! 4. Build the OpenAI-compatible collaborators from config, with any scene
//!    files found in the config directory.
//! 5. Start the first round in the background and read commands from stdin
//!    until `/quit` or end of input.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use dictcli::{
    audio::{detect, AudioCache, PlaybackController},
    config::{AppConfig, AppPaths, JsonSettingsStore, Level, Settings, SettingsStore, Topic, Voice},
    history::JsonlHistory,
    llm::{ApiGenerator, ApiScorer, ApiSynthesizer, OpenAiClient, SceneLibrary},
    locale::UiLanguage,
    metrics::highlight_differences,
    pipeline::{AppState, Collaborators, Round, RoundOrchestrator, RoundPhase, StateStore},
};

const HELP: &str = "\
Type what you hear and press Enter.
  /replay               play the sentence again
  /hint                 show the sentence with the middle words blanked
  /stop                 stop playback
  /giveup               reveal the sentence and start the next round
  /next                 start the next round (Enter on an empty line works too)
  /settings             show settings and weekly stats
  /set <field> <value>  change voice, level, topic, words or speed
  /help                 show this help
  /quit                 exit";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Command {
    Answer(String),
    Next,
    Replay,
    Hint,
    Stop,
    GiveUp,
    ShowSettings,
    Set { field: String, value: String },
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Next;
    }
    if !line.starts_with('/') {
        return Command::Answer(line.to_string());
    }

    let mut parts = line.splitn(3, char::is_whitespace);
    match parts.next().unwrap_or_default() {
        "/replay" | "/r" => Command::Replay,
        "/hint" | "/h" => Command::Hint,
        "/stop" => Command::Stop,
        "/giveup" => Command::GiveUp,
        "/next" | "/n" => Command::Next,
        "/settings" => Command::ShowSettings,
        "/help" | "/?" => Command::Help,
        "/quit" | "/q" | "/exit" => Command::Quit,
        "/set" => match (parts.next(), parts.next()) {
            (Some(field), Some(value)) => Command::Set {
                field: field.to_ascii_lowercase(),
                value: value.trim().to_string(),
            },
            _ => Command::Unknown(line.to_string()),
        },
        _ => Command::Unknown(line.to_string()),
    }
}

/// Apply one `/set` change to `settings`.
fn apply_setting(settings: &mut Settings, field: &str, value: &str) -> anyhow::Result<()> {
    match field {
        "voice" => settings.voice = value.parse::<Voice>()?,
        "level" => settings.level = value.parse::<Level>()?,
        "topic" => settings.topic = value.parse::<Topic>()?,
        "words" | "wordcount" => {
            settings.word_count = value
                .parse()
                .with_context(|| format!("invalid word count: {value}"))?
        }
        "speed" => {
            settings.speed = value
                .parse()
                .with_context(|| format!("invalid speed: {value}"))?
        }
        other => anyhow::bail!("unknown setting '{other}' (voice, level, topic, words, speed)"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_result(round: &Round) {
    let marked: Vec<String> = highlight_differences(&round.sentence, &round.user_input)
        .into_iter()
        .map(|w| if w.is_error { format!("[{}]", w.word) } else { w.word })
        .collect();

    println!();
    println!("Score: {}/100   WER: {:.2}", round.score, round.wer);
    println!("Sentence: {}", marked.join(" "));
    println!("You:      {}", round.user_input);
    for error in &round.errors {
        println!(
            "  - expected \"{}\", got \"{}\": {}",
            error.expected, error.actual, error.explanation
        );
    }
    if !round.alternatives.is_empty() {
        println!("Other ways to say it:");
        for alt in &round.alternatives {
            println!("  * {alt}");
        }
    }
    println!("Press Enter for the next sentence.");
}

fn print_settings(settings: &Settings) {
    println!(
        "voice={} level={} ({}) topic={} words={} speed={}",
        settings.voice,
        settings.level.code(),
        settings.level.description(),
        settings.topic.name(),
        settings.word_count,
        settings.speed
    );
}

fn spawn_round(orchestrator: &Arc<RoundOrchestrator>, settings: Settings) {
    let orchestrator = Arc::clone(orchestrator);
    tokio::spawn(async move {
        println!("Generating a sentence...");
        match orchestrator.start_new_round(settings).await {
            Ok(()) => println!("Type what you heard (/replay to listen again)."),
            Err(e) => println!("Could not start the round: {e}. Press Enter to retry."),
        }
    });
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration + logging
    let config = AppConfig::load();
    let debug = std::env::var("DICTCLI_DEBUG").is_ok_and(|v| v.eq_ignore_ascii_case("true"))
        || config.as_ref().is_ok_and(|c| c.debug);
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::info!("dictcli starting up");

    let config = config.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 2. Practice settings
    let settings_store = Arc::new(JsonSettingsStore::default());
    let settings = settings_store.load();

    // 3. Audio player
    let strategy = detect().context("audio playback is unavailable")?;
    if !strategy.supports_rate() {
        log::info!("{} ignores the speed setting", strategy.name());
    }

    // 4. Collaborators
    let client = OpenAiClient::from_config(&config.llm);
    if !client.has_api_key() {
        log::warn!("no API key configured; set llm.api_key or OPENAI_API_KEY");
    }
    let language = UiLanguage::detect();
    let history = Arc::new(JsonlHistory::default());
    let scenes = SceneLibrary::load(&AppPaths::new().scenes_dir);
    if scenes.is_empty() {
        log::debug!("no scene files found; prompts use topic contexts only");
    }

    let state = StateStore::new(AppState::new(settings.clone()));
    let orchestrator = Arc::new(
        RoundOrchestrator::new(
            state.clone(),
            Collaborators {
                generator: Arc::new(ApiGenerator::new(client.clone()).with_scenes(scenes)),
                synthesizer: Arc::new(ApiSynthesizer::new(client.clone())),
                scorer: Arc::new(ApiScorer::new(client, language)),
                cache: Arc::new(AudioCache::from_config(&config.cache)),
                player: Arc::new(PlaybackController::new(strategy)),
                history: history.clone(),
                settings_store,
                language,
            },
        )
        .with_volume(config.playback.volume),
    );

    // 5. Command loop
    println!("{HELP}");
    print_settings(&settings);
    spawn_round(&orchestrator, state.settings());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),

            Command::Answer(text) => {
                let phase = state.phase();
                if matches!(phase, RoundPhase::Generating | RoundPhase::Result | RoundPhase::Idle) {
                    println!("No sentence to answer yet.");
                    continue;
                }
                println!("Scoring...");
                if let Some(round) = orchestrator.score_answer(&text).await {
                    print_result(&round);
                }
            }

            Command::Next => match state.phase() {
                RoundPhase::Idle | RoundPhase::Result => spawn_round(&orchestrator, state.settings()),
                _ => {}
            },

            Command::Replay => {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move { orchestrator.replay_audio().await });
            }

            Command::Hint => {
                let hint = orchestrator.show_gap_fill();
                if hint.is_empty() {
                    println!("No sentence yet.");
                } else {
                    println!("Hint: {hint}");
                }
            }

            Command::Stop => orchestrator.stop_audio().await,

            Command::GiveUp => {
                if let Some(round) = state.current_round() {
                    println!("The sentence was: {}", round.sentence);
                }
                orchestrator.stop_audio().await;
                spawn_round(&orchestrator, state.settings());
            }

            Command::ShowSettings => {
                print_settings(&state.settings());
                match history.calculate_stats(7).await {
                    Ok(stats) => println!(
                        "Last 7 days: {} rounds, average score {:.1}, average WER {:.2}",
                        stats.total_rounds, stats.average_score, stats.average_wer
                    ),
                    Err(e) => log::warn!("cannot read history: {e}"),
                }
            }

            Command::Set { field, value } => {
                let mut settings = state.settings();
                match apply_setting(&mut settings, &field, &value) {
                    Ok(()) => print_settings(&orchestrator.save_settings(settings)),
                    Err(e) => println!("{e}"),
                }
            }

            Command::Unknown(line) => println!("Unknown command: {line} (try /help)"),
        }
    }

    orchestrator.stop_audio().await;
    log::info!("dictcli shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_an_answer() {
        assert_eq!(
            parse_command("  I like tea  "),
            Command::Answer("I like tea".into())
        );
        assert_eq!(parse_command(""), Command::Next);
    }

    #[test]
    fn slash_commands_parse() {
        assert_eq!(parse_command("/replay"), Command::Replay);
        assert_eq!(parse_command("/q"), Command::Quit);
        assert_eq!(
            parse_command("/set Voice nova"),
            Command::Set {
                field: "voice".into(),
                value: "nova".into()
            }
        );
        assert!(matches!(parse_command("/set speed"), Command::Unknown(_)));
        assert!(matches!(parse_command("/dance"), Command::Unknown(_)));
    }

    #[test]
    fn settings_are_applied_by_field() {
        let mut settings = Settings::default();
        apply_setting(&mut settings, "voice", "faye").unwrap();
        apply_setting(&mut settings, "level", "b2").unwrap();
        apply_setting(&mut settings, "topic", "travel").unwrap();
        apply_setting(&mut settings, "words", "12").unwrap();
        apply_setting(&mut settings, "speed", "1.25").unwrap();

        assert_eq!(settings.voice, Voice::Faye);
        assert_eq!(settings.level, Level::B2);
        assert_eq!(settings.topic, Topic::Travel);
        assert_eq!(settings.word_count, 12);
        assert_eq!(settings.speed, 1.25);

        assert!(apply_setting(&mut settings, "speed", "fast").is_err());
        assert!(apply_setting(&mut settings, "colour", "red").is_err());
    }
}
