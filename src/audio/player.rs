//! `PlaybackController`: plays audio files through an external player.
//!
//! At most one player process is alive at a time.  A new [`play`] stops the
//! previous session and waits for its process to exit before spawning.
//! [`stop`] is safe to call at any time and never fails.
//!
//! ```text
//! play(path) ──spawn──▶ Playing ──exit 0──▶ Idle      (Ok)
//!                               ──exit ≠0─▶ Error     (Err PlaybackFailed)
//!                               ──stop()──▶ Stopped   (Ok)
//! play(missing) ──────────────────────────▶ Error     (Err FileNotFound)
//! ```
//!
//! [`play`]: PlaybackController::play
//! [`stop`]: PlaybackController::stop

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::audio::strategy::PlaybackStrategy;

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;

// ---------------------------------------------------------------------------
// PlaybackError / PlaybackStatus / PlaybackOptions
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The path does not exist or is not a regular file.
    #[error("audio file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// The player could not be spawned or exited with a failure status.
    #[error("playback failed: {0}")]
    PlaybackFailed(String),

    /// No supported player is installed.
    #[error("no supported audio player found (install mpg123, sox or ffmpeg)")]
    NoPlayer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
    Paused,
    Stopped,
    Error,
}

impl PlaybackStatus {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Stopped => "stopped",
            PlaybackStatus::Error => "error",
        }
    }
}

/// Per-call playback parameters.  `None` means the player default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackOptions {
    pub speed: Option<f32>,
    pub volume: Option<f32>,
}

/// Clamp `speed` into 0.5–2.0, warning when it was out of range.
pub fn clamp_speed(speed: f32) -> f32 {
    if !speed.is_finite() {
        log::warn!("playback: invalid speed {speed}, using 1.0");
        return 1.0;
    }
    let clamped = speed.clamp(MIN_SPEED, MAX_SPEED);
    if clamped != speed {
        log::warn!("playback: speed {speed} out of range, clamped to {clamped}");
    }
    clamped
}

// ---------------------------------------------------------------------------
// Session bookkeeping
// ---------------------------------------------------------------------------

struct ActiveSession {
    id: u64,
    kill_tx: oneshot::Sender<()>,
    /// Result of the kill, sent once the process has been reaped.
    exited_rx: oneshot::Receiver<io::Result<()>>,
}

#[derive(Default)]
struct Session {
    status: PlaybackStatus,
    active: Option<ActiveSession>,
    next_id: u64,
}

// ---------------------------------------------------------------------------
// PlaybackController
// ---------------------------------------------------------------------------

/// Owns the single playback session.
///
/// Share it as `Arc<PlaybackController>`; all methods take `&self`.
pub struct PlaybackController {
    strategy: Arc<dyn PlaybackStrategy>,
    session: Mutex<Session>,
    /// Serialises stop-then-spawn so two `play` calls cannot both spawn.
    start: tokio::sync::Mutex<()>,
}

impl PlaybackController {
    pub fn new(strategy: Arc<dyn PlaybackStrategy>) -> Self {
        Self {
            strategy,
            session: Mutex::new(Session::default()),
            start: tokio::sync::Mutex::new(()),
        }
    }

    pub fn strategy(&self) -> &dyn PlaybackStrategy {
        self.strategy.as_ref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.lock().status
    }

    pub fn is_playing(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    /// Play `path` to completion.
    ///
    /// Returns `Ok(())` on a clean exit and also when the session was ended
    /// by [`stop`](Self::stop) or by a newer `play`.
    pub async fn play(&self, path: &Path, options: PlaybackOptions) -> Result<(), PlaybackError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                self.lock().status = PlaybackStatus::Error;
                return Err(PlaybackError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
        }

        let speed = clamp_speed(options.speed.unwrap_or(1.0));
        let volume = options.volume.map(|v| v.clamp(0.0, 1.0));

        let (mut child, id, kill_rx, exited_tx) = {
            let _start = self.start.lock().await;
            self.stop().await;

            let mut cmd = self.strategy.command(path, speed, volume);
            cmd.stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true);

            let child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    self.lock().status = PlaybackStatus::Error;
                    return Err(PlaybackError::PlaybackFailed(format!(
                        "cannot start {}: {e}",
                        self.strategy.name()
                    )));
                }
            };

            let (kill_tx, kill_rx) = oneshot::channel();
            let (exited_tx, exited_rx) = oneshot::channel();

            let mut session = self.lock();
            let id = session.next_id;
            session.next_id += 1;
            session.status = PlaybackStatus::Playing;
            session.active = Some(ActiveSession {
                id,
                kill_tx,
                exited_rx,
            });
            log::debug!(
                "playback: session {id} started ({}, speed {speed})",
                self.strategy.name()
            );
            (child, id, kill_rx, exited_tx)
        };

        let exit = tokio::select! {
            status = child.wait() => Some(status),
            _ = kill_rx => None,
        };

        let Some(exit) = exit else {
            let result = child.kill().await;
            let _ = exited_tx.send(result);
            log::debug!("playback: session {id} stopped");
            return Ok(());
        };

        // If stop() already took the session it also owns the status.
        let mut session = self.lock();
        let owned = session.active.as_ref().is_some_and(|a| a.id == id);
        if owned {
            session.active = None;
        }

        let result = match exit {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(PlaybackError::PlaybackFailed(format!(
                "{} exited with {status}",
                self.strategy.name()
            ))),
            Err(e) => Err(PlaybackError::PlaybackFailed(e.to_string())),
        };

        if owned {
            session.status = if result.is_ok() {
                PlaybackStatus::Idle
            } else {
                PlaybackStatus::Error
            };
        }
        result
    }

    /// Stop the active session, if any, and wait for its process to exit.
    ///
    /// Status becomes `Stopped`, or `Error` when the process could not be
    /// terminated.
    pub async fn stop(&self) {
        let active = self.lock().active.take();

        let status = match active {
            None => PlaybackStatus::Stopped,
            Some(session) => {
                let _ = session.kill_tx.send(());
                match session.exited_rx.await {
                    Ok(Err(e)) => {
                        log::error!("playback: failed to stop session {}: {e}", session.id);
                        PlaybackStatus::Error
                    }
                    // A dropped sender means the process already exited.
                    _ => PlaybackStatus::Stopped,
                }
            }
        };

        self.lock().status = status;
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
