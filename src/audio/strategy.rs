//! Platform playback strategies.
//!
//! A [`PlaybackStrategy`] only knows how to build the command line for one
//! external player; process lifetime is owned by
//! [`PlaybackController`](crate::audio::PlaybackController).
//!
//! [`detect`] picks a strategy once at startup:
//!
//! | Platform | Player                                                  | Speed |
//! |----------|---------------------------------------------------------|-------|
//! | macOS    | `afplay -r <speed> -v <volume>`                         | yes   |
//! | Linux    | first of `mpg123`, `play` (SoX), `ffplay` on `PATH`     | no    |
//! | Windows  | PowerShell `System.Windows.Media.MediaPlayer`           | yes   |

use std::path::Path;
use std::sync::Arc;

use tokio::process::Command;

use crate::audio::player::PlaybackError;

/// Placeholder replaced by the audio file path in [`GenericPlayer`] args.
pub const FILE_PLACEHOLDER: &str = "{file}";

// ---------------------------------------------------------------------------
// PlaybackStrategy trait
// ---------------------------------------------------------------------------

/// Builds the player command for one file.
pub trait PlaybackStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Whether the player honours the `speed` argument.
    fn supports_rate(&self) -> bool;

    /// Command that plays `path` to completion and exits 0 on success.
    ///
    /// `speed` is already clamped to 0.5–2.0 and `volume` to 0.0–1.0.
    fn command(&self, path: &Path, speed: f32, volume: Option<f32>) -> Command;
}

// ---------------------------------------------------------------------------
// RateControlled (afplay)
// ---------------------------------------------------------------------------

/// A player that accepts a playback rate, i.e. macOS `afplay`.
#[derive(Debug, Clone)]
pub struct RateControlled {
    program: String,
}

impl RateControlled {
    pub fn afplay() -> Self {
        Self {
            program: "afplay".into(),
        }
    }
}

impl PlaybackStrategy for RateControlled {
    fn name(&self) -> &str {
        &self.program
    }

    fn supports_rate(&self) -> bool {
        true
    }

    fn command(&self, path: &Path, speed: f32, volume: Option<f32>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-r").arg(speed.to_string());
        if let Some(volume) = volume {
            cmd.arg("-v").arg(volume.to_string());
        }
        cmd.arg(path);
        cmd
    }
}

// ---------------------------------------------------------------------------
// GenericPlayer
// ---------------------------------------------------------------------------

/// Any player invoked as `program args...`; speed and volume are ignored.
///
/// Each argument equal to or containing [`FILE_PLACEHOLDER`] has it replaced
/// by the file path.
#[derive(Debug, Clone)]
pub struct GenericPlayer {
    program: String,
    args: Vec<String>,
}

impl GenericPlayer {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl PlaybackStrategy for GenericPlayer {
    fn name(&self) -> &str {
        &self.program
    }

    fn supports_rate(&self) -> bool {
        false
    }

    fn command(&self, path: &Path, _speed: f32, _volume: Option<f32>) -> Command {
        let file = path.to_string_lossy();
        let mut cmd = Command::new(&self.program);
        for arg in &self.args {
            cmd.arg(arg.replace(FILE_PLACEHOLDER, &file));
        }
        cmd
    }
}

// ---------------------------------------------------------------------------
// MediaPlayer (Windows PowerShell)
// ---------------------------------------------------------------------------

/// WPF `MediaPlayer` driven from a PowerShell one-liner.  Plays MP3 and
/// honours speed through `SpeedRatio`.
#[derive(Debug, Clone)]
pub struct MediaPlayer {
    program: String,
}

impl MediaPlayer {
    pub fn powershell() -> Self {
        Self {
            program: "powershell".into(),
        }
    }

    /// The script that plays `path` and returns once it has finished.
    pub fn script(path: &Path, speed: f32, volume: Option<f32>) -> String {
        // Single-quoted PowerShell literal: `'` is escaped by doubling.
        let file = path.to_string_lossy().replace('\'', "''");
        let volume = volume.unwrap_or(1.0);
        format!(
            "Add-Type -AssemblyName PresentationCore; \
             $p = New-Object System.Windows.Media.MediaPlayer; \
             $p.Open([uri]'{file}'); $p.Volume = {volume}; $p.SpeedRatio = {speed}; $p.Play(); \
             $n = 0; while (-not $p.NaturalDuration.HasTimeSpan -and $n -lt 100) {{ Start-Sleep -Milliseconds 50; $n++ }}; \
             if (-not $p.NaturalDuration.HasTimeSpan) {{ $p.Close(); exit 1 }}; \
             Start-Sleep -Milliseconds ([int]($p.NaturalDuration.TimeSpan.TotalMilliseconds / {speed})); \
             $p.Close()"
        )
    }
}

impl PlaybackStrategy for MediaPlayer {
    fn name(&self) -> &str {
        &self.program
    }

    fn supports_rate(&self) -> bool {
        true
    }

    fn command(&self, path: &Path, speed: f32, volume: Option<f32>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-NoProfile", "-NonInteractive", "-Command"])
            .arg(Self::script(path, speed, volume));
        cmd
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Linux candidates, in preference order.
const LINUX_PLAYERS: &[(&str, &[&str])] = &[
    ("mpg123", &["-q", FILE_PLACEHOLDER]),
    ("play", &["-q", FILE_PLACEHOLDER]),
    (
        "ffplay",
        &["-nodisp", "-autoexit", "-loglevel", "quiet", FILE_PLACEHOLDER],
    ),
];

/// Select the playback strategy for the current platform.
///
/// Returns [`PlaybackError::NoPlayer`] when no supported player is installed.
pub fn detect() -> Result<Arc<dyn PlaybackStrategy>, PlaybackError> {
    if cfg!(target_os = "macos") {
        return Ok(Arc::new(RateControlled::afplay()));
    }

    if cfg!(target_os = "windows") {
        return Ok(Arc::new(MediaPlayer::powershell()));
    }

    for (program, args) in LINUX_PLAYERS {
        if which::which(program).is_ok() {
            log::info!("playback: using {program} (speed control unavailable)");
            return Ok(Arc::new(GenericPlayer::new(*program, args.iter().copied())));
        }
    }

    Err(PlaybackError::NoPlayer)
}

// ---------------------------------------------------------------------------
// MockStrategy (tests only)
// ---------------------------------------------------------------------------

/// How a [`MockStrategy`] child behaves.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub enum MockOutcome {
    /// Exit 0 immediately.
    Succeed,
    /// Exit 1 immediately.
    Fail,
    /// Run until killed.
    Hang,
}

/// Spawns `true`, `false` or `sleep 30` regardless of the file, and counts
/// how many commands were built.
#[cfg(test)]
pub struct MockStrategy {
    outcome: MockOutcome,
    spawns: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockStrategy {
    pub fn new(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            spawns: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn spawns(&self) -> usize {
        self.spawns.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl PlaybackStrategy for MockStrategy {
    fn name(&self) -> &str {
        "mock"
    }

    fn supports_rate(&self) -> bool {
        true
    }

    fn command(&self, _path: &Path, _speed: f32, _volume: Option<f32>) -> Command {
        self.spawns
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match self.outcome {
            MockOutcome::Succeed => Command::new("true"),
            MockOutcome::Fail => Command::new("false"),
            MockOutcome::Hang => {
                let mut cmd = Command::new("sleep");
                cmd.arg("30");
                cmd
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn afplay_passes_rate_and_volume() {
        let strategy = RateControlled::afplay();
        let cmd = strategy.command(Path::new("/tmp/a.mp3"), 1.5, Some(0.8));
        assert_eq!(cmd.as_std().get_program(), "afplay");
        assert_eq!(args_of(&cmd), ["-r", "1.5", "-v", "0.8", "/tmp/a.mp3"]);
        assert!(strategy.supports_rate());
    }

    #[test]
    fn afplay_omits_volume_when_unset() {
        let cmd = RateControlled::afplay().command(Path::new("/tmp/a.mp3"), 1.0, None);
        assert_eq!(args_of(&cmd), ["-r", "1", "/tmp/a.mp3"]);
    }

    #[test]
    fn generic_player_substitutes_file_and_ignores_speed() {
        let strategy = GenericPlayer::new("mpg123", ["-q", FILE_PLACEHOLDER]);
        let cmd = strategy.command(Path::new("/tmp/b.mp3"), 2.0, Some(0.1));
        assert_eq!(cmd.as_std().get_program(), "mpg123");
        assert_eq!(args_of(&cmd), ["-q", "/tmp/b.mp3"]);
        assert!(!strategy.supports_rate());
    }

    #[test]
    fn placeholder_inside_argument_is_replaced() {
        let strategy = GenericPlayer::new("sh", ["-c", "cat '{file}' > /dev/null"]);
        let cmd = strategy.command(Path::new("/tmp/x.mp3"), 1.0, None);
        assert_eq!(args_of(&cmd)[1], "cat '/tmp/x.mp3' > /dev/null");
    }

    #[test]
    fn media_player_script_sets_rate_and_volume() {
        let strategy = MediaPlayer::powershell();
        let cmd = strategy.command(Path::new("C:/cache/a.mp3"), 1.5, Some(0.5));
        let args = args_of(&cmd);

        assert_eq!(cmd.as_std().get_program(), "powershell");
        assert_eq!(&args[..3], ["-NoProfile", "-NonInteractive", "-Command"]);
        assert!(args[3].contains("[uri]'C:/cache/a.mp3'"));
        assert!(args[3].contains("$p.SpeedRatio = 1.5"));
        assert!(args[3].contains("$p.Volume = 0.5"));
        assert!(strategy.supports_rate());
    }

    #[test]
    fn media_player_escapes_quotes_in_path() {
        let script = MediaPlayer::script(Path::new(r"C:\Users\O'Brien\a.mp3"), 1.0, None);
        assert!(script.contains(r"[uri]'C:\Users\O''Brien\a.mp3'"));
        assert!(script.contains("$p.Volume = 1;"));
    }

    #[test]
    fn linux_candidates_keep_preference_order() {
        let names: Vec<&str> = LINUX_PLAYERS.iter().map(|(p, _)| *p).collect();
        assert_eq!(names, ["mpg123", "play", "ffplay"]);
    }
}
