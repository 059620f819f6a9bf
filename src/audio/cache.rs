//! On-disk cache of synthesized speech.
//!
//! Entries are keyed by `(text, voice, speed)` and stored as
//! `<dir>/<sha256-hex>.mp3`.  A file's modification time drives its TTL:
//! an entry is a hit only while `now - mtime < ttl`.  Stale files are left
//! in place by [`AudioCache::get`] and removed by [`AudioCache::janitor`],
//! which [`AudioCache::put`] runs with a small probability after each write.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::{CacheConfig, Voice};
use crate::llm::{LlmError, SpeechSynthesizer};

const EXTENSION: &str = "mp3";
const SEPARATOR: u8 = 0x1f;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("speech synthesis failed: {0}")]
    Synthesis(#[from] LlmError),

    #[error("audio cache I/O error: {0}")]
    Io(#[from] io::Error),
}

/// TTL-bounded audio file cache.
#[derive(Debug, Clone)]
pub struct AudioCache {
    dir: PathBuf,
    ttl: Duration,
    prune_probability: f64,
}

impl AudioCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration, prune_probability: f64) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            prune_probability: prune_probability.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.resolved_dir(),
            Duration::from_secs(config.ttl_secs),
            config.prune_probability,
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Hex SHA-256 over text, voice display name and speed.
    ///
    /// ```
    /// use dictcli::audio::AudioCache;
    /// use dictcli::config::Voice;
    ///
    /// let a = AudioCache::key("Hello there.", Voice::Alex, 1.0);
    /// let b = AudioCache::key("Hello there.", Voice::Alex, 1.1);
    /// assert_eq!(a.len(), 64);
    /// assert_ne!(a, b);
    /// ```
    pub fn key(text: &str, voice: Voice, speed: f32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update([SEPARATOR]);
        hasher.update(voice.display_name().as_bytes());
        hasher.update([SEPARATOR]);
        hasher.update(speed.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{EXTENSION}"))
    }

    /// Path of a fresh cached file, or `None` on miss or expiry.
    pub async fn get(&self, text: &str, voice: Voice, speed: f32) -> Option<PathBuf> {
        let path = self.path_for(&Self::key(text, voice, speed));
        let meta = tokio::fs::metadata(&path).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        let modified = meta.modified().ok()?;
        if self.is_fresh(modified) {
            Some(path)
        } else {
            log::debug!("cache: expired entry {}", path.display());
            None
        }
    }

    /// Return the cached path, synthesizing and storing the audio on a miss.
    ///
    /// Concurrent misses for the same key may both synthesize; the write is
    /// a temp file renamed into place so readers never see partial audio.
    pub async fn put(
        &self,
        text: &str,
        voice: Voice,
        speed: f32,
        synthesizer: &dyn SpeechSynthesizer,
    ) -> Result<PathBuf, CacheError> {
        if let Some(path) = self.get(text, voice, speed).await {
            log::debug!("cache: hit {}", path.display());
            return Ok(path);
        }

        let audio = synthesizer
            .synthesize(text, voice.provider_id(), speed)
            .await?;

        let key = Self::key(text, voice, speed);
        let path = self.path_for(&key);
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp = self
            .dir
            .join(format!("{key}.{EXTENSION}.tmp-{}", uuid::Uuid::new_v4()));
        if let Err(e) = write_synced(&tmp, &audio).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        log::debug!("cache: stored {} ({} bytes)", path.display(), audio.len());

        if rand::random::<f64>() < self.prune_probability {
            let removed = self.janitor().await;
            if removed > 0 {
                log::info!("cache: janitor removed {removed} expired file(s)");
            }
        }

        Ok(path)
    }

    /// Delete every cached file older than the TTL.  Returns how many were
    /// removed; per-file failures are logged and skipped.
    pub async fn janitor(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!("cache: cannot list {}: {e}", self.dir.display());
                }
                return 0;
            }
        };

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("cache: directory scan failed: {e}");
                    break;
                }
            };

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }

            let expired = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => !self.is_fresh(modified),
                Err(e) => {
                    log::warn!("cache: cannot stat {}: {e}", path.display());
                    continue;
                }
            };

            if expired {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => log::warn!("cache: cannot remove {}: {e}", path.display()),
                }
            }
        }
        removed
    }

    /// Total bytes and number of cached files.
    pub async fn size(&self) -> io::Result<(u64, usize)> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((0, 0)),
            Err(e) => return Err(e),
        };

        let (mut bytes, mut files) = (0, 0);
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                bytes += entry.metadata().await?.len();
                files += 1;
            }
        }
        Ok((bytes, files))
    }

    /// Remove every cached file regardless of age.
    pub async fn clear(&self) -> io::Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn is_fresh(&self, modified: SystemTime) -> bool {
        // A timestamp in the future counts as age zero.
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        age < self.ttl
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Returns fixed bytes and records each call.
    #[derive(Default)]
    struct CountingSynth {
        calls: AtomicUsize,
        voices: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechSynthesizer for CountingSynth {
        async fn synthesize(&self, _text: &str, voice_id: &str, _speed: f32) -> Result<Vec<u8>, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.voices.lock().unwrap().push(voice_id.to_string());
            Ok(b"ID3fake-mp3".to_vec())
        }
    }

    struct FailingSynth;

    #[async_trait]
    impl SpeechSynthesizer for FailingSynth {
        async fn synthesize(&self, _: &str, _: &str, _: f32) -> Result<Vec<u8>, LlmError> {
            Err(LlmError::Timeout)
        }
    }

    fn cache(dir: &Path, ttl: Duration) -> AudioCache {
        AudioCache::new(dir, ttl, 0.0)
    }

    #[test]
    fn key_is_order_sensitive() {
        let base = AudioCache::key("hello", Voice::Alex, 1.0);
        assert_eq!(base, AudioCache::key("hello", Voice::Alex, 1.0));
        assert_ne!(base, AudioCache::key("hello", Voice::Sara, 1.0));
        assert_ne!(base, AudioCache::key("hello ", Voice::Alex, 1.0));
        assert_ne!(base, AudioCache::key("hello", Voice::Alex, 1.05));
    }

    #[tokio::test]
    async fn put_then_get_hits() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), Duration::from_secs(900));
        let synth = CountingSynth::default();

        let path = cache.put("Good morning.", Voice::Sara, 1.0, &synth).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3fake-mp3");
        assert_eq!(cache.get("Good morning.", Voice::Sara, 1.0).await, Some(path));

        // Provider id, not display name, goes to the synthesizer.
        assert_eq!(synth.voices.lock().unwrap().as_slice(), ["shimmer"]);
    }

    #[tokio::test]
    async fn second_put_reuses_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), Duration::from_secs(900));
        let synth = CountingSynth::default();

        let first = cache.put("Hi.", Voice::Alex, 1.0, &synth).await.unwrap();
        let second = cache.put("Hi.", Voice::Alex, 1.0, &synth).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_parameters_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), Duration::from_secs(900));
        let synth = CountingSynth::default();
        cache.put("Hi.", Voice::Alex, 1.0, &synth).await.unwrap();

        assert!(cache.get("Hi!", Voice::Alex, 1.0).await.is_none());
        assert!(cache.get("Hi.", Voice::Nova, 1.0).await.is_none());
        assert!(cache.get("Hi.", Voice::Alex, 1.5).await.is_none());
    }

    #[tokio::test]
    async fn expired_entry_misses_and_janitor_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), Duration::ZERO);
        let synth = CountingSynth::default();

        let path = cache.put("Old news.", Voice::Evan, 1.0, &synth).await.unwrap();
        assert!(path.exists());
        assert!(cache.get("Old news.", Voice::Evan, 1.0).await.is_none());

        assert_eq!(cache.janitor().await, 1);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn janitor_keeps_fresh_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), Duration::from_secs(900));
        let synth = CountingSynth::default();
        let path = cache.put("Fresh.", Voice::Nick, 1.0, &synth).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        assert_eq!(cache.janitor().await, 0);
        assert!(path.exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn put_triggers_janitor_when_sampled() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path(), Duration::from_millis(200), 1.0);
        let synth = CountingSynth::default();

        let old = cache.put("Old entry.", Voice::Alex, 1.0, &synth).await.unwrap();
        assert!(old.exists());
        tokio::time::sleep(Duration::from_millis(300)).await;

        let fresh = cache.put("New entry.", Voice::Alex, 1.0, &synth).await.unwrap();
        assert!(fresh.exists());
        assert!(!old.exists());
    }

    #[tokio::test]
    async fn synthesis_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), Duration::from_secs(900));
        let err = cache.put("Nope.", Voice::Faye, 1.0, &FailingSynth).await.unwrap_err();
        assert!(matches!(err, CacheError::Synthesis(LlmError::Timeout)));
        assert_eq!(cache.size().await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn size_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path().join("audio").as_path(), Duration::from_secs(900));
        assert_eq!(cache.size().await.unwrap(), (0, 0));

        let synth = CountingSynth::default();
        cache.put("One.", Voice::Alex, 1.0, &synth).await.unwrap();
        cache.put("Two.", Voice::Alex, 1.0, &synth).await.unwrap();

        let (bytes, files) = cache.size().await.unwrap();
        assert_eq!(files, 2);
        assert_eq!(bytes, 2 * b"ID3fake-mp3".len() as u64);

        assert_eq!(cache.clear().await.unwrap(), 2);
        assert_eq!(cache.size().await.unwrap(), (0, 0));
    }
}
