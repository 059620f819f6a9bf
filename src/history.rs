//! Durable practice history: one scored [`Round`] per line of JSON.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::AppPaths;
use crate::pipeline::Round;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot serialize round: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Receives every scored round.
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn append(&self, round: &Round) -> Result<(), HistoryError>;
}

/// Aggregates over a window of recent rounds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistoryStats {
    pub total_rounds: usize,
    pub average_score: f64,
    pub average_wer: f64,
}

/// Append-only JSONL history file (`history.jsonl`).
#[derive(Debug, Clone)]
pub struct JsonlHistory {
    path: PathBuf,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored round, oldest first.  Unparseable lines are skipped.
    pub async fn get_all(&self) -> Result<Vec<Round>, HistoryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let rounds = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str::<Round>(line) {
                Ok(round) => Some(round),
                Err(e) => {
                    log::warn!("history: skipping line {} of {}: {e}", n + 1, self.path.display());
                    None
                }
            })
            .collect();
        Ok(rounds)
    }

    /// The last `count` rounds, oldest first.
    pub async fn get_recent(&self, count: usize) -> Result<Vec<Round>, HistoryError> {
        let mut all = self.get_all().await?;
        let skip = all.len().saturating_sub(count);
        Ok(all.split_off(skip))
    }

    /// Round count and mean score/WER over the last `days` days.
    pub async fn calculate_stats(&self, days: i64) -> Result<HistoryStats, HistoryError> {
        let cutoff = Utc::now() - Duration::days(days);
        let recent: Vec<Round> = self
            .get_all()
            .await?
            .into_iter()
            .filter(|r| r.timestamp > cutoff)
            .collect();

        if recent.is_empty() {
            return Ok(HistoryStats::default());
        }

        let n = recent.len() as f64;
        Ok(HistoryStats {
            total_rounds: recent.len(),
            average_score: recent.iter().map(|r| f64::from(r.score)).sum::<f64>() / n,
            average_wer: recent.iter().map(|r| r.wer).sum::<f64>() / n,
        })
    }
}

impl Default for JsonlHistory {
    fn default() -> Self {
        Self::new(AppPaths::new().history_file)
    }
}

#[async_trait]
impl HistorySink for JsonlHistory {
    async fn append(&self, round: &Round) -> Result<(), HistoryError> {
        let mut line = serde_json::to_string(round)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ScoringResult;

    fn scored(sentence: &str, score: u8, wer: f64) -> Round {
        Round::new(sentence).scored(
            "typed answer",
            ScoringResult {
                score,
                wer,
                errors: Vec::new(),
                alternatives: Vec::new(),
            },
        )
    }

    #[tokio::test]
    async fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = JsonlHistory::new(dir.path().join("history.jsonl"));
        assert!(history.get_all().await.unwrap().is_empty());
        assert_eq!(history.calculate_stats(7).await.unwrap(), HistoryStats::default());
    }

    #[tokio::test]
    async fn append_writes_one_line_per_round() {
        let dir = tempfile::tempdir().unwrap();
        let history = JsonlHistory::new(dir.path().join("nested").join("history.jsonl"));

        history.append(&scored("First one here.", 80, 0.2)).await.unwrap();
        history.append(&scored("Second one here.", 100, 0.0)).await.unwrap();

        let content = std::fs::read_to_string(history.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().next().unwrap().contains("\"userInput\""));

        let all = history.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].sentence, "First one here.");
        assert_eq!(all[1].score, 100);
    }

    #[tokio::test]
    async fn get_recent_returns_tail() {
        let dir = tempfile::tempdir().unwrap();
        let history = JsonlHistory::new(dir.path().join("history.jsonl"));
        for i in 0..5 {
            history.append(&scored(&format!("Sentence {i}."), 50, 0.5)).await.unwrap();
        }

        let recent = history.get_recent(2).await.unwrap();
        let sentences: Vec<&str> = recent.iter().map(|r| r.sentence.as_str()).collect();
        assert_eq!(sentences, ["Sentence 3.", "Sentence 4."]);
        assert_eq!(history.get_recent(10).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let history = JsonlHistory::new(dir.path().join("history.jsonl"));
        history.append(&scored("Kept.", 90, 0.1)).await.unwrap();
        {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(history.path())
                .unwrap();
            file.write_all(b"{not json}\n\n").unwrap();
        }

        assert_eq!(history.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stats_average_recent_rounds_only() {
        let dir = tempfile::tempdir().unwrap();
        let history = JsonlHistory::new(dir.path().join("history.jsonl"));

        let mut old = scored("Long ago.", 0, 1.0);
        old.timestamp = Utc::now() - Duration::days(30);
        history.append(&old).await.unwrap();
        history.append(&scored("Recent one.", 80, 0.2)).await.unwrap();
        history.append(&scored("Recent two.", 60, 0.4)).await.unwrap();

        let stats = history.calculate_stats(7).await.unwrap();
        assert_eq!(stats.total_rounds, 2);
        assert!((stats.average_score - 70.0).abs() < 1e-9);
        assert!((stats.average_wer - 0.3).abs() < 1e-9);
    }
}
