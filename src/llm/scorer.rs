//! `AnswerScorer` trait and the API-backed scorer.

use async_trait::async_trait;
use serde::Deserialize;

use crate::llm::client::{LlmError, OpenAiClient};
use crate::llm::prompt::Prompt;
use crate::locale::UiLanguage;
use crate::metrics::{ScoringResult, WordError};

// ---------------------------------------------------------------------------
// AnswerScorer trait
// ---------------------------------------------------------------------------

/// Scores a learner's transcription against the reference sentence.
///
/// Failures are recoverable: wrap any scorer in
/// [`FallbackScorer`](crate::llm::FallbackScorer) to get a result no matter
/// what the provider does.
#[async_trait]
pub trait AnswerScorer: Send + Sync {
    async fn score(&self, reference: &str, hypothesis: &str) -> Result<ScoringResult, LlmError>;
}

#[async_trait]
impl<S: AnswerScorer + ?Sized> AnswerScorer for std::sync::Arc<S> {
    async fn score(&self, reference: &str, hypothesis: &str) -> Result<ScoringResult, LlmError> {
        (**self).score(reference, hypothesis).await
    }
}

// ---------------------------------------------------------------------------
// ApiScorer
// ---------------------------------------------------------------------------

/// Asks a chat model for a JSON evaluation.
pub struct ApiScorer {
    client: OpenAiClient,
    language: UiLanguage,
}

impl ApiScorer {
    pub fn new(client: OpenAiClient, language: UiLanguage) -> Self {
        Self { client, language }
    }
}

#[async_trait]
impl AnswerScorer for ApiScorer {
    async fn score(&self, reference: &str, hypothesis: &str) -> Result<ScoringResult, LlmError> {
        let prompt = Prompt::scoring(reference, hypothesis, self.language);
        let content = self
            .client
            .chat(&self.client.config().scorer_model, &prompt, true)
            .await?;
        parse_scoring(&content)
    }
}

/// Wire shape of the model's JSON.  Models occasionally send a fractional
/// score or omit the lists, so parsing is lenient and normalised after.
#[derive(Debug, Deserialize)]
struct RawScoring {
    score: f64,
    wer: f64,
    #[serde(default)]
    errors: Vec<WordError>,
    #[serde(default)]
    alternatives: Vec<String>,
}

fn parse_scoring(content: &str) -> Result<ScoringResult, LlmError> {
    let raw: RawScoring =
        serde_json::from_str(content).map_err(|e| LlmError::Parse(e.to_string()))?;

    if !raw.score.is_finite() || !raw.wer.is_finite() {
        return Err(LlmError::Parse("non-finite score or wer".into()));
    }

    Ok(ScoringResult {
        score: raw.score.round().clamp(0.0, 100.0) as u8,
        wer: raw.wer.max(0.0),
        errors: raw.errors,
        alternatives: raw.alternatives,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_response() {
        let json = r#"{
            "score": 85,
            "wer": 0.15,
            "errors": [{"expected": "world", "actual": "word", "explanation": "spelling"}],
            "alternatives": ["Hi world", "Hello everyone"]
        }"#;
        let result = parse_scoring(json).unwrap();
        assert_eq!(result.score, 85);
        assert!((result.wer - 0.15).abs() < f64::EPSILON);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].expected, "world");
        assert_eq!(result.alternatives.len(), 2);
    }

    #[test]
    fn clamps_and_rounds_score() {
        let result = parse_scoring(r#"{"score": 120.6, "wer": -0.2}"#).unwrap();
        assert_eq!(result.score, 100);
        assert_eq!(result.wer, 0.0);
        assert!(result.errors.is_empty());
        assert!(result.alternatives.is_empty());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(parse_scoring("not json"), Err(LlmError::Parse(_))));
        assert!(matches!(
            parse_scoring(r#"{"wer": 0.1}"#),
            Err(LlmError::Parse(_))
        ));
    }
}
