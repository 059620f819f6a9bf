//! Fallback scorer: wraps any [`AnswerScorer`] and scores locally on error.
//!
//! When the remote scorer fails for any reason (`Request`, `Timeout`,
//! `Parse`, `EmptyResponse`, `MissingApiKey`) [`FallbackScorer`] computes a
//! positional comparison with [`positional_score`] instead of propagating
//! the error.  Scoring an answer therefore always produces a result.

use async_trait::async_trait;

use crate::llm::client::LlmError;
use crate::llm::scorer::AnswerScorer;
use crate::locale::UiLanguage;
use crate::metrics::{positional_score, ScoringResult};

// ---------------------------------------------------------------------------
// FallbackScorer
// ---------------------------------------------------------------------------

/// A transparent wrapper around any [`AnswerScorer`] that never fails.
///
/// # Example
/// ```rust
/// use dictcli::config::LlmConfig;
/// use dictcli::llm::{ApiScorer, FallbackScorer, OpenAiClient};
/// use dictcli::locale::UiLanguage;
///
/// let inner = ApiScorer::new(OpenAiClient::from_config(&LlmConfig::default()), UiLanguage::English);
/// let scorer = FallbackScorer::new(inner, UiLanguage::English);
/// // `scorer.score_or_fallback(..)` is safe to call even when the provider
/// // is unreachable.
/// ```
pub struct FallbackScorer<S: AnswerScorer> {
    inner: S,
    language: UiLanguage,
}

impl<S: AnswerScorer> FallbackScorer<S> {
    /// Wrap `inner`; `language` picks the local explanation string.
    pub fn new(inner: S, language: UiLanguage) -> Self {
        Self { inner, language }
    }

    /// Return a reference to the wrapped scorer.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Score remotely, or locally when the remote scorer fails.
    pub async fn score_or_fallback(&self, reference: &str, hypothesis: &str) -> ScoringResult {
        match self.inner.score(reference, hypothesis).await {
            Ok(result) => result,
            Err(err) => {
                log::warn!("scorer: remote scoring failed ({err}); using positional fallback");
                positional_score(reference, hypothesis, self.language.mismatch_explanation())
            }
        }
    }
}

#[async_trait]
impl<S: AnswerScorer> AnswerScorer for FallbackScorer<S> {
    /// This implementation **never** returns `Err(_)`.
    async fn score(&self, reference: &str, hypothesis: &str) -> Result<ScoringResult, LlmError> {
        Ok(self.score_or_fallback(reference, hypothesis).await)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
