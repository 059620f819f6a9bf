//! Word-level scoring metrics.
//!
//! * [`compute_wer`]: token Levenshtein distance normalised by the
//!   reference length (the classic word error rate).
//! * [`positional_score`]: the degraded-mode scorer used when the remote
//!   scorer is unavailable.  It compares tokens index by index without any
//!   alignment search, so a single inserted word shifts every later token
//!   into an error.  It is an approximation, not a replacement.
//! * [`highlight_differences`]: per-word match flags for result rendering.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Scoring data
// ---------------------------------------------------------------------------

/// One word-level mismatch between the reference and the learner's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordError {
    pub expected: String,
    pub actual: String,
    pub explanation: String,
}

/// Outcome of scoring one answer, either remote or local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// 0–100.
    pub score: u8,
    /// Word error rate, `>= 0`.  Exceeds 1 when the answer is much longer
    /// than the reference.
    pub wer: f64,
    #[serde(default)]
    pub errors: Vec<WordError>,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

// ---------------------------------------------------------------------------
// compute_wer
// ---------------------------------------------------------------------------

/// Word error rate between `reference` and `hypothesis`.
///
/// Tokens are compared case-insensitively.  Substitution, insertion and
/// deletion each cost 1.
///
/// ```
/// use dictcli::metrics::compute_wer;
///
/// assert_eq!(compute_wer("Hello world", "Hello word"), 0.5);
/// assert_eq!(compute_wer("", ""), 0.0);
/// assert_eq!(compute_wer("", "extra"), 1.0);
/// ```
pub fn compute_wer(reference: &str, hypothesis: &str) -> f64 {
    let reference = tokenize(reference);
    let hypothesis = tokenize(hypothesis);

    if reference.is_empty() {
        return if hypothesis.is_empty() { 0.0 } else { 1.0 };
    }

    let m = reference.len();
    let n = hypothesis.len();

    // dp[i][j] = distance between reference[..i] and hypothesis[..j]
    let mut dp = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        dp[0][j] = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            dp[i][j] = if reference[i - 1] == hypothesis[j - 1] {
                dp[i - 1][j - 1]
            } else {
                1 + dp[i - 1][j].min(dp[i][j - 1]).min(dp[i - 1][j - 1])
            };
        }
    }

    dp[m][n] as f64 / m.max(1) as f64
}

// ---------------------------------------------------------------------------
// positional_score
// ---------------------------------------------------------------------------

/// Index-aligned fallback scoring.
///
/// Every position up to the longer of the two token lists where the
/// lowercased tokens differ (a missing token counts as `""`) becomes a
/// [`WordError`] carrying `explanation`.
pub fn positional_score(reference: &str, hypothesis: &str, explanation: &str) -> ScoringResult {
    let ref_words = tokenize(reference);
    let hyp_words = tokenize(hypothesis);

    let errors: Vec<WordError> = (0..ref_words.len().max(hyp_words.len()))
        .filter_map(|i| {
            let expected = ref_words.get(i).map(String::as_str).unwrap_or("");
            let actual = hyp_words.get(i).map(String::as_str).unwrap_or("");
            (expected != actual).then(|| WordError {
                expected: expected.to_string(),
                actual: actual.to_string(),
                explanation: explanation.to_string(),
            })
        })
        .collect();

    let wer = errors.len() as f64 / ref_words.len().max(1) as f64;
    let score = ((1.0 - wer) * 100.0).round().clamp(0.0, 100.0) as u8;

    ScoringResult {
        score,
        wer,
        errors,
        alternatives: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// highlight_differences
// ---------------------------------------------------------------------------

/// A reference word and whether the learner typed it at the same position.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightedWord {
    pub word: String,
    pub is_error: bool,
}

/// Mark each reference word as matched or missed, positionally.
///
/// Original casing of the reference is preserved in the output.
pub fn highlight_differences(reference: &str, hypothesis: &str) -> Vec<HighlightedWord> {
    let hyp_words: Vec<&str> = hypothesis.split_whitespace().collect();

    reference
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            let typed = hyp_words.get(i).copied().unwrap_or("");
            HighlightedWord {
                word: word.to_string(),
                is_error: word.to_lowercase() != typed.to_lowercase(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sentences_have_zero_wer() {
        assert_eq!(compute_wer("The quick brown fox", "The quick brown fox"), 0.0);
    }

    #[test]
    fn wer_is_case_insensitive() {
        assert_eq!(compute_wer("Hello World", "hello world"), 0.0);
    }

    #[test]
    fn single_substitution_over_two_words() {
        assert_eq!(compute_wer("Hello world", "Hello word"), 0.5);
    }

    #[test]
    fn insertion_is_cheaper_than_positional_shift() {
        // One inserted word: edit distance 1, positional comparison 3.
        let wer = compute_wer("I like green tea", "I really like green tea");
        assert!((wer - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn wer_can_exceed_one() {
        let wer = compute_wer("yes", "no no no no");
        assert!((wer - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn wer_is_not_symmetric_when_lengths_differ() {
        let forward = compute_wer("one two three four", "one two");
        let backward = compute_wer("one two", "one two three four");
        assert!((forward - 0.5).abs() < f64::EPSILON);
        assert!((backward - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_reference_edge_cases() {
        assert_eq!(compute_wer("   ", ""), 0.0);
        assert_eq!(compute_wer("", "something"), 1.0);
    }

    #[test]
    fn empty_hypothesis_is_full_error() {
        assert_eq!(compute_wer("a b c", ""), 1.0);
    }

    #[test]
    fn positional_score_one_substitution() {
        let result = positional_score("Hello world", "Hello word", "mismatch");
        assert_eq!(result.score, 50);
        assert!((result.wer - 0.5).abs() < f64::EPSILON);
        assert_eq!(
            result.errors,
            vec![WordError {
                expected: "world".into(),
                actual: "word".into(),
                explanation: "mismatch".into(),
            }]
        );
        assert!(result.alternatives.is_empty());
    }

    #[test]
    fn positional_score_perfect_answer() {
        let result = positional_score("See you soon", "see YOU soon", "x");
        assert_eq!(result.score, 100);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn positional_score_counts_missing_and_extra_words() {
        let result = positional_score("a b", "a b c d", "x");
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].expected, "");
        assert_eq!(result.errors[0].actual, "c");
        // wer 1.0 -> score 0
        assert_eq!(result.score, 0);
    }

    #[test]
    fn positional_score_floors_at_zero() {
        let result = positional_score("a", "b c d", "x");
        assert!((result.wer - 3.0).abs() < f64::EPSILON);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn positional_score_empty_answer() {
        let result = positional_score("Good morning", "", "x");
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn highlight_marks_positional_mismatches() {
        let words = highlight_differences("Could you help me", "could you hold me");
        let flags: Vec<bool> = words.iter().map(|w| w.is_error).collect();
        assert_eq!(flags, vec![false, false, true, false]);
        assert_eq!(words[0].word, "Could");
    }
}
