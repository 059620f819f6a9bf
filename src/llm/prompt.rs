//! Prompts for sentence generation and answer scoring.
//!
//! [`Prompt`] holds `(system_msg, user_msg)` pairs for any
//! OpenAI-compatible `/v1/chat/completions` endpoint:
//! * [`generation`](Prompt::generation): one dictation sentence for
//!   a CEFR level, topic and word count.  A random context, sentence
//!   structure and tone are drawn each time so consecutive rounds differ,
//!   plus a scene from the [`SceneLibrary`] when one is available.
//! * [`scoring`](Prompt::scoring): JSON-mode evaluation of a
//!   learner's answer against the reference.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{Level, Topic};
use crate::llm::scene::SceneLibrary;
use crate::locale::UiLanguage;

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

const GENERATION_SYSTEM: &str = "You are an English teacher creating dictation exercises.";

const SCORING_SYSTEM: &str = "You are an English teacher grading dictation exercises and giving \
short, friendly feedback to language learners.";

// ---------------------------------------------------------------------------
// Variety pools
// ---------------------------------------------------------------------------

fn contexts(topic: Topic) -> &'static [&'static str] {
    match topic {
        Topic::Business => &[
            "during a meeting",
            "in an email",
            "at a conference",
            "in a presentation",
            "negotiating a deal",
        ],
        Topic::Technology => &[
            "debugging code",
            "explaining features",
            "in documentation",
            "tech support",
            "discussing AI",
        ],
        Topic::Travel => &[
            "at the airport",
            "in a hotel",
            "asking for directions",
            "ordering food",
            "planning an itinerary",
        ],
        Topic::EverydayLife => &[
            "at home",
            "shopping",
            "with friends",
            "on the phone",
            "running errands",
        ],
        Topic::Health => &[
            "at the doctor",
            "discussing symptoms",
            "fitness advice",
            "mental wellness",
            "nutrition planning",
        ],
        Topic::Entertainment => &[
            "after a movie",
            "at a concert",
            "talking about a series",
            "planning a game night",
            "reviewing a book",
        ],
        Topic::Random => &["general situation"],
    }
}

const SENTENCE_STRUCTURES: &[&str] = &[
    "statement",
    "question",
    "exclamation",
    "conditional (if...then)",
    "comparative",
    "passive voice",
    "reported speech",
    "complex with multiple clauses",
];

const TONES: &[&str] = &[
    "formal",
    "casual",
    "enthusiastic",
    "skeptical",
    "humorous",
    "serious",
    "encouraging",
    "cautious",
];

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// A `(system, user)` chat prompt.
///
/// # Example
/// ```rust
/// use dictcli::config::{Level, Topic};
/// use dictcli::llm::Prompt;
///
/// let mut rng = rand::thread_rng();
/// let prompt = Prompt::generation(Level::B1, Topic::Travel, 8, &mut rng);
/// assert!(prompt.user.contains("exactly 8 words"));
/// ```
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    /// Concrete topic of a generation prompt ([`Topic::Random`] already
    /// resolved).  `None` for scoring prompts.
    pub topic: Option<Topic>,
}

impl Prompt {
    /// Prompt asking for one natural sentence of exactly `word_count` words.
    pub fn generation<R: Rng + ?Sized>(
        level: Level,
        topic: Topic,
        word_count: u32,
        rng: &mut R,
    ) -> Self {
        Self::generation_in_scene(level, topic, word_count, &SceneLibrary::default(), rng)
    }

    /// Like [`generation`](Self::generation), with a random scene for the
    /// resolved topic added when `scenes` has one.
    pub fn generation_in_scene<R: Rng + ?Sized>(
        level: Level,
        topic: Topic,
        word_count: u32,
        scenes: &SceneLibrary,
        rng: &mut R,
    ) -> Self {
        let topic = match topic {
            Topic::Random => *Topic::CONCRETE.choose(rng).unwrap_or(&Topic::EverydayLife),
            other => other,
        };

        let context = contexts(topic).choose(rng).copied().unwrap_or("general situation");
        let structure = SENTENCE_STRUCTURES.choose(rng).copied().unwrap_or("statement");
        let tone = TONES.choose(rng).copied().unwrap_or("casual");
        let scene = scenes
            .random(topic, rng)
            .map(|scene| {
                format!(
                    "\n- Scene: \"{scene}\" (the sentence should fit or could occur in this situation)"
                )
            })
            .unwrap_or_default();

        let user = format!(
            "Generate a REALISTIC and NATURAL English sentence that people would actually say \
in real-life situations.

Requirements:
- Level: {level} ({description})
- Topic: {topic}
- Context: {context}{scene}
- Sentence structure: {structure}
- Tone: {tone}
- Word count: exactly {word_count} words

Rules:
1. The sentence must be something people would actually say in real conversation.
2. It must be grammatically correct.
3. Avoid textbook-style sentences such as \"The pen is on the table\".
4. Include natural punctuation and contractions.

Return only the sentence, nothing else.",
            description = level.description(),
        );

        Self {
            system: GENERATION_SYSTEM.to_string(),
            user,
            topic: Some(topic),
        }
    }

    /// JSON-mode prompt evaluating `hypothesis` against `reference`.
    ///
    /// Explanations are requested in the learner's UI language.
    pub fn scoring(reference: &str, hypothesis: &str, language: UiLanguage) -> Self {
        let user = format!(
            "Evaluate a dictation exercise.

Reference sentence: \"{reference}\"
Student's answer: \"{hypothesis}\"

Provide:
1. A score out of 100 based on accuracy.
2. The word error rate (WER) as a decimal.
3. The list of word errors with explanations in {language}.
4. Two or three alternative correct phrasings in English.

Scoring rules:
- Do NOT penalize a missing or extra period or exclamation mark at the end.
- Focus on word accuracy and spelling.
- Other punctuation inside the sentence still counts.

Respond with JSON only:
{{\"score\": 85, \"wer\": 0.15, \"errors\": [{{\"expected\": \"word1\", \"actual\": \"word2\", \
\"explanation\": \"...\"}}], \"alternatives\": [\"...\"]}}",
            language = language.feedback_language(),
        );

        Self {
            system: SCORING_SYSTEM.to_string(),
            user,
            topic: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generation_prompt_carries_requirements() {
        let mut rng = StdRng::seed_from_u64(7);
        let prompt = Prompt::generation(Level::C1, Topic::Business, 12, &mut rng);

        assert!(prompt.system.contains("dictation"));
        assert!(prompt.user.contains("CEFR_C1"));
        assert!(prompt.user.contains(Level::C1.description()));
        assert!(prompt.user.contains("Topic: Business"));
        assert!(prompt.user.contains("exactly 12 words"));
        assert_eq!(prompt.topic, Some(Topic::Business));
    }

    #[test]
    fn generation_context_comes_from_topic_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let prompt = Prompt::generation(Level::A1, Topic::Travel, 5, &mut rng);
        assert!(contexts(Topic::Travel)
            .iter()
            .any(|c| prompt.user.contains(&format!("Context: {c}"))));
    }

    #[test]
    fn scene_is_added_only_when_available() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("health_en.txt"), "A crowded waiting room\n").unwrap();
        let scenes = SceneLibrary::load(dir.path());
        let mut rng = StdRng::seed_from_u64(9);

        let prompt = Prompt::generation_in_scene(Level::B2, Topic::Health, 10, &scenes, &mut rng);
        assert!(prompt.user.contains("- Scene: \"A crowded waiting room\""));

        let prompt = Prompt::generation_in_scene(Level::B2, Topic::Travel, 10, &scenes, &mut rng);
        assert!(!prompt.user.contains("Scene:"));
    }

    #[test]
    fn random_topic_resolves_to_concrete_topic() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let prompt = Prompt::generation(Level::A2, Topic::Random, 6, &mut rng);
            assert!(prompt.topic.is_some_and(|t| t != Topic::Random));
            assert!(!prompt.user.contains("Topic: Random"));
        }
    }

    #[test]
    fn scoring_prompt_embeds_both_sentences_and_language() {
        let prompt = Prompt::scoring("Hello world", "Hello word", UiLanguage::Japanese);

        assert!(prompt.user.contains("Reference sentence: \"Hello world\""));
        assert!(prompt.user.contains("Student's answer: \"Hello word\""));
        assert!(prompt.user.contains("explanations in Japanese"));
        assert!(prompt.user.contains("\"alternatives\""));
    }
}
