//! dictcli: English dictation practice in the terminal.
//!
//! A round generates a sentence for the learner's CEFR level and topic,
//! speaks it through a text-to-speech provider, and scores what the learner
//! typed.  See [`pipeline`] for the round flow.

pub mod audio;
pub mod config;
pub mod history;
pub mod llm;
pub mod locale;
pub mod metrics;
pub mod pipeline;
