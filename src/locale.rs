//! UI language detection from the process environment.
//!
//! Only Japanese and English are supported; everything else falls back to
//! English.  The language decides the fixed explanation string used by the
//! local fallback scorer and the feedback language requested from the
//! remote scorer.

/// Language used for learner-facing strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiLanguage {
    Japanese,
    #[default]
    English,
}

impl UiLanguage {
    /// Detect from `LANG`, `LC_ALL`, then `LC_MESSAGES`.
    pub fn detect() -> Self {
        ["LANG", "LC_ALL", "LC_MESSAGES"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.is_empty())
            .map(|value| Self::from_locale(&value))
            .unwrap_or_default()
    }

    /// Parse a POSIX locale string such as `ja_JP.UTF-8`.
    ///
    /// ```
    /// use dictcli::locale::UiLanguage;
    ///
    /// assert_eq!(UiLanguage::from_locale("ja_JP.UTF-8"), UiLanguage::Japanese);
    /// assert_eq!(UiLanguage::from_locale("C"), UiLanguage::English);
    /// ```
    pub fn from_locale(locale: &str) -> Self {
        let language: String = locale
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();

        match language.as_str() {
            "ja" => Self::Japanese,
            _ => Self::English,
        }
    }

    /// Explanation attached to every mismatch by the fallback scorer.
    pub fn mismatch_explanation(self) -> &'static str {
        match self {
            Self::Japanese => "単語が一致しません",
            Self::English => "The word does not match",
        }
    }

    /// Language name inserted into the scoring prompt.
    pub fn feedback_language(self) -> &'static str {
        match self {
            Self::Japanese => "Japanese",
            Self::English => "English",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_prefix() {
        assert_eq!(UiLanguage::from_locale("ja"), UiLanguage::Japanese);
        assert_eq!(UiLanguage::from_locale("JA_jp"), UiLanguage::Japanese);
        assert_eq!(UiLanguage::from_locale("en_US.UTF-8"), UiLanguage::English);
        assert_eq!(UiLanguage::from_locale("fr_FR"), UiLanguage::English);
        assert_eq!(UiLanguage::from_locale(""), UiLanguage::English);
    }

    #[test]
    fn explanations_differ_per_language() {
        assert_ne!(
            UiLanguage::Japanese.mismatch_explanation(),
            UiLanguage::English.mismatch_explanation()
        );
        assert_eq!(UiLanguage::Japanese.feedback_language(), "Japanese");
    }
}
