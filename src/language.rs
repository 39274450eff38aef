//! Supported language codes.
//!
//! Codes follow the two/five letter tags used by the translation and speech
//! providers (`en`, `zh-cn`, ...). [`Language::Auto`] only makes sense as a
//! source-language hint; it is never a valid translation target.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A language from the fixed set the service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Language {
    /// Let the provider detect the language.
    Auto,
    /// English.
    #[default]
    En,
    /// Spanish.
    Es,
    /// French.
    Fr,
    /// German.
    De,
    /// Arabic.
    Ar,
    /// Urdu.
    Ur,
    /// Chinese (Simplified).
    ZhCn,
    /// Japanese.
    Ja,
    /// Korean.
    Ko,
}

impl Language {
    /// Every supported language, `auto` first.
    pub const ALL: [Self; 10] = [
        Self::Auto,
        Self::En,
        Self::Es,
        Self::Fr,
        Self::De,
        Self::Ar,
        Self::Ur,
        Self::ZhCn,
        Self::Ja,
        Self::Ko,
    ];

    /// The wire code, e.g. `zh-cn`.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
            Self::Ar => "ar",
            Self::Ur => "ur",
            Self::ZhCn => "zh-cn",
            Self::Ja => "ja",
            Self::Ko => "ko",
        }
    }

    /// Human readable English name, used in prompts and UI labels.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Auto => "Auto Detect",
            Self::En => "English",
            Self::Es => "Spanish",
            Self::Fr => "French",
            Self::De => "German",
            Self::Ar => "Arabic",
            Self::Ur => "Urdu",
            Self::ZhCn => "Chinese (Simplified)",
            Self::Ja => "Japanese",
            Self::Ko => "Korean",
        }
    }

    #[must_use]
    pub fn is_english(self) -> bool {
        self == Self::En
    }

    /// Whether text can be translated *into* this language.
    #[must_use]
    pub fn is_valid_target(self) -> bool {
        self != Self::Auto
    }

    /// Lenient target parsing: anything unrecognized becomes English.
    #[must_use]
    pub fn parse_or_english(raw: &str) -> Self {
        match raw.parse::<Self>() {
            Ok(lang) if lang.is_valid_target() => lang,
            _ => {
                tracing::warn!(language = %raw, "Unrecognized target language, defaulting to English");
                Self::En
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a string names no supported language.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language: {0:?}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    /// Accepts a code (`es`, `zh-CN`, `zh_cn`) or a display name (`Spanish`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == needle || lang.name().to_lowercase() == needle)
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

impl TryFrom<String> for Language {
    type Error = UnknownLanguage;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_and_names() {
        assert_eq!("es".parse::<Language>().unwrap(), Language::Es);
        assert_eq!("zh-CN".parse::<Language>().unwrap(), Language::ZhCn);
        assert_eq!("zh_cn".parse::<Language>().unwrap(), Language::ZhCn);
        assert_eq!("Urdu".parse::<Language>().unwrap(), Language::Ur);
        assert_eq!(" french ".parse::<Language>().unwrap(), Language::Fr);
    }

    #[test]
    fn test_unknown_language() {
        let err = "klingon".parse::<Language>().unwrap_err();
        assert_eq!(err, UnknownLanguage("klingon".to_string()));
    }

    #[test]
    fn test_auto_is_not_a_target() {
        assert!(!Language::Auto.is_valid_target());
        assert!(Language::Ko.is_valid_target());
    }

    #[test]
    fn test_lenient_parse_defaults_to_english() {
        assert_eq!(Language::parse_or_english("Klingon"), Language::En);
        assert_eq!(Language::parse_or_english("auto"), Language::En);
        assert_eq!(Language::parse_or_english("Spanish"), Language::Es);
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&Language::ZhCn).unwrap();
        assert_eq!(json, "\"zh-cn\"");
        let lang: Language = serde_json::from_str("\"ja\"").unwrap();
        assert_eq!(lang, Language::Ja);
    }
}
