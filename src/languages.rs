use serde::{Deserialize, Serialize};
use std::fmt;

/// Target languages supported by the translation collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Th,
    En,
    Ja,
    Ko,
    Zh,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Th,
        Language::En,
        Language::Ja,
        Language::Ko,
        Language::Zh,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Th => "th",
            Language::En => "en",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Zh => "zh",
        }
    }

    pub fn english_name(&self) -> &'static str {
        match self {
            Language::Th => "Thai",
            Language::En => "English",
            Language::Ja => "Japanese",
            Language::Ko => "Korean",
            Language::Zh => "Chinese",
        }
    }

    pub fn parse(code: &str) -> Option<Language> {
        match code.trim().to_lowercase().as_str() {
            "th" => Some(Language::Th),
            "en" => Some(Language::En),
            "ja" => Some(Language::Ja),
            "ko" => Some(Language::Ko),
            "zh" => Some(Language::Zh),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
