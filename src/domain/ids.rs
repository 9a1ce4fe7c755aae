use serde::{Deserialize, Serialize};
use std::fmt;

/// Audio edition (reciter) identifier, e.g. `ar.alafasy`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioEdition(String);

/// Text edition identifier, e.g. `quran-uthmani-quran-academy`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextEdition(String);

pub const DEFAULT_AUDIO_EDITION: &str = "ar.alafasy";
pub const DEFAULT_TEXT_EDITION: &str = "quran-uthmani-quran-academy";

impl AudioEdition {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display name of a known reciter; falls back to the raw id.
    pub fn display_name(&self) -> &str {
        RECITERS
            .iter()
            .find(|r| r.id == self.0)
            .map(|r| r.name)
            .unwrap_or(self.0.as_str())
    }

    pub fn is_known(&self) -> bool {
        RECITERS.iter().any(|r| r.id == self.0)
    }
}

impl Default for AudioEdition {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIO_EDITION)
    }
}

impl fmt::Display for AudioEdition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TextEdition {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Only the default edition is shipped as local chapter files.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_TEXT_EDITION
    }
}

impl Default for TextEdition {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_EDITION)
    }
}

impl fmt::Display for TextEdition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text and audio edition pair that a passage is resolved against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Editions {
    pub text: TextEdition,
    pub audio: AudioEdition,
}

#[derive(Debug, Clone, Copy)]
pub struct Reciter {
    pub id: &'static str,
    pub name: &'static str,
}

/// Reciters offered in the edition selector.
pub const RECITERS: &[Reciter] = &[
    Reciter {
        id: "ar.abdulbasitmurattal",
        name: "عبد الباسط (مرتل)",
    },
    Reciter {
        id: "ar.alafasy",
        name: "مشاري العفاسي",
    },
    Reciter {
        id: "ar.husary",
        name: "محمود الحصري",
    },
    Reciter {
        id: "ar.hudhaify",
        name: "علي الحذيفي",
    },
    Reciter {
        id: "ar.minshawi",
        name: "محمد صديق المنشاوي",
    },
    Reciter {
        id: "ar.muhammadayyoub",
        name: "محمد أيوب",
    },
    Reciter {
        id: "ar.aymanswoaid",
        name: "أيمن سويد",
    },
    Reciter {
        id: "ar.mahermuaiqly",
        name: "ماهر المعيقلي",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_edition_serde_is_transparent() {
        let e = AudioEdition::new("ar.husary");
        let s = serde_json::to_string(&e).unwrap();
        assert_eq!(s, "\"ar.husary\"");
        let back: AudioEdition = serde_json::from_str(&s).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        assert_eq!(AudioEdition::default().display_name(), "مشاري العفاسي");
        let custom = AudioEdition::new("en.walk");
        assert_eq!(custom.display_name(), "en.walk");
        assert!(!custom.is_known());
    }

    #[test]
    fn test_only_default_text_edition_is_local() {
        assert!(TextEdition::default().is_default());
        assert!(!TextEdition::new("quran-simple").is_default());
    }
}
