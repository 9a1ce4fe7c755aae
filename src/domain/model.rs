use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

use crate::error::PassageError;

/// Number of chapters in the mushaf.
pub const CHAPTER_COUNT: u32 = 114;
/// Verses in the longest chapter (al-Baqarah).
pub const MAX_VERSE: u32 = 286;

/// Inclusive verse range inside one chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Passage {
    chapter: u32,
    from: u32,
    to: u32,
}

impl Passage {
    pub fn new(chapter: u32, from: u32, to: u32) -> Result<Self, PassageError> {
        if chapter == 0 || chapter > CHAPTER_COUNT || from == 0 || from > to || to > MAX_VERSE {
            return Err(PassageError::InvalidRange { chapter, from, to });
        }
        Ok(Self { chapter, from, to })
    }

    pub fn chapter(&self) -> u32 {
        self.chapter
    }

    pub fn from(&self) -> u32 {
        self.from
    }

    pub fn to(&self) -> u32 {
        self.to
    }

    pub fn verses(&self) -> RangeInclusive<u32> {
        self.from..=self.to
    }

    pub fn verse_count(&self) -> usize {
        (self.to - self.from + 1) as usize
    }
}

impl fmt::Display for Passage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chapter, self.from, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub number: u32,
    pub text: String,
}

/// Audio location of a queue item.
///
/// `Unavailable` means a lookup was attempted and produced nothing; the item
/// is skipped for the rest of that pass and looked up again on the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AudioUrl {
    #[default]
    Unresolved,
    Resolved(String),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableItem {
    pub chapter: u32,
    pub verse: u32,
    pub audio: AudioUrl,
}

impl PlayableItem {
    pub fn new(chapter: u32, verse: u32) -> Self {
        Self {
            chapter,
            verse,
            audio: AudioUrl::Unresolved,
        }
    }

    /// Queue items for every verse of `passage`, audio left unresolved.
    pub fn for_passage(passage: &Passage) -> Vec<Self> {
        passage
            .verses()
            .map(|v| Self::new(passage.chapter(), v))
            .collect()
    }
}

/// One selectable position of a story (chapter plus verse range).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPosition {
    pub index: u32,
    pub passage: Passage,
    #[serde(default)]
    pub chapter_name: String,
}

impl StoryPosition {
    pub fn new(index: u32, passage: Passage) -> Self {
        Self {
            index,
            passage,
            chapter_name: String::new(),
        }
    }
}
