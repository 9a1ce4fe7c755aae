//! Verse text lookup for a passage: local chapter files first, remote API for
//! whatever is missing.

mod local;
mod resolver;

pub use local::{ChapterText, LocalTextStore};
pub use resolver::{LocalText, PassageKey, PassageResolver, RemoteText, UNAVAILABLE_TEXT};
