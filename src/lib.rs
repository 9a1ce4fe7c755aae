//! Verse-by-verse recitation player for Quran story passages.
//!
//! The heart of the crate is [`playback`]: an ordered, repeatable audio queue
//! whose items resolve their recitation URL lazily. [`selection`] binds a
//! chosen story position to it; [`passage`] and [`alquran`] supply text and
//! audio locations; [`output`] plays the audio.

pub mod alquran;
mod backoff;
pub mod cli;
pub mod domain;
pub mod error;
pub mod logging;
pub mod output;
pub mod passage;
pub mod playback;
pub mod selection;
pub mod settings;
pub mod status;
