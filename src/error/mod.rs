//! Structured error types for every module.
//!
//! The playback core never returns these to its caller; they surface from the
//! collaborators (HTTP client, passage resolver, settings, audio output) and
//! are logged or converted at the edges.

mod api;
mod app;
mod audio;
mod passage;

pub use api::ApiError;
pub use app::{AppError, SettingsError};
pub use audio::AudioError;
pub use passage::PassageError;
