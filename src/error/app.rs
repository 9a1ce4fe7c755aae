//! Application-level errors

use super::{ApiError, AudioError, PassageError};

/// Top-level error returned from `main` and the CLI commands
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Settings error
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Remote API error
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Audio output error
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),

    /// Passage selection or text lookup error
    #[error("passage error: {0}")]
    Passage(#[from] PassageError),

    /// Background worker went away
    #[error("playback engine channel closed")]
    EngineClosed,
}

/// Settings persistence errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to save settings: {source}")]
    Save {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode settings: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}
