//! Passage and text lookup errors

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PassageError {
    /// Range violates `1 <= from <= to`
    #[error("invalid passage {chapter}:{from}-{to}")]
    InvalidRange { chapter: u32, from: u32, to: u32 },

    /// Local chapter file could not be read
    #[error("failed to read local text {path}: {source}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Local chapter file is not valid JSON
    #[error("failed to parse local text {path}: {source}")]
    LocalParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
