use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use super::resolver::LocalText;
use crate::error::PassageError;

/// Contents of one bundled `{chapter}.json` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChapterText {
    #[serde(default)]
    pub edition: String,
    #[serde(default)]
    pub ayahs: HashMap<String, String>,
}

impl ChapterText {
    /// Non-empty text of `verse`, if present.
    pub fn verse(&self, verse: u32) -> Option<&str> {
        self.ayahs
            .get(&verse.to_string())
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
    }
}

/// Reads chapter files from `{dir}/{chapter}.json`.
#[derive(Debug, Clone)]
pub struct LocalTextStore {
    dir: PathBuf,
}

impl LocalTextStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn chapter_path(&self, chapter: u32) -> PathBuf {
        self.dir.join(format!("{chapter}.json"))
    }
}

impl LocalText for LocalTextStore {
    async fn load_chapter(&self, chapter: u32) -> Result<ChapterText, PassageError> {
        let path = self.chapter_path(chapter);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| PassageError::LocalRead {
                path: path.clone(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| PassageError::LocalParse { path, source })
    }
}
