use serde::Deserialize;
use serde_json::Value;

/// Envelope shared by every alquran.cloud response.
///
/// On failure `data` is a plain message string instead of an object.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AyahData {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub audio_secondary: Vec<String>,
    #[serde(default)]
    pub number_in_surah: Option<u32>,
}

impl AyahData {
    /// Primary audio URL, falling back to the first secondary one.
    pub fn audio_url(&self) -> Option<String> {
        self.audio
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| {
                self.audio_secondary
                    .iter()
                    .map(String::as_str)
                    .find(|u| !u.trim().is_empty())
            })
            .map(str::to_owned)
    }
}
