mod config;

pub use config::AlQuranClientConfig;

use crate::alquran::models::dto::{AyahData, Envelope};
use crate::backoff::sleep_backoff;
use crate::error::ApiError;
use std::time::Duration;
use urlencoding::encode;

/// Thin client for the alquran.cloud REST API.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct AlQuranClient {
    http: reqwest::Client,
    pub cfg: AlQuranClientConfig,
}

impl AlQuranClient {
    pub fn new(cfg: AlQuranClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent("qasas-player")
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .build()?;
        Ok(Self { http, cfg })
    }

    /// Verse text in `edition`; an empty string when the API has none.
    pub async fn ayah_text(&self, chapter: u32, verse: u32, edition: &str) -> Result<String, ApiError> {
        Ok(self.ayah(chapter, verse, edition).await?.text)
    }

    /// Recitation URL of a verse for an audio `edition`.
    pub async fn ayah_audio(
        &self,
        chapter: u32,
        verse: u32,
        edition: &str,
    ) -> Result<Option<String>, ApiError> {
        Ok(self.ayah(chapter, verse, edition).await?.audio_url())
    }

    pub async fn ayah(&self, chapter: u32, verse: u32, edition: &str) -> Result<AyahData, ApiError> {
        if chapter == 0 || verse == 0 {
            return Err(ApiError::BadInput("chapter and verse start at 1"));
        }
        if edition.trim().is_empty() {
            return Err(ApiError::BadInput("empty edition"));
        }
        let url = format!(
            "{}/ayah/{chapter}:{verse}/{}",
            self.cfg.api_base.trim_end_matches('/'),
            encode(edition)
        );

        let mut attempt = 0;
        loop {
            match self.get_envelope(&url).await {
                Ok(v) => return decode_ayah(v),
                Err(e) if attempt < self.cfg.retries && e.is_retryable() => {
                    tracing::debug!(attempt, url = %url, err = %e, "ayah request failed, retrying");
                    sleep_backoff(attempt, self.cfg.retry_backoff_ms, self.cfg.retry_backoff_max_ms)
                        .await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(chapter, verse, edition, err = %e, "ayah request failed");
                    return Err(e);
                }
            }
        }
    }

    async fn get_envelope(&self, url: &str) -> Result<Envelope, ApiError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        // Error bodies still carry the envelope, but the status is what matters.
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn decode_ayah(v: Envelope) -> Result<AyahData, ApiError> {
    if v.code != 200 {
        let msg = v
            .data
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| v.status.clone());
        return Err(ApiError::Api { code: v.code, msg });
    }
    Ok(serde_json::from_value(v.data)?)
}
