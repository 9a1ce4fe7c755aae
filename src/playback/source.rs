use std::future::Future;

use crate::alquran::AlQuranClient;
use crate::domain::AudioEdition;
use crate::error::ApiError;

/// Resolves a verse to a playable recitation URL for one audio edition.
///
/// `Ok(None)` means the edition has no audio for the verse. Retries, if any,
/// are the implementor's business.
pub trait AudioEditionSource: Send + Sync + 'static {
    fn lookup_audio(
        &self,
        chapter: u32,
        verse: u32,
        edition: AudioEdition,
    ) -> impl Future<Output = Result<Option<String>, ApiError>> + Send;
}

impl AudioEditionSource for AlQuranClient {
    async fn lookup_audio(
        &self,
        chapter: u32,
        verse: u32,
        edition: AudioEdition,
    ) -> Result<Option<String>, ApiError> {
        self.ayah_audio(chapter, verse, edition.as_str()).await
    }
}
