use futures_util::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use super::local::ChapterText;
use crate::alquran::AlQuranClient;
use crate::domain::{AudioEdition, Editions, Passage, TextEdition, Verse};
use crate::error::{ApiError, PassageError};

/// Text shown for a verse that could not be loaded from any source.
pub const UNAVAILABLE_TEXT: &str = "(تعذر تحميل الآية)";

/// Offline chapter text, only consulted for the default text edition.
pub trait LocalText: Send + Sync {
    fn load_chapter(
        &self,
        chapter: u32,
    ) -> impl Future<Output = Result<ChapterText, PassageError>> + Send;
}

/// Remote per-verse text lookup.
pub trait RemoteText: Send + Sync {
    fn verse_text(
        &self,
        chapter: u32,
        verse: u32,
        edition: &TextEdition,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;
}

impl RemoteText for AlQuranClient {
    async fn verse_text(
        &self,
        chapter: u32,
        verse: u32,
        edition: &TextEdition,
    ) -> Result<String, ApiError> {
        self.ayah_text(chapter, verse, edition.as_str()).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PassageKey {
    pub chapter: u32,
    pub from: u32,
    pub to: u32,
    pub text: TextEdition,
    pub audio: AudioEdition,
}

impl PassageKey {
    fn new(passage: &Passage, editions: &Editions) -> Self {
        Self {
            chapter: passage.chapter(),
            from: passage.from(),
            to: passage.to(),
            text: editions.text.clone(),
            audio: editions.audio.clone(),
        }
    }
}

/// Resolves a passage to its ordered verses.
///
/// Results are memoized for the lifetime of the resolver and never
/// invalidated; the underlying texts are read-only. The memo locks are never
/// held across a fetch, so concurrent resolutions do not wait on each other.
pub struct PassageResolver<L, R> {
    local: L,
    remote: R,
    chapters: Mutex<HashMap<u32, Arc<ChapterText>>>,
    cache: Mutex<HashMap<PassageKey, Vec<Verse>>>,
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<L: LocalText, R: RemoteText> PassageResolver<L, R> {
    pub fn new(local: L, remote: R) -> Self {
        Self {
            local,
            remote,
            chapters: Mutex::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_cached(&self, passage: &Passage, editions: &Editions) -> bool {
        locked(&self.cache).contains_key(&PassageKey::new(passage, editions))
    }

    /// Ordered verses of `passage`; never fails as a whole.
    ///
    /// A verse missing from every source carries [`UNAVAILABLE_TEXT`].
    pub async fn resolve(&self, passage: &Passage, editions: &Editions) -> Vec<Verse> {
        let key = PassageKey::new(passage, editions);
        let hit = locked(&self.cache).get(&key).cloned();
        if let Some(hit) = hit {
            return hit;
        }

        let mut verses: Vec<Verse> = passage
            .verses()
            .map(|number| Verse {
                number,
                text: String::new(),
            })
            .collect();

        if editions.text.is_default()
            && let Some(chapter) = self.local_chapter(passage.chapter()).await
        {
            for v in &mut verses {
                if let Some(text) = chapter.verse(v.number) {
                    v.text = text.to_owned();
                }
            }
        }

        let missing: Vec<usize> = verses
            .iter()
            .enumerate()
            .filter(|(_, v)| v.text.is_empty())
            .map(|(i, _)| i)
            .collect();
        if !missing.is_empty() {
            tracing::debug!(
                passage = %passage,
                missing = missing.len(),
                edition = %editions.text,
                "fetching verse text remotely"
            );
            let remote = &self.remote;
            let chapter = passage.chapter();
            let fetched = join_all(missing.iter().map(|&i| {
                let number = verses[i].number;
                async move { remote.verse_text(chapter, number, &editions.text).await }
            }))
            .await;

            for (&i, result) in missing.iter().zip(fetched) {
                verses[i].text = match result {
                    Ok(text) if !text.trim().is_empty() => text,
                    Ok(_) => UNAVAILABLE_TEXT.to_owned(),
                    Err(e) => {
                        tracing::warn!(chapter, verse = verses[i].number, err = %e, "verse text unavailable");
                        UNAVAILABLE_TEXT.to_owned()
                    }
                };
            }
        }

        locked(&self.cache).insert(key, verses.clone());
        verses
    }

    async fn local_chapter(&self, chapter: u32) -> Option<Arc<ChapterText>> {
        let hit = locked(&self.chapters).get(&chapter).cloned();
        if hit.is_some() {
            return hit;
        }
        match self.local.load_chapter(chapter).await {
            Ok(text) => {
                let text = Arc::new(text);
                locked(&self.chapters).insert(chapter, Arc::clone(&text));
                Some(text)
            }
            Err(e) => {
                tracing::warn!(chapter, err = %e, "local text load failed, falling back to remote");
                None
            }
        }
    }
}
