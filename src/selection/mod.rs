//! Reacting to a selected story position: stop what plays, resolve the
//! passage text, rebind the playback engine to the new queue.

mod tracker;

pub use tracker::{RequestKey, RequestTracker};

use std::sync::Arc;

use crate::domain::{AudioEdition, Editions, PlayableItem, StoryPosition, Verse};
use crate::error::AppError;
use crate::passage::{LocalText, PassageResolver, RemoteText};
use crate::playback::{EventReceiver, PlaybackHandle};
use crate::settings::{AppSettings, SettingsStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOrigin {
    /// Clicked by the user; the view scrolls to it.
    User,
    DeepLink,
    /// First position of a story picked automatically.
    Initial,
    /// Same position again after a setting changed.
    Refresh,
}

impl SelectionOrigin {
    pub fn auto_scroll(self) -> bool {
        matches!(self, SelectionOrigin::User)
    }
}

/// What a consumer needs to show a freshly bound position.
#[derive(Debug)]
pub struct SelectionView {
    pub position: StoryPosition,
    pub verses: Vec<Verse>,
    pub auto_scroll: bool,
    /// Events of the new playback session.
    pub events: EventReceiver,
}

type SharedResolver<L, R> = Arc<PassageResolver<L, R>>;

/// A selection whose text is not resolved yet. [`resolve`](Self::resolve)
/// may run on another task; hand the result back to
/// [`SelectionController::finish`].
pub struct PendingSelection<L, R> {
    req_id: u64,
    position: StoryPosition,
    origin: SelectionOrigin,
    editions: Editions,
    resolver: SharedResolver<L, R>,
}

impl<L: LocalText, R: RemoteText> PendingSelection<L, R> {
    pub async fn resolve(self) -> ResolvedSelection {
        let verses = self
            .resolver
            .resolve(&self.position.passage, &self.editions)
            .await;
        ResolvedSelection {
            req_id: self.req_id,
            position: self.position,
            origin: self.origin,
            verses,
        }
    }
}

#[derive(Debug)]
pub struct ResolvedSelection {
    req_id: u64,
    position: StoryPosition,
    origin: SelectionOrigin,
    verses: Vec<Verse>,
}

pub struct SelectionController<L, R> {
    resolver: SharedResolver<L, R>,
    playback: PlaybackHandle,
    settings: SettingsStore,
    tracker: RequestTracker<RequestKey>,
    current: Option<StoryPosition>,
}

impl<L: LocalText, R: RemoteText> SelectionController<L, R> {
    pub fn new(
        resolver: PassageResolver<L, R>,
        playback: PlaybackHandle,
        settings: SettingsStore,
    ) -> Self {
        Self {
            resolver: Arc::new(resolver),
            playback,
            settings,
            tracker: RequestTracker::new(),
            current: None,
        }
    }

    pub fn current(&self) -> Option<&StoryPosition> {
        self.current.as_ref()
    }

    pub fn settings(&self) -> &AppSettings {
        self.settings.get()
    }

    pub fn playback(&self) -> &PlaybackHandle {
        &self.playback
    }

    /// Stops playback and starts tracking `position` as the latest selection.
    pub async fn begin(
        &mut self,
        position: StoryPosition,
        origin: SelectionOrigin,
    ) -> Result<PendingSelection<L, R>, AppError> {
        self.playback.stop().await?;
        let req_id = self.tracker.issue(RequestKey::Selection);
        tracing::info!(
            req_id,
            passage = %position.passage,
            ?origin,
            "position selected"
        );
        self.current = Some(position.clone());
        Ok(PendingSelection {
            req_id,
            position,
            origin,
            editions: self.settings.get().editions(),
            resolver: Arc::clone(&self.resolver),
        })
    }

    /// Binds the resolved passage to the playback engine, leaving it
    /// stopped. `Ok(None)` when a newer selection superseded this one.
    pub async fn finish(
        &mut self,
        resolved: ResolvedSelection,
    ) -> Result<Option<SelectionView>, AppError> {
        if !self.tracker.accept(&RequestKey::Selection, resolved.req_id) {
            tracing::debug!(
                req_id = resolved.req_id,
                passage = %resolved.position.passage,
                "dropping stale selection"
            );
            return Ok(None);
        }

        let chapter = resolved.position.passage.chapter();
        let items = resolved
            .verses
            .iter()
            .map(|v| PlayableItem::new(chapter, v.number))
            .collect();
        let events = self
            .playback
            .set_queue(items, self.settings.get().repeat)
            .await?;

        Ok(Some(SelectionView {
            auto_scroll: resolved.origin.auto_scroll(),
            position: resolved.position,
            verses: resolved.verses,
            events,
        }))
    }

    pub async fn select(
        &mut self,
        position: StoryPosition,
        origin: SelectionOrigin,
    ) -> Result<Option<SelectionView>, AppError> {
        let pending = self.begin(position, origin).await?;
        let resolved = pending.resolve().await;
        self.finish(resolved).await
    }

    /// Persists the reciter and reloads the current position with it.
    pub async fn change_audio_edition(
        &mut self,
        edition: AudioEdition,
    ) -> Result<Option<SelectionView>, AppError> {
        if let Err(e) = self.settings.update(|s| s.audio_edition = edition) {
            tracing::warn!(err = %e, "failed to persist audio edition");
        }
        match self.current.clone() {
            Some(position) => self.select(position, SelectionOrigin::Refresh).await,
            None => Ok(None),
        }
    }

    /// Persists the repeat count and applies it to the live session.
    pub async fn change_repeat(&mut self, count: u32) -> Result<(), AppError> {
        if let Err(e) = self.settings.update(|s| s.repeat = count) {
            tracing::warn!(err = %e, "failed to persist repeat count");
        }
        let repeat = self.settings.get().repeat;
        self.playback.set_repeat_count(repeat).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Passage, TextEdition};
    use crate::error::{ApiError, PassageError};
    use crate::output::NullOutput;
    use crate::passage::ChapterText;
    use crate::playback::{
        AudioEditionSource, PlaybackEngine, PlaybackEvent, PlaybackState, ProgressReason,
    };
    use crate::settings::load_settings;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct NoLocal;

    impl LocalText for NoLocal {
        async fn load_chapter(&self, chapter: u32) -> Result<ChapterText, PassageError> {
            Err(PassageError::LocalRead {
                path: format!("{chapter}.json").into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    #[derive(Default)]
    struct EchoRemote {
        /// Chapter whose verses take ten seconds to arrive.
        slow_chapter: Option<u32>,
    }

    impl RemoteText for EchoRemote {
        async fn verse_text(
            &self,
            chapter: u32,
            verse: u32,
            _edition: &TextEdition,
        ) -> Result<String, ApiError> {
            if self.slow_chapter == Some(chapter) {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Ok(format!("{chapter}:{verse}"))
        }
    }

    struct EchoAudio;

    impl AudioEditionSource for EchoAudio {
        async fn lookup_audio(
            &self,
            chapter: u32,
            verse: u32,
            edition: AudioEdition,
        ) -> Result<Option<String>, ApiError> {
            Ok(Some(format!("{edition}/{chapter}/{verse}.mp3")))
        }
    }

    fn position(chapter: u32, from: u32, to: u32) -> StoryPosition {
        StoryPosition::new(1, Passage::new(chapter, from, to).expect("passage"))
    }

    fn controller(dir: &std::path::Path) -> SelectionController<NoLocal, EchoRemote> {
        controller_with(dir, EchoRemote::default())
    }

    fn controller_with(
        dir: &std::path::Path,
        remote: EchoRemote,
    ) -> SelectionController<NoLocal, EchoRemote> {
        let settings = SettingsStore::open(dir);
        let (tx_out, rx_out) = mpsc::unbounded_channel();
        let output = NullOutput::new(tx_out, Duration::from_secs(2));
        let (engine, handle) =
            PlaybackEngine::new(Arc::new(EchoAudio), settings.audio_edition(), output, rx_out);
        tokio::spawn(engine.run());
        SelectionController::new(PassageResolver::new(NoLocal, remote), handle, settings)
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_binds_queue_without_playing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctl = controller(dir.path());

        let view = ctl
            .select(position(12, 4, 6), SelectionOrigin::User)
            .await
            .expect("select")
            .expect("latest selection");
        assert!(view.auto_scroll);
        let texts: Vec<_> = view.verses.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(texts, ["12:4", "12:5", "12:6"]);

        let status = ctl.playback().status().await.expect("status");
        assert_eq!(status.len, 3);
        assert_eq!(status.state, PlaybackState::Idle);
        assert_eq!(status.cursor, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deep_link_does_not_scroll() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctl = controller(dir.path());
        for origin in [SelectionOrigin::DeepLink, SelectionOrigin::Initial] {
            let view = ctl
                .select(position(18, 60, 61), origin)
                .await
                .expect("select")
                .expect("view");
            assert!(!view.auto_scroll);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_selection_is_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctl = controller(dir.path());

        let first = ctl
            .begin(position(12, 1, 2), SelectionOrigin::User)
            .await
            .expect("begin");
        let second = ctl
            .begin(position(28, 7, 9), SelectionOrigin::User)
            .await
            .expect("begin");

        let late = first.resolve().await;
        assert!(ctl.finish(late).await.expect("finish").is_none());

        let view = ctl
            .finish(second.resolve().await)
            .await
            .expect("finish")
            .expect("latest wins");
        assert_eq!(view.position.passage.chapter(), 28);
        assert_eq!(ctl.playback().status().await.expect("status").len, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stale_selection_does_not_block_latest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let remote = EchoRemote {
            slow_chapter: Some(12),
        };
        let mut ctl = controller_with(dir.path(), remote);

        let first = ctl
            .begin(position(12, 1, 2), SelectionOrigin::User)
            .await
            .expect("begin");
        let second = ctl
            .begin(position(28, 7, 9), SelectionOrigin::User)
            .await
            .expect("begin");
        let slow = tokio::spawn(first.resolve());
        tokio::task::yield_now().await;

        let resolved = tokio::time::timeout(Duration::from_secs(1), second.resolve())
            .await
            .expect("latest resolves while the stale fetch is in flight");
        let view = ctl.finish(resolved).await.expect("finish").expect("view");
        assert_eq!(view.position.passage.chapter(), 28);

        let late = slow.await.expect("join");
        assert!(ctl.finish(late).await.expect("finish").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_selection_stops_previous_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctl = controller(dir.path());

        let mut old = ctl
            .select(position(12, 1, 3), SelectionOrigin::User)
            .await
            .expect("select")
            .expect("view");
        ctl.playback().play().await.expect("play");
        tokio::time::sleep(Duration::from_millis(500)).await;

        ctl.select(position(19, 1, 2), SelectionOrigin::User)
            .await
            .expect("select");

        let mut saw_stop = false;
        while let Some(evt) = old.events.recv().await {
            if let PlaybackEvent::Progress {
                index: None,
                reason: ProgressReason::Stopped,
                ..
            } = evt
            {
                saw_stop = true;
            }
        }
        assert!(saw_stop);
        let status = ctl.playback().status().await.expect("status");
        assert_eq!(status.state, PlaybackState::Idle);
        assert_eq!(status.len, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_audio_edition_persists_and_reselects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctl = controller(dir.path());
        assert!(
            ctl.change_audio_edition(AudioEdition::new("ar.minshawi"))
                .await
                .expect("change")
                .is_none()
        );

        ctl.select(position(12, 4, 4), SelectionOrigin::User)
            .await
            .expect("select");
        let view = ctl
            .change_audio_edition(AudioEdition::new("ar.husary"))
            .await
            .expect("change")
            .expect("reselected");
        assert!(!view.auto_scroll);
        assert_eq!(view.position.passage.from(), 4);
        assert_eq!(
            load_settings(dir.path()).audio_edition,
            AudioEdition::new("ar.husary")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_repeat_reaches_live_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctl = controller(dir.path());
        ctl.select(position(12, 1, 2), SelectionOrigin::User)
            .await
            .expect("select");

        ctl.change_repeat(0).await.expect("repeat");
        assert_eq!(ctl.settings().repeat, 1);
        ctl.change_repeat(4).await.expect("repeat");
        let status = ctl.playback().status().await.expect("status");
        assert_eq!(status.repeat.total(), 4);
        assert_eq!(load_settings(dir.path()).repeat, 4);
    }
}
