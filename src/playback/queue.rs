//! The playback sequencing state machine.
//!
//! [`PlaybackQueue`] is synchronous: it never awaits. Audio URL lookups are
//! spawned onto the runtime and come back through [`on_lookup`]; the output's
//! lifecycle comes back through [`on_output`]. Both carry tags (generation +
//! request id, [`LoadId`]) and anything that no longer matches the live
//! session is dropped, so replacing or stopping a session is the only
//! cancellation there is.
//!
//! [`on_lookup`]: PlaybackQueue::on_lookup
//! [`on_output`]: PlaybackQueue::on_output

use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use super::messages::{
    EventSender, LookupOutcome, LookupReceiver, LookupSender, PlaybackEvent, ProgressReason,
    QueueStatus,
};
use super::repeat::RepeatState;
use super::source::AudioEditionSource;
use crate::domain::{AudioEdition, AudioUrl, PlayableItem};
use crate::output::{AudioOutput, LoadId, OutputEvent, OutputEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    /// The item at the cursor is waiting for its audio URL.
    Loading,
    Playing,
    Paused,
    /// All cycles played; cursor is back to `None`.
    Ended,
}

#[derive(Default)]
struct Session {
    generation: u64,
    items: Vec<PlayableItem>,
    cursor: Option<usize>,
    repeat: RepeatState,
    events: Option<EventSender>,
}

pub struct PlaybackQueue<S, O> {
    source: Arc<S>,
    edition: watch::Receiver<AudioEdition>,
    output: O,
    tx_lookup: LookupSender,
    session: Session,
    state: PlaybackState,
    next_request: u64,
    pending_lookup: Option<u64>,
    load: Option<LoadId>,
}

impl<S: AudioEditionSource, O: AudioOutput> PlaybackQueue<S, O> {
    /// Builds an empty queue plus the receiver its lookups report to; feed
    /// every received [`LookupOutcome`] back into [`on_lookup`](Self::on_lookup).
    pub fn new(
        source: Arc<S>,
        edition: watch::Receiver<AudioEdition>,
        output: O,
    ) -> (Self, LookupReceiver) {
        let (tx_lookup, rx_lookup) = mpsc::unbounded_channel();
        let queue = Self {
            source,
            edition,
            output,
            tx_lookup,
            session: Session::default(),
            state: PlaybackState::Idle,
            next_request: 0,
            pending_lookup: None,
            load: None,
        };
        (queue, rx_lookup)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn cursor(&self) -> Option<usize> {
        self.session.cursor
    }

    pub fn repeat(&self) -> RepeatState {
        self.session.repeat
    }

    pub fn session(&self) -> u64 {
        self.session.generation
    }

    pub fn items(&self) -> &[PlayableItem] {
        &self.session.items
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            session: self.session.generation,
            state: self.state,
            cursor: self.session.cursor,
            len: self.session.items.len(),
            repeat: self.session.repeat,
        }
    }

    /// Replaces the whole session. Playback does not start.
    pub fn set_queue(&mut self, items: Vec<PlayableItem>, repeat: u32, events: EventSender) {
        if self.session.cursor.is_some() {
            self.emit_progress(ProgressReason::Stopped);
        }
        self.output.release();
        self.load = None;
        self.pending_lookup = None;

        let generation = self.session.generation.wrapping_add(1);
        tracing::debug!(generation, items = items.len(), repeat, "queue replaced");
        self.session = Session {
            generation,
            items,
            cursor: None,
            repeat: RepeatState::new(repeat),
            events: Some(events),
        };
        self.state = PlaybackState::Idle;
    }

    pub fn play(&mut self) {
        if self.is_inert() {
            return;
        }
        match self.state {
            PlaybackState::Playing | PlaybackState::Loading => return,
            PlaybackState::Paused => return self.resume(),
            PlaybackState::Idle | PlaybackState::Ended => {}
        }
        if self.session.cursor.is_none() && self.session.repeat.is_exhausted() {
            self.session.repeat.reset();
        }
        self.play_at(self.session.cursor.unwrap_or(0));
    }

    pub fn pause(&mut self) {
        match self.state {
            PlaybackState::Playing => {
                self.output.pause();
                self.state = PlaybackState::Paused;
                self.emit_progress(ProgressReason::Paused);
            }
            PlaybackState::Paused => self.emit_progress(ProgressReason::Paused),
            _ => {}
        }
    }

    pub fn resume(&mut self) {
        if self.state == PlaybackState::Paused {
            self.output.play();
            self.state = PlaybackState::Playing;
            self.emit_progress(ProgressReason::Resumed);
        }
    }

    /// Stops and resets the repeat counters.
    pub fn stop(&mut self) {
        if self.is_inert() {
            return;
        }
        self.stop_keep_cycles();
        self.session.repeat.reset();
    }

    /// Stops without touching the repeat counters.
    pub fn stop_keep_cycles(&mut self) {
        if self.is_inert() {
            return;
        }
        self.output.rewind();
        self.load = None;
        self.pending_lookup = None;
        self.session.cursor = None;
        self.forget_unavailable();
        self.state = PlaybackState::Idle;
        self.emit_progress(ProgressReason::Stopped);
    }

    pub fn next(&mut self) {
        if self.is_inert() {
            return;
        }
        match self.session.cursor {
            None => self.play(),
            Some(i) => self.play_at(i + 1),
        }
    }

    pub fn prev(&mut self) {
        if self.is_inert() {
            return;
        }
        match self.session.cursor {
            None => {}
            Some(0) => {
                if self.finish_or_repeat() {
                    self.play_at(0);
                }
            }
            Some(i) => self.play_at(i - 1),
        }
    }

    pub fn set_repeat_count(&mut self, count: u32) {
        let idle = self.session.cursor.is_none();
        self.session.repeat.set_total(count, idle);
        tracing::debug!(
            total = self.session.repeat.total(),
            remaining = self.session.repeat.remaining(),
            completed = self.session.repeat.completed(),
            "repeat count changed"
        );
    }

    pub fn on_lookup(&mut self, outcome: LookupOutcome) {
        let LookupOutcome {
            generation,
            request,
            index,
            result,
        } = outcome;
        if generation != self.session.generation || self.pending_lookup != Some(request) {
            tracing::debug!(generation, request, index, "dropping stale audio lookup");
            return;
        }
        self.pending_lookup = None;

        let Some(item) = self.session.items.get_mut(index) else {
            return;
        };
        match result {
            Ok(Some(url)) if !url.trim().is_empty() => {
                item.audio = AudioUrl::Resolved(url.clone());
                self.start_output(index, &url);
            }
            Ok(_) => {
                tracing::warn!(
                    chapter = item.chapter,
                    verse = item.verse,
                    "no audio for verse, skipping"
                );
                item.audio = AudioUrl::Unavailable;
                self.play_at(index + 1);
            }
            Err(e) => {
                tracing::warn!(
                    chapter = item.chapter,
                    verse = item.verse,
                    err = %e,
                    "audio lookup failed, skipping"
                );
                item.audio = AudioUrl::Unavailable;
                self.play_at(index + 1);
            }
        }
    }

    pub fn on_output(&mut self, evt: OutputEvent) {
        if self.load != Some(evt.load_id) {
            tracing::debug!(load_id = evt.load_id.0, "dropping stale output event");
            return;
        }
        let Some(index) = self.session.cursor else {
            return;
        };
        match evt.kind {
            OutputEventKind::Started { duration_ms } => {
                tracing::debug!(index, ?duration_ms, "output started");
            }
            OutputEventKind::Failed(err) => {
                tracing::warn!(index, err = %err, "playback failed to start, skipping");
                self.load = None;
                self.play_at(index + 1);
            }
            OutputEventKind::Ended => {
                self.load = None;
                self.play_at(index + 1);
            }
        }
    }

    /// Periodic position report while playing.
    pub fn tick(&mut self) {
        if self.state == PlaybackState::Playing {
            self.emit_progress(ProgressReason::Tick);
        }
    }

    /// Drops the loaded audio; the session itself stays.
    pub fn release(&mut self) {
        self.output.release();
        self.load = None;
    }

    fn is_inert(&self) -> bool {
        self.session.items.is_empty()
    }

    /// `Unavailable` only holds for the pass it was found in.
    fn forget_unavailable(&mut self) {
        for item in &mut self.session.items {
            if item.audio == AudioUrl::Unavailable {
                item.audio = AudioUrl::Unresolved;
            }
        }
    }

    /// Moves the cursor to `index` and starts it, skipping items found
    /// unavailable earlier in this pass and running cycle completion past
    /// the end.
    fn play_at(&mut self, mut index: usize) {
        loop {
            let Some(item) = self.session.items.get(index) else {
                if !self.finish_or_repeat() {
                    return;
                }
                index = 0;
                continue;
            };
            self.session.cursor = Some(index);
            match &item.audio {
                AudioUrl::Resolved(url) => {
                    let url = url.clone();
                    self.start_output(index, &url);
                    return;
                }
                AudioUrl::Unresolved => {
                    self.request_lookup(index);
                    return;
                }
                AudioUrl::Unavailable => index += 1,
            }
        }
    }

    /// Returns `true` when a new cycle should start at index 0.
    fn finish_or_repeat(&mut self) -> bool {
        self.forget_unavailable();
        if self.session.repeat.complete_cycle() {
            tracing::debug!(
                completed = self.session.repeat.completed(),
                remaining = self.session.repeat.remaining(),
                "cycle complete, repeating"
            );
            self.session.cursor = None;
            return true;
        }
        tracing::info!(
            session = self.session.generation,
            cycles = self.session.repeat.completed(),
            "playback finished"
        );
        self.stop_keep_cycles();
        self.state = PlaybackState::Ended;
        self.emit(PlaybackEvent::Ended {
            session: self.session.generation,
        });
        false
    }

    fn request_lookup(&mut self, index: usize) {
        let Some(item) = self.session.items.get(index) else {
            return;
        };
        let (chapter, verse) = (item.chapter, item.verse);

        self.output.rewind();
        self.load = None;
        self.state = PlaybackState::Loading;

        self.next_request = self.next_request.wrapping_add(1);
        let request = self.next_request;
        self.pending_lookup = Some(request);

        let generation = self.session.generation;
        let edition = self.edition.borrow().clone();
        tracing::debug!(index, chapter, verse, %edition, request, "looking up audio url");

        let source = Arc::clone(&self.source);
        let tx = self.tx_lookup.clone();
        tokio::spawn(async move {
            let result = source.lookup_audio(chapter, verse, edition).await;
            let _ = tx.send(LookupOutcome {
                generation,
                request,
                index,
                result,
            });
        });
    }

    fn start_output(&mut self, index: usize, url: &str) {
        self.session.cursor = Some(index);
        self.pending_lookup = None;
        let load_id = self.output.load(url);
        self.load = Some(load_id);
        self.output.play();
        self.state = PlaybackState::Playing;
        tracing::debug!(index, load_id = load_id.0, url, "item started");
        self.emit_progress(ProgressReason::ItemStarted);
    }

    fn emit_progress(&self, reason: ProgressReason) {
        let position = match self.session.cursor {
            Some(_) => self.output.position(),
            None => None,
        };
        self.emit(PlaybackEvent::Progress {
            session: self.session.generation,
            index: self.session.cursor,
            position,
            reason,
        });
    }

    fn emit(&self, evt: PlaybackEvent) {
        if let Some(tx) = self.session.events.as_ref()
            && tx.send(evt).is_err()
        {
            tracing::trace!("playback event receiver gone");
        }
    }
}
