use std::collections::HashSet;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{
    AudioOutput, LoadId, OutputEvent, OutputEventKind, OutputEventSender, PlaybackPosition,
};

struct NullTrack {
    load_id: LoadId,
    elapsed: Duration,
    started_at: Option<Instant>,
    announced: bool,
    timer: Option<JoinHandle<()>>,
}

impl NullTrack {
    fn elapsed(&self) -> Duration {
        self.elapsed + self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Silent output that "plays" every item for a fixed duration.
///
/// Used for `--no-audio` runs and as the timer-driven fake in tests; URLs
/// registered with [`fail_url`](Self::fail_url) report a start failure.
pub struct NullOutput {
    tx_evt: OutputEventSender,
    item_duration: Duration,
    next_load: u64,
    current: Option<NullTrack>,
    failing: HashSet<String>,
}

impl NullOutput {
    pub fn new(tx_evt: OutputEventSender, item_duration: Duration) -> Self {
        Self {
            tx_evt,
            item_duration,
            next_load: 0,
            current: None,
            failing: HashSet::new(),
        }
    }

    pub fn fail_url(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    fn send(&self, load_id: LoadId, kind: OutputEventKind) {
        let _ = self.tx_evt.send(OutputEvent { load_id, kind });
    }
}

impl AudioOutput for NullOutput {
    fn load(&mut self, url: &str) -> LoadId {
        self.release();
        self.next_load = self.next_load.wrapping_add(1).max(1);
        let load_id = LoadId(self.next_load);
        if self.failing.contains(url) {
            tracing::debug!(load_id = load_id.0, url, "null output rejecting url");
            self.send(load_id, OutputEventKind::Failed(format!("refused {url}")));
        }
        self.current = Some(NullTrack {
            load_id,
            elapsed: Duration::ZERO,
            started_at: None,
            announced: false,
            timer: None,
        });
        load_id
    }

    fn play(&mut self) {
        let item_duration = self.item_duration;
        let tx_evt = self.tx_evt.clone();
        let Some(track) = self.current.as_mut() else {
            return;
        };
        if track.started_at.is_some() {
            return;
        }
        if !track.announced {
            track.announced = true;
            let _ = tx_evt.send(OutputEvent {
                load_id: track.load_id,
                kind: OutputEventKind::Started {
                    duration_ms: Some(item_duration.as_millis() as u64),
                },
            });
        }
        let left = item_duration.saturating_sub(track.elapsed);
        let load_id = track.load_id;
        track.started_at = Some(Instant::now());
        track.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(left).await;
            let _ = tx_evt.send(OutputEvent {
                load_id,
                kind: OutputEventKind::Ended,
            });
        }));
    }

    fn pause(&mut self) {
        if let Some(track) = self.current.as_mut()
            && let Some(started) = track.started_at.take()
        {
            track.elapsed += started.elapsed();
            track.cancel_timer();
        }
    }

    fn rewind(&mut self) {
        if let Some(track) = self.current.as_mut() {
            track.cancel_timer();
            track.started_at = None;
            track.elapsed = Duration::ZERO;
        }
    }

    fn release(&mut self) {
        if let Some(mut track) = self.current.take() {
            track.cancel_timer();
        }
    }

    fn position(&self) -> Option<PlaybackPosition> {
        let track = self.current.as_ref()?;
        Some(PlaybackPosition {
            position_ms: (track.elapsed().min(self.item_duration)).as_millis() as u64,
            duration_ms: Some(self.item_duration.as_millis() as u64),
        })
    }
}
