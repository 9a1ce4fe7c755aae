use tokio::sync::{mpsc, oneshot};

use super::queue::PlaybackState;
use super::repeat::RepeatState;
use crate::domain::PlayableItem;
use crate::error::ApiError;
use crate::output::PlaybackPosition;

#[derive(Debug)]
pub enum PlaybackCommand {
    SetQueue {
        items: Vec<PlayableItem>,
        repeat: u32,
        events: EventSender,
    },
    Play,
    Pause,
    Resume,
    Stop,
    Next,
    Prev,
    SetRepeatCount(u32),
    Status {
        reply: oneshot::Sender<QueueStatus>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressReason {
    ItemStarted,
    Tick,
    Paused,
    Resumed,
    Stopped,
}

/// Everything a session reports to its consumer.
///
/// `session` is the generation the event belongs to; a consumer that keeps
/// the receiver of an older session never sees events of a newer one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Progress {
        session: u64,
        /// `None` once playback is stopped.
        index: Option<usize>,
        position: Option<PlaybackPosition>,
        reason: ProgressReason,
    },
    Ended {
        session: u64,
    },
}

pub type EventSender = mpsc::UnboundedSender<PlaybackEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<PlaybackEvent>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatus {
    pub session: u64,
    pub state: PlaybackState,
    pub cursor: Option<usize>,
    pub len: usize,
    pub repeat: RepeatState,
}

/// Result of one audio URL lookup, tagged so the queue can tell whether it
/// still wants it.
#[derive(Debug)]
pub struct LookupOutcome {
    pub generation: u64,
    pub request: u64,
    pub index: usize,
    pub result: Result<Option<String>, ApiError>,
}

pub type LookupSender = mpsc::UnboundedSender<LookupOutcome>;
pub type LookupReceiver = mpsc::UnboundedReceiver<LookupOutcome>;
