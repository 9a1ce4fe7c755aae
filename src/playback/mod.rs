//! Playback sequencing: the queue state machine, the actor that drives it
//! and the seam to the audio-URL source.

mod engine;
mod messages;
mod queue;
mod repeat;
mod source;

pub use engine::{DEFAULT_TICK, PlaybackEngine, PlaybackHandle, spawn_playback_engine};
pub use messages::{
    EventReceiver, EventSender, LookupOutcome, LookupReceiver, PlaybackCommand, PlaybackEvent,
    ProgressReason, QueueStatus,
};
pub use queue::{PlaybackQueue, PlaybackState};
pub use repeat::RepeatState;
pub use source::AudioEditionSource;
