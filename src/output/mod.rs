//! The single underlying audio resource the playback queue drives.
//!
//! Outputs report start/failure/end asynchronously as [`OutputEvent`]s tagged
//! with the [`LoadId`] returned by [`AudioOutput::load`]; events for an older
//! load are ignored by the queue.

mod download;
mod null;
mod speaker;

pub use null::NullOutput;
pub use speaker::{DownloadConfig, RodioOutput};

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadId(pub u64);

/// Raw position data; consumers derive any percentage themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackPosition {
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEventKind {
    Started { duration_ms: Option<u64> },
    Failed(String),
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEvent {
    pub load_id: LoadId,
    pub kind: OutputEventKind,
}

pub type OutputEventSender = mpsc::UnboundedSender<OutputEvent>;
pub type OutputEventReceiver = mpsc::UnboundedReceiver<OutputEvent>;

pub trait AudioOutput {
    /// Replaces whatever is loaded with `url`. Nothing is audible until
    /// [`play`](Self::play).
    fn load(&mut self, url: &str) -> LoadId;

    fn play(&mut self);

    /// Holds the current position.
    fn pause(&mut self);

    /// Halts and moves back to the start of the loaded item.
    fn rewind(&mut self);

    /// Drops the loaded item entirely.
    fn release(&mut self);

    fn position(&self) -> Option<PlaybackPosition>;
}
