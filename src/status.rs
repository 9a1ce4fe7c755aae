//! Status-line text derived from playback events.
//!
//! The queue only forwards raw positions; the percentage is computed here.

use crate::domain::StoryPosition;
use crate::output::PlaybackPosition;
use crate::playback::PlaybackEvent;

pub const PREPARING: &str = "جارٍ التحضير…";
pub const FINISHED: &str = "انتهى التشغيل";

pub fn ready(verses: usize) -> String {
    format!("المقطع جاهز: {verses} آية")
}

pub fn position_info(p: &StoryPosition) -> String {
    format!(
        "الموضع {} — سورة {} ({}) — الآيات {}–{}",
        p.index,
        p.chapter_name,
        p.passage.chapter(),
        p.passage.from(),
        p.passage.to()
    )
}

/// Rounded percentage of the current item; 0 while the duration is unknown.
pub fn progress_percent(position: Option<PlaybackPosition>) -> u32 {
    match position {
        Some(PlaybackPosition {
            position_ms,
            duration_ms: Some(duration),
        }) if duration > 0 => {
            let pct = (position_ms.min(duration) as f64 / duration as f64 * 100.0).round();
            pct as u32
        }
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub line: String,
    /// Verse number to highlight when the current item changed.
    pub highlight: Option<u32>,
    /// The highlight should be cleared.
    pub clear: bool,
}

/// Follows one session's events and turns them into status updates.
#[derive(Debug)]
pub struct StatusTracker {
    verses: Vec<u32>,
    last_index: Option<usize>,
}

impl StatusTracker {
    pub fn new(verses: Vec<u32>) -> Self {
        Self {
            verses,
            last_index: None,
        }
    }

    pub fn apply(&mut self, evt: &PlaybackEvent) -> StatusUpdate {
        match evt {
            PlaybackEvent::Progress {
                index: Some(i),
                position,
                ..
            } if *i < self.verses.len() => {
                let highlight = if self.last_index != Some(*i) {
                    self.last_index = Some(*i);
                    Some(self.verses[*i])
                } else {
                    None
                };
                StatusUpdate {
                    line: format!(
                        "تشغيل: آية {}/{} — تقدم {}%",
                        i + 1,
                        self.verses.len(),
                        progress_percent(*position)
                    ),
                    highlight,
                    clear: false,
                }
            }
            PlaybackEvent::Progress { .. } => {
                self.last_index = None;
                StatusUpdate {
                    line: String::new(),
                    highlight: None,
                    clear: true,
                }
            }
            PlaybackEvent::Ended { .. } => {
                self.last_index = None;
                StatusUpdate {
                    line: FINISHED.to_owned(),
                    highlight: None,
                    clear: true,
                }
            }
        }
    }
}
