/// Repeat-cycle bookkeeping for one queue.
///
/// `remaining + completed <= total` holds outside of [`complete_cycle`],
/// with one exception: lowering the total mid-playback keeps `remaining` at
/// 1 so the cycle in progress can still finish.
///
/// [`complete_cycle`]: RepeatState::complete_cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatState {
    total: u32,
    remaining: u32,
    completed: u32,
}

impl RepeatState {
    pub fn new(count: u32) -> Self {
        let total = count.max(1);
        Self {
            total,
            remaining: total,
            completed: 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn reset(&mut self) {
        self.remaining = self.total;
        self.completed = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Records the end of a traversal. Returns `true` when another cycle
    /// should start from the first item.
    pub fn complete_cycle(&mut self) -> bool {
        self.completed = (self.completed + 1).min(self.total);
        if self.remaining > 1 {
            self.remaining -= 1;
            true
        } else {
            self.remaining = 0;
            false
        }
    }

    /// Changes the cycle count. An idle queue starts over with the new
    /// count; a playing one keeps its progress.
    pub fn set_total(&mut self, count: u32, idle: bool) {
        self.total = count.max(1);
        if idle {
            self.reset();
        } else {
            self.completed = self.completed.min(self.total);
            self.remaining = (self.total - self.completed).max(1);
        }
    }
}

impl Default for RepeatState {
    fn default() -> Self {
        Self::new(1)
    }
}
