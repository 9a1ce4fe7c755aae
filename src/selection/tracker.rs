//! Latest-wins bookkeeping for overlapping async requests.

use std::collections::HashMap;
use std::hash::Hash;

/// Keeps only the newest request id per key; responses carrying an older
/// id are stale and should be dropped.
#[derive(Debug)]
pub struct RequestTracker<K> {
    pending: HashMap<K, u64>,
    next_id: u64,
}

impl<K: Eq + Hash> Default for RequestTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> RequestTracker<K> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            next_id: 0,
        }
    }

    /// Starts a request for `key`, superseding any pending one.
    pub fn issue(&mut self, key: K) -> u64 {
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.pending.insert(key, self.next_id);
        self.next_id
    }

    /// `true` only for the pending id of `key`, which is then cleared.
    pub fn accept(&mut self, key: &K, req_id: u64) -> bool {
        match self.pending.get(key) {
            Some(&pending_id) if pending_id == req_id => {
                self.pending.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKey {
    /// Resolving the text of a newly selected position.
    Selection,
}
