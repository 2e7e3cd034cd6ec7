use crate::snapshot::Snapshot;
use std::collections::VecDeque;

/// Fixed-capacity FIFO of recent snapshots plus the latest published
/// one. The sampling loop is the only writer; readers get clones so
/// no reference ever outlives the lock around this buffer.
#[derive(Debug)]
pub struct HistoryBuffer {
    capacity: usize,
    entries: VecDeque<Snapshot>,
    current: Option<Snapshot>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            current: None,
        }
    }

    pub fn publish(&mut self, snapshot: Snapshot) {
        self.current = Some(snapshot.clone());
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    /// Latest published snapshot, or the empty snapshot before the
    /// first publish.
    pub fn current(&self) -> Snapshot {
        self.current.clone().unwrap_or_default()
    }

    /// Last `limit` entries in chronological order, fewer if history
    /// is shorter.
    pub fn recent(&self, limit: usize) -> Vec<Snapshot> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
