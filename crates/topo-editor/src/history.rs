//! Undo/redo history.
//!
//! A bounded ring of full-document snapshots plus a cursor. The entry under
//! the cursor is always the live document; undo and redo only move the
//! cursor and hand back the snapshot to restore. There is no diffing.

use std::collections::VecDeque;

#[derive(Debug)]
pub struct History {
    snapshots: VecDeque<Vec<u8>>,
    cursor: usize,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            cursor: 0,
            capacity,
        }
    }

    /// Drop everything and start over from `initial`.
    pub fn reset(&mut self, initial: Vec<u8>) {
        self.snapshots.clear();
        self.snapshots.push_back(initial);
        self.cursor = 0;
    }

    /// Record a new live state. Redo entries past the cursor are dropped;
    /// the oldest snapshot is evicted once capacity is reached.
    pub fn push(&mut self, snapshot: Vec<u8>) {
        if self.snapshots.get(self.cursor) == Some(&snapshot) {
            return;
        }
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.cursor = self.snapshots.len() - 1;
        log::debug!("history push: {}/{}", self.cursor + 1, self.snapshots.len());
    }

    pub fn undo(&mut self) -> Option<&[u8]> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        log::debug!("undo → {}", self.cursor);
        self.snapshots.get(self.cursor).map(Vec::as_slice)
    }

    pub fn redo(&mut self) -> Option<&[u8]> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        log::debug!("redo → {}", self.cursor);
        self.snapshots.get(self.cursor).map(Vec::as_slice)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn undo_redo_walks_the_cursor() {
        let mut h = History::new(10);
        h.reset(vec![0]);
        h.push(vec![1]);
        h.push(vec![2]);
        assert_eq!(h.undo(), Some(&[1u8][..]));
        assert_eq!(h.undo(), Some(&[0u8][..]));
        assert_eq!(h.undo(), None);
        assert_eq!(h.redo(), Some(&[1u8][..]));
        assert_eq!(h.redo(), Some(&[2u8][..]));
        assert_eq!(h.redo(), None);
    }

    #[test]
    fn new_edit_drops_redo_branch() {
        let mut h = History::new(10);
        h.reset(vec![0]);
        h.push(vec![1]);
        h.undo();
        h.push(vec![9]);
        assert!(!h.can_redo());
        assert_eq!(h.len(), 2);
        assert_eq!(h.undo(), Some(&[0u8][..]));
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut h = History::new(3);
        h.reset(vec![0]);
        for i in 1..=5u8 {
            h.push(vec![i]);
            assert!(h.len() <= 3);
        }
        assert_eq!(h.undo(), Some(&[4u8][..]));
        assert_eq!(h.undo(), Some(&[3u8][..]));
        assert_eq!(h.undo(), None);
    }

    #[test]
    fn identical_snapshot_is_not_pushed() {
        let mut h = History::new(3);
        h.reset(vec![7]);
        h.push(vec![7]);
        assert_eq!(h.len(), 1);
    }
}
