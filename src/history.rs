//! Snapshot-based undo/redo.

use std::collections::VecDeque;

pub const UNDO_LIMIT: usize = 100;

/// Undo and redo stacks of full snapshots. The oldest undo entry is evicted
/// once `limit` is exceeded.
#[derive(Clone, Debug)]
pub struct History<T: Clone> {
    undo: VecDeque<T>,
    redo: Vec<T>,
    limit: usize,
}

impl<T: Clone> Default for History<T> {
    fn default() -> Self {
        Self::new(UNDO_LIMIT)
    }
}

impl<T: Clone> History<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record `current` before it is mutated. Discards the redo branch.
    pub fn push(&mut self, current: &T) {
        self.push_undo(current.clone());
        self.redo.clear();
    }

    fn push_undo(&mut self, value: T) {
        self.undo.push_back(value);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Restore the latest snapshot into `current`. No-op on an empty stack.
    pub fn undo(&mut self, current: &mut T) -> bool {
        let Some(previous) = self.undo.pop_back() else {
            return false;
        };
        self.redo.push(std::mem::replace(current, previous));
        true
    }

    pub fn redo(&mut self, current: &mut T) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        let replaced = std::mem::replace(current, next);
        self.push_undo(replaced);
        true
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
