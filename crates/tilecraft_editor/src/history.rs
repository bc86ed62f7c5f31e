//! Bounded snapshot undo/redo

use std::collections::VecDeque;

/// Snapshot history where the entry at `index` is always the live state.
///
/// Recording after a mutation drops any redo entries, pushes the new state
/// and evicts the oldest snapshot once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct History<T: Clone> {
    entries: VecDeque<T>,
    index: usize,
    capacity: usize,
}

impl<T: Clone> History<T> {
    /// Start a history seeded with the initial state.
    ///
    /// A capacity below 1 is treated as 1.
    pub fn new(initial: T, capacity: usize) -> Self {
        let mut entries = VecDeque::with_capacity(capacity.max(1));
        entries.push_back(initial);
        Self {
            entries,
            index: 0,
            capacity: capacity.max(1),
        }
    }

    /// Record the state reached by a mutation
    pub fn record(&mut self, state: &T) {
        self.entries.truncate(self.index + 1);
        self.entries.push_back(state.clone());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;
    }

    /// Step back, returning the snapshot to restore
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index)
    }

    /// Step forward, returning the snapshot to restore
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index)
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// The live snapshot
    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget everything and start over from `state`
    pub fn reset(&mut self, state: T) {
        self.entries.clear();
        self.entries.push_back(state);
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_exact() {
        let mut history = History::new(0, 50);
        history.record(&1);
        history.record(&2);

        assert_eq!(history.undo(), Some(&1));
        assert_eq!(history.undo(), Some(&0));
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), Some(&1));
        assert_eq!(history.redo(), Some(&2));
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn test_record_truncates_redo() {
        let mut history = History::new("a", 50);
        history.record(&"b");
        history.record(&"c");
        history.undo();
        history.record(&"d");

        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        assert_eq!(history.undo(), Some(&"b"));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = History::new(0, 50);
        for i in 1..=60 {
            history.record(&i);
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.index(), 49);
        assert_eq!(history.current(), Some(&60));

        let mut undos = 0;
        while history.undo().is_some() {
            undos += 1;
        }
        assert_eq!(undos, 49);
        assert_eq!(history.current(), Some(&11));
    }

    #[test]
    fn test_index_invariant() {
        let mut history = History::new(0u8, 3);
        for i in 1..10 {
            history.record(&i);
            assert!(history.index() < history.len());
            assert!(history.len() <= history.capacity());
        }
        history.reset(42);
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
