use std::collections::VecDeque;

/// Fixed-capacity ring buffer of page snapshots, used to detect that the DOM
/// has stopped changing: once the buffer is full and every entry is equal,
/// the page is considered stable.
///
/// Requiring a full buffer of identical polls tolerates one-off rendering
/// jitter while still detecting true convergence.
#[derive(Debug)]
pub struct SnapshotHistory<T> {
    slots: VecDeque<T>,
    capacity: usize,
}

impl<T: PartialEq> SnapshotHistory<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be positive");
        Self {
            slots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a snapshot, evicting the oldest when full.
    pub fn push(&mut self, snapshot: T) {
        if self.slots.len() == self.capacity {
            self.slots.pop_front();
        }
        self.slots.push_back(snapshot);
    }

    /// True once the buffer is full and all entries compare equal.
    pub fn is_stable(&self) -> bool {
        if self.slots.len() < self.capacity {
            return false;
        }
        let mut iter = self.slots.iter();
        let first = match iter.next() {
            Some(first) => first,
            None => return false,
        };
        iter.all(|s| s == first)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_stable_until_full() {
        let mut history = SnapshotHistory::new(3);
        history.push(vec!["q1"]);
        assert!(!history.is_stable());
        history.push(vec!["q1"]);
        assert!(!history.is_stable());
        history.push(vec!["q1"]);
        assert!(history.is_stable());
    }

    #[test]
    fn test_changing_snapshots_are_not_stable() {
        let mut history = SnapshotHistory::new(3);
        history.push(vec!["q1"]);
        history.push(vec!["q1", "q2"]);
        history.push(vec!["q1", "q2"]);
        assert!(!history.is_stable());
    }

    #[test]
    fn test_oldest_snapshot_is_evicted() {
        let mut history = SnapshotHistory::new(3);
        history.push(vec!["q1"]);
        history.push(vec!["q1", "q2"]);
        history.push(vec!["q1", "q2"]);
        history.push(vec!["q1", "q2"]);
        // The differing first snapshot has rolled out of the window.
        assert_eq!(history.len(), 3);
        assert!(history.is_stable());
    }

    #[test]
    fn test_stable_even_with_empty_snapshots() {
        // A page that never renders a question still converges.
        let mut history: SnapshotHistory<Vec<&str>> = SnapshotHistory::new(3);
        for _ in 0..3 {
            history.push(Vec::new());
        }
        assert!(history.is_stable());
    }

    #[test]
    fn test_capacity_one_is_immediately_stable() {
        let mut history = SnapshotHistory::new(1);
        history.push(vec!["q1"]);
        assert!(history.is_stable());
    }
}
