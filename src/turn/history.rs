//! Bounded log of turn summaries

use std::collections::VecDeque;

/// One line per turn, oldest evicted first
#[derive(Debug, Clone)]
pub struct ActionHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl ActionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.into());
    }

    /// The last `n` entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<String> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = ActionHistory::new(3);
        for i in 0..5 {
            history.push(format!("turn {i}"));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.recent(10), vec!["turn 2", "turn 3", "turn 4"]);
    }

    #[test]
    fn test_recent_keeps_order() {
        let mut history = ActionHistory::new(50);
        history.push("a");
        history.push("b");
        history.push("c");
        assert_eq!(history.recent(2), vec!["b", "c"]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut history = ActionHistory::new(0);
        history.push("a");
        assert!(history.is_empty());
    }
}
