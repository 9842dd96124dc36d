//! Per-NPC memory ring.
//!
//! Each NPC keeps a bounded, append-only log of [`MemorySnippet`]s. When the
//! ring is full the oldest snippet is evicted, so the log always holds the
//! most recent `capacity` interactions in the order they happened.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::MemorySnippet;

/// Fixed-capacity, oldest-first memory log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRing {
    entries: VecDeque<MemorySnippet>,
    capacity: usize,
    evicted: u64,
}

impl MemoryRing {
    /// Create an empty ring. A capacity of zero is treated as one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Append a snippet, evicting the oldest one if the ring is full.
    ///
    /// Returns the evicted snippet, if any.
    pub fn push(&mut self, snippet: MemorySnippet) -> Option<MemorySnippet> {
        let evicted = if self.entries.len() >= self.capacity {
            self.evicted += 1;
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(snippet);
        evicted
    }

    /// Snippets oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &MemorySnippet> {
        self.entries.iter()
    }

    /// Copy of every snippet, oldest-first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<MemorySnippet> {
        self.entries.iter().copied().collect()
    }

    /// The most recent snippet.
    #[must_use]
    pub fn latest(&self) -> Option<&MemorySnippet> {
        self.entries.back()
    }

    /// Number of snippets held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ring is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of snippets held.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total snippets evicted over the ring's lifetime.
    #[must_use]
    pub const fn evicted(&self) -> u64 {
        self.evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, Address};

    fn snippet(magnitude: u16) -> MemorySnippet {
        MemorySnippet {
            action: Action::Greet,
            positive: true,
            magnitude,
            player: Address::from_low_u64(1),
        }
    }

    #[test]
    fn keeps_insertion_order() {
        let mut ring = MemoryRing::with_capacity(4);
        for m in 1..=3 {
            assert!(ring.push(snippet(m)).is_none());
        }
        let mags: Vec<u16> = ring.iter().map(|s| s.magnitude).collect();
        assert_eq!(mags, vec![1, 2, 3]);
        assert_eq!(ring.latest().map(|s| s.magnitude), Some(3));
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut ring = MemoryRing::with_capacity(2);
        ring.push(snippet(1));
        ring.push(snippet(2));
        let evicted = ring.push(snippet(3));

        assert_eq!(evicted.map(|s| s.magnitude), Some(1));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.evicted(), 1);
        assert_eq!(ring.to_vec(), vec![snippet(2), snippet(3)]);
    }

    #[test]
    fn zero_capacity_still_holds_latest() {
        let mut ring = MemoryRing::with_capacity(0);
        ring.push(snippet(5));
        ring.push(snippet(6));
        assert_eq!(ring.capacity(), 1);
        assert_eq!(ring.to_vec(), vec![snippet(6)]);
    }
}
