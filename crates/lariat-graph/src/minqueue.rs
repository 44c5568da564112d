//! Keyed binary-heap min-priority queue with decrease-key.
//!
//! Backs the search frontier: vertex ids keyed by the weight of the best
//! known path to them. A hash map mirrors each resident key's position in
//! the heap so that re-prioritizing a key is O(log n) instead of a linear
//! scan. Every mutating operation re-establishes both the heap order and
//! the index map before returning.

use std::collections::HashMap;
use std::hash::Hash;

use crate::GraphError;

#[derive(Debug, Clone, Copy)]
struct Entry<K> {
    key: K,
    priority: u32,
}

/// A min-priority queue of distinct keys with extrinsic integer priorities.
///
/// Peeks are O(1); `add_or_update` and `pop` are O(log n).
#[derive(Debug)]
pub struct MinQueue<K> {
    /// Binary min-heap of entries. For every non-root position `i`,
    /// `heap[i].priority >= heap[(i - 1) / 2].priority`.
    heap: Vec<Entry<K>>,
    /// `index[k] == i` iff `heap[i].key == k`. Maps exactly the keys that
    /// are resident in the heap.
    index: HashMap<K, usize>,
}

impl<K: Copy + Eq + Hash> MinQueue<K> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Number of keys currently in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Whether `key` is currently in the queue.
    #[must_use]
    pub fn contains(&self, key: K) -> bool {
        self.index.contains_key(&key)
    }

    /// The key that the next [`pop`](Self::pop) would return.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Empty`] if the queue is empty.
    pub fn peek_key(&self) -> Result<K, GraphError> {
        self.heap.first().map(|e| e.key).ok_or(GraphError::Empty)
    }

    /// The smallest priority associated with any key in the queue.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Empty`] if the queue is empty.
    pub fn peek_priority(&self) -> Result<u32, GraphError> {
        self.heap.first().map(|e| e.priority).ok_or(GraphError::Empty)
    }

    /// Insert `key` with `priority`, or change its priority if it is
    /// already resident. A decreased priority sifts the entry up; an
    /// increased one sifts it down.
    pub fn add_or_update(&mut self, key: K, priority: u32) {
        match self.index.get(&key).copied() {
            None => {
                self.heap.push(Entry { key, priority });
                self.index.insert(key, self.heap.len() - 1);
                self.sift_up(self.heap.len() - 1);
            }
            Some(i) => {
                let old = self.heap[i].priority;
                self.heap[i].priority = priority;
                if priority < old {
                    self.sift_up(i);
                } else {
                    self.sift_down(i);
                }
            }
        }
        debug_assert!(self.invariant_holds());
    }

    /// Remove and return a key with the smallest priority. Ties are broken
    /// deterministically by heap layout.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Empty`] if the queue is empty.
    pub fn pop(&mut self) -> Result<K, GraphError> {
        if self.heap.is_empty() {
            return Err(GraphError::Empty);
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let min = match self.heap.pop() {
            Some(entry) => entry.key,
            None => return Err(GraphError::Empty),
        };
        self.index.remove(&min);
        if !self.heap.is_empty() {
            self.index.insert(self.heap[0].key, 0);
            self.sift_down(0);
        }
        debug_assert!(self.invariant_holds());
        Ok(min)
    }

    /// Drop every key, leaving the queue empty.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.index.clear();
    }

    /// Swap the entries at heap positions `i` and `j`, keeping the index
    /// map consistent.
    fn swap_entries(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.index.insert(self.heap[i].key, i);
        self.index.insert(self.heap[j].key, j);
    }

    /// Move the entry at position `i` toward the root until its parent is
    /// no larger.
    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap[i].priority >= self.heap[parent].priority {
                break;
            }
            self.swap_entries(i, parent);
            i = parent;
        }
    }

    /// Move the entry at position `i` toward the leaves until both children
    /// are no smaller. Prefers the smaller child; on a tie, the left one.
    fn sift_down(&mut self, mut i: usize) {
        loop {
            let mut child = 2 * i + 1;
            if child >= self.heap.len() {
                break;
            }
            let right = child + 1;
            if right < self.heap.len() && self.heap[right].priority < self.heap[child].priority {
                child = right;
            }
            if self.heap[child].priority >= self.heap[i].priority {
                break;
            }
            self.swap_entries(i, child);
            i = child;
        }
    }

    /// Check the heap-order and index-consistency invariants. Debug builds
    /// assert this after every mutation.
    fn invariant_holds(&self) -> bool {
        for i in 1..self.heap.len() {
            let parent = (i - 1) / 2;
            if self.heap[i].priority < self.heap[parent].priority {
                return false;
            }
            if self.index.get(&self.heap[i].key) != Some(&i) {
                return false;
            }
        }
        self.index.len() == self.heap.len()
    }
}

impl<K: Copy + Eq + Hash> Default for MinQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    // --- Empty-queue behavior ---

    #[test]
    fn new_queue_is_empty() {
        let q: MinQueue<u32> = MinQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
        assert!(!q.contains(7));
    }

    #[test]
    fn peek_and_pop_on_empty_fail() {
        let mut q: MinQueue<u32> = MinQueue::new();
        assert_eq!(q.peek_key(), Err(GraphError::Empty));
        assert_eq!(q.peek_priority(), Err(GraphError::Empty));
        assert_eq!(q.pop(), Err(GraphError::Empty));
    }

    // --- Basic ordering ---

    #[test]
    fn pop_returns_smallest_priority_first() {
        let mut q = MinQueue::new();
        q.add_or_update('b', 20);
        q.add_or_update('a', 10);
        q.add_or_update('c', 30);

        assert_eq!(q.peek_key().unwrap(), 'a');
        assert_eq!(q.peek_priority().unwrap(), 10);
        assert_eq!(q.pop().unwrap(), 'a');
        assert_eq!(q.pop().unwrap(), 'b');
        assert_eq!(q.pop().unwrap(), 'c');
        assert!(q.is_empty());
    }

    #[test]
    fn peek_matches_subsequent_pop() {
        let mut q = MinQueue::new();
        for (k, p) in [(1u32, 50u32), (2, 5), (3, 17), (4, 42)] {
            q.add_or_update(k, p);
        }
        while !q.is_empty() {
            let peeked = q.peek_key().unwrap();
            assert_eq!(q.pop().unwrap(), peeked);
        }
    }

    // --- Decrease / increase key ---

    #[test]
    fn decrease_key_moves_entry_to_front() {
        let mut q = MinQueue::new();
        q.add_or_update('a', 10);
        q.add_or_update('b', 20);
        q.add_or_update('c', 30);

        q.add_or_update('c', 1);
        assert_eq!(q.len(), 3, "update must not grow the queue");
        assert_eq!(q.pop().unwrap(), 'c');
    }

    #[test]
    fn increase_key_moves_entry_back() {
        let mut q = MinQueue::new();
        q.add_or_update('a', 10);
        q.add_or_update('b', 20);

        q.add_or_update('a', 99);
        assert_eq!(q.pop().unwrap(), 'b');
        assert_eq!(q.pop().unwrap(), 'a');
    }

    #[test]
    fn update_to_same_priority_is_harmless() {
        let mut q = MinQueue::new();
        q.add_or_update('a', 10);
        q.add_or_update('a', 10);
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop().unwrap(), 'a');
    }

    // --- clear / contains ---

    #[test]
    fn clear_empties_the_queue() {
        let mut q = MinQueue::new();
        q.add_or_update(1u32, 1);
        q.add_or_update(2, 2);
        q.clear();
        assert!(q.is_empty());
        assert!(!q.contains(1));
        assert_eq!(q.pop(), Err(GraphError::Empty));
    }

    #[test]
    fn contains_tracks_residency() {
        let mut q = MinQueue::new();
        q.add_or_update(5u32, 3);
        assert!(q.contains(5));
        q.pop().unwrap();
        assert!(!q.contains(5));
    }

    // --- Randomized invariants ---

    /// Exercises a long mixed sequence of inserts, priority changes, and
    /// pops, checking that pops come out in non-decreasing priority order.
    /// The internal invariants are re-checked after every mutation by the
    /// debug assertions inside the queue itself.
    #[test]
    fn random_operations_pop_in_priority_order() {
        let mut rng = StdRng::seed_from_u64(0x1a71a7);
        let mut q: MinQueue<u16> = MinQueue::new();
        let mut best: std::collections::HashMap<u16, u32> = std::collections::HashMap::new();

        for _ in 0..2_000 {
            if rng.gen_bool(0.7) || q.is_empty() {
                let key = rng.gen_range(0..200);
                let priority = rng.gen_range(0..10_000);
                q.add_or_update(key, priority);
                best.insert(key, priority);
            } else {
                let expected_min = best.values().copied().min().unwrap();
                assert_eq!(q.peek_priority().unwrap(), expected_min);
                let popped = q.pop().unwrap();
                assert_eq!(best.remove(&popped), Some(expected_min));
            }
        }

        // Drain the rest: priorities must be non-decreasing.
        let mut last = 0u32;
        while !q.is_empty() {
            let p = q.peek_priority().unwrap();
            assert!(p >= last, "pop priorities went backwards: {p} < {last}");
            last = p;
            let popped = q.pop().unwrap();
            assert!(best.remove(&popped).is_some());
        }
        assert!(best.is_empty(), "queue drained but {} keys unaccounted", best.len());
    }
}
