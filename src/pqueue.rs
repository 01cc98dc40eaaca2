//! Bounded min-heap priority queue with FIFO tie-breaking.
//!
//! Backs each resource's blocked set. Entries are ordered by
//! `(priority, seq)`, where `seq` is stamped from a per-heap counter at
//! insertion time and never reused, so equal-priority waiters leave in
//! arrival order.

use std::cmp::Ordering;

use crate::types::{Pid, Priority, HEAP_CAPACITY};

/// One waiter in the heap.
///
/// The sequence number travels with its PID on every swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    pid: Pid,
    priority: Priority,
    seq: u64,
}

impl HeapEntry {
    fn key(&self) -> (Priority, u64) {
        (self.priority, self.seq)
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Returned by [`MinPriorityQueue::insert`] when the heap is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapFull;

/// Fixed-capacity binary min-heap of PIDs.
#[derive(Debug, Clone)]
pub struct MinPriorityQueue {
    heap: Vec<HeapEntry>,
    capacity: usize,
    next_seq: u64,
}

impl MinPriorityQueue {
    pub fn new() -> Self {
        Self::with_capacity(HEAP_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        MinPriorityQueue {
            heap: Vec::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Insert `pid` with the given priority.
    ///
    /// Fails without stamping a sequence number when the heap is full.
    pub fn insert(&mut self, pid: Pid, priority: Priority) -> Result<(), HeapFull> {
        if self.is_full() {
            return Err(HeapFull);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(HeapEntry { pid, priority, seq });
        self.sift_up(self.heap.len() - 1);
        Ok(())
    }

    /// Remove and return the minimum `(priority, seq)` entry.
    pub fn pop(&mut self) -> Option<Pid> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let min = self.heap.pop()?;
        self.sift_down(0);
        Some(min.pid)
    }

    /// The PID that `pop` would return next.
    pub fn peek(&self) -> Option<Pid> {
        self.heap.first().map(|e| e.pid)
    }

    /// All waiters in pop order, computed on a private copy.
    pub fn preview(&self) -> Vec<Pid> {
        let mut copy = self.clone();
        std::iter::from_fn(|| copy.pop()).collect()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.heap[parent] <= self.heap[idx] {
                break;
            }
            self.heap.swap(parent, idx);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut smallest = idx;

            if left < len && self.heap[left] < self.heap[smallest] {
                smallest = left;
            }
            if right < len && self.heap[right] < self.heap[smallest] {
                smallest = right;
            }
            if smallest == idx {
                break;
            }
            self.heap.swap(idx, smallest);
            idx = smallest;
        }
    }
}

impl Default for MinPriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}
