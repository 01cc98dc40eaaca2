//! Bounded FIFO queue of process ids.
//!
//! Backs the generic ready queue and each MLFQ level queue. Entries are
//! PIDs only: the process table stays the single owner of PCB state and
//! every dequeue re-fetches the authoritative record.

use std::collections::VecDeque;

use crate::error::SimError;
use crate::types::{Pid, QUEUE_CAPACITY};

/// A fixed-capacity FIFO of PIDs.
#[derive(Debug, Clone)]
pub struct BoundedQueue {
    name: &'static str,
    entries: VecDeque<Pid>,
    capacity: usize,
}

impl BoundedQueue {
    /// Create an empty queue with the standard capacity.
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, QUEUE_CAPACITY)
    }

    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        BoundedQueue {
            name,
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append a PID at the tail.
    ///
    /// Fails without touching the queue when it is full.
    pub fn enqueue(&mut self, pid: Pid) -> Result<(), SimError> {
        if self.is_full() {
            return Err(SimError::QueueFull { queue: self.name });
        }
        self.entries.push_back(pid);
        Ok(())
    }

    /// Remove and return the head.
    pub fn dequeue(&mut self) -> Option<Pid> {
        self.entries.pop_front()
    }

    /// The head, without removing it.
    pub fn peek(&self) -> Option<Pid> {
        self.entries.front().copied()
    }

    /// Contents from head to tail, without consuming.
    pub fn preview(&self) -> Vec<Pid> {
        self.entries.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }
}
