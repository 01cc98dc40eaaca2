//! Newtype wrappers, type aliases and fixed capacities.
//!
//! Newtypes for identifiers (PIDs, MLFQ levels) prevent silent type
//! confusion. Plain quantities (ticks, priorities) are type aliases.

use std::fmt;

use serde::Serialize;

/// Maximum number of entries in a ready queue or MLFQ level queue.
pub const QUEUE_CAPACITY: usize = 60;

/// Maximum number of waiters in one resource's blocked set.
pub const HEAP_CAPACITY: usize = 60;

/// Maximum number of processes in the process table.
pub const MAX_PROCESSES: usize = 60;

/// Number of variable-memory words owned by each process.
pub const WINDOW_WORDS: usize = 20;

/// Size of the shared variable memory: one window per table slot.
pub const MEMORY_WORDS: usize = MAX_PROCESSES * WINDOW_WORDS;

/// Logical clock value. One tick is consumed by one dispatched instruction.
pub type Tick = u64;

/// Mutex-contention priority. Lower values are served first.
pub type Priority = i32;

/// Process identifier, 1-based and stable for the life of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Pid(pub u32);

impl Pid {
    /// Index of this process in the process table.
    pub fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }

    pub(crate) fn from_index(idx: usize) -> Self {
        Pid(idx as u32 + 1)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Multilevel-feedback-queue level.
///
/// Levels 1..=3 have dedicated queues; level 4 shares the generic ready
/// queue with FCFS and Round-Robin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Level(u8);

impl Level {
    pub const TOP: Level = Level(1);
    pub const BOTTOM: Level = Level(4);

    /// All levels, highest priority first.
    pub const ALL: [Level; 4] = [Level(1), Level(2), Level(3), Level(4)];

    /// Build a level from its number, if it is in 1..=4.
    pub fn new(n: u8) -> Option<Level> {
        (1..=4).contains(&n).then_some(Level(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Instructions granted per burst at this level: 1, 2, 4, 8.
    pub fn quantum(self) -> usize {
        1 << (self.0 - 1)
    }

    /// The next lower level, capped at the bottom level.
    pub fn demoted(self) -> Level {
        Level((self.0 + 1).min(Self::BOTTOM.0))
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::TOP
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}
