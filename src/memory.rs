//! Shared variable memory partitioned into per-process windows.
//!
//! Each window starts with three header words (`State`, `PC`, `Priority`)
//! mirrored from the PCB; the remaining words are variable slots. The two
//! regions are separate namespaces: a program may own a variable called
//! `PC` without touching the header. Variable lookup is a linear scan of
//! the slots; the first allocated word with a matching name wins.

use std::fmt;

use serde::Serialize;

use crate::error::SimError;
use crate::process::Pcb;
use crate::types::MEMORY_WORDS;

const HEADER_WORDS: usize = 3;

/// The PCB fields mirrored at the start of every window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderWord {
    State,
    Pc,
    Priority,
}

impl HeaderWord {
    fn offset(self) -> usize {
        match self {
            HeaderWord::State => 0,
            HeaderWord::Pc => 1,
            HeaderWord::Priority => 2,
        }
    }

    fn name(self) -> &'static str {
        match self {
            HeaderWord::State => "State",
            HeaderWord::Pc => "PC",
            HeaderWord::Priority => "Priority",
        }
    }
}

/// One name/value slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoryWord {
    pub name: String,
    pub value: String,
    pub allocated: bool,
}

impl MemoryWord {
    fn set(&mut self, name: &str, value: &str) {
        self.name = name.to_string();
        self.value = value.to_string();
        self.allocated = true;
    }
}

/// Returned when a window has no free slot left for a new variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFull;

impl fmt::Display for WindowFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no free variable slot in the process memory window")
    }
}

impl std::error::Error for WindowFull {}

/// The flat memory region.
#[derive(Debug, Clone)]
pub struct Memory {
    words: Vec<MemoryWord>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            words: vec![MemoryWord::default(); MEMORY_WORDS],
        }
    }

    /// Claim `pcb`'s window: write the header and free every variable slot.
    pub fn allocate(&mut self, pcb: &Pcb) -> Result<(), SimError> {
        let (lower, upper) = pcb.memory_window;
        if upper > self.words.len() || upper - lower < HEADER_WORDS {
            return Err(SimError::MemoryExhausted);
        }
        for word in &mut self.words[lower..upper] {
            *word = MemoryWord::default();
        }
        self.sync_header(pcb);
        Ok(())
    }

    /// Mirror the PCB's state, program counter and priority into its header.
    pub fn sync_header(&mut self, pcb: &Pcb) {
        let (lower, _) = pcb.memory_window;
        let pc = pcb.program_counter.to_string();
        let priority = pcb.priority.to_string();
        for (word, value) in [
            (HeaderWord::State, pcb.state.label()),
            (HeaderWord::Pc, pc.as_str()),
            (HeaderWord::Priority, priority.as_str()),
        ] {
            self.words[lower + word.offset()].set(word.name(), value);
        }
    }

    /// Read a header word of a window.
    pub fn header(&self, window: (usize, usize), word: HeaderWord) -> Option<&str> {
        self.window(window)
            .get(word.offset())
            .filter(|w| w.allocated)
            .map(|w| w.value.as_str())
    }

    /// Read a variable from a window.
    pub fn get(&self, window: (usize, usize), name: &str) -> Option<&str> {
        self.window(window)
            .iter()
            .skip(HEADER_WORDS)
            .find(|w| w.allocated && w.name == name)
            .map(|w| w.value.as_str())
    }

    /// Write a variable into a window.
    ///
    /// Updates the first allocated word with the same name, otherwise
    /// claims the first free slot.
    pub fn set(
        &mut self,
        window: (usize, usize),
        name: &str,
        value: &str,
    ) -> Result<(), WindowFull> {
        let (lower, upper) = window;
        let slots = &mut self.words[lower + HEADER_WORDS..upper];
        if let Some(word) = slots.iter_mut().find(|w| w.allocated && w.name == name) {
            word.value = value.to_string();
            return Ok(());
        }
        let free = slots.iter_mut().find(|w| !w.allocated).ok_or(WindowFull)?;
        free.set(name, value);
        Ok(())
    }

    /// The allocated variables of a window as `(name, value)`, header
    /// words excluded.
    pub fn variables(&self, window: (usize, usize)) -> Vec<(&str, &str)> {
        self.window(window)
            .iter()
            .skip(HEADER_WORDS)
            .filter(|w| w.allocated)
            .map(|w| (w.name.as_str(), w.value.as_str()))
            .collect()
    }

    /// The words of one window.
    pub fn window(&self, window: (usize, usize)) -> &[MemoryWord] {
        let (lower, upper) = window;
        &self.words[lower..upper.min(self.words.len())]
    }

    pub fn allocated_words(&self) -> usize {
        self.words.iter().filter(|w| w.allocated).count()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
