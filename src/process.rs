//! Process model: control blocks and the process table.
//!
//! The table is the single owner of mutable process state. Queues and
//! resources refer to processes by [`Pid`] only.

use std::fmt;

use serde::Serialize;

use crate::error::SimError;
use crate::types::{Level, Pid, Priority, Tick, MAX_PROCESSES, WINDOW_WORDS};

/// The state a simulated process can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessState {
    /// Eligible to run (or not yet arrived).
    Ready,
    /// Currently dispatched by the scheduler.
    Running,
    /// Waiting in a resource's blocked set.
    Blocked,
    /// Executed its whole program. Terminal.
    Finished,
}

impl ProcessState {
    /// Label used in the process's memory header.
    pub fn label(self) -> &'static str {
        match self {
            ProcessState::Ready => "Ready",
            ProcessState::Running => "Running",
            ProcessState::Blocked => "Blocked",
            ProcessState::Finished => "Finished",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Process control block.
#[derive(Debug, Clone, Serialize)]
pub struct Pcb {
    pub pid: Pid,
    /// Display name, usually the program file name.
    pub name: String,
    pub state: ProcessState,
    /// Mutex-contention priority; lower is served first.
    pub priority: Priority,
    /// Index of the next instruction to execute.
    pub program_counter: usize,
    /// Owned memory window `[lower, upper)`.
    pub memory_window: (usize, usize),
    /// Program text, one instruction per line.
    pub instructions: Vec<String>,
    /// Tick at which the process becomes eligible to run.
    pub arrival_time: Tick,
    /// MLFQ level; only meaningful under MLFQ.
    pub mlfq_level: Level,
    /// Set on the last instruction of an MLFQ quantum.
    pub demote_pending: bool,
}

impl Pcb {
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the program counter has reached the end of the program.
    pub fn is_exhausted(&self) -> bool {
        self.program_counter >= self.instructions.len()
    }

    /// The instruction at the program counter, if any is left.
    pub fn current_instruction(&self) -> Option<&str> {
        self.instructions
            .get(self.program_counter)
            .map(String::as_str)
    }

    pub fn is_finished(&self) -> bool {
        self.state == ProcessState::Finished
    }
}

/// Everything needed to create a process.
#[derive(Debug, Clone)]
pub struct ProcessDef {
    pub name: String,
    pub priority: Priority,
    pub arrival_time: Tick,
    pub instructions: Vec<String>,
}

impl ProcessDef {
    pub fn new(
        name: impl Into<String>,
        priority: Priority,
        arrival_time: Tick,
        instructions: Vec<String>,
    ) -> Self {
        ProcessDef {
            name: name.into(),
            priority,
            arrival_time,
            instructions,
        }
    }

    /// Build a definition from program text, one instruction per line.
    ///
    /// Trailing whitespace is trimmed and blank lines are skipped.
    pub fn from_program(
        name: impl Into<String>,
        priority: Priority,
        arrival_time: Tick,
        text: &str,
    ) -> Self {
        let instructions = text
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();
        Self::new(name, priority, arrival_time, instructions)
    }
}

/// Fixed-capacity table of process control blocks, indexed by `pid - 1`.
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    pcbs: Vec<Pcb>,
}

impl ProcessTable {
    pub fn new() -> Self {
        ProcessTable {
            pcbs: Vec::with_capacity(MAX_PROCESSES),
        }
    }

    /// Create a READY process from `def` and return its PID.
    ///
    /// The process owns window number `pid - 1` of the variable memory.
    pub fn create(&mut self, def: ProcessDef) -> Result<Pid, SimError> {
        if self.pcbs.len() >= MAX_PROCESSES {
            return Err(SimError::ProcessTableFull);
        }
        if def.instructions.is_empty() {
            return Err(SimError::EmptyProgram);
        }
        let idx = self.pcbs.len();
        let pid = Pid::from_index(idx);
        let lower = idx * WINDOW_WORDS;
        self.pcbs.push(Pcb {
            pid,
            name: def.name,
            state: ProcessState::Ready,
            priority: def.priority,
            program_counter: 0,
            memory_window: (lower, lower + WINDOW_WORDS),
            instructions: def.instructions,
            arrival_time: def.arrival_time,
            mlfq_level: Level::TOP,
            demote_pending: false,
        });
        Ok(pid)
    }

    pub fn get(&self, pid: Pid) -> Option<&Pcb> {
        if pid.0 == 0 {
            return None;
        }
        self.pcbs.get(pid.index())
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Pcb> {
        if pid.0 == 0 {
            return None;
        }
        self.pcbs.get_mut(pid.index())
    }

    /// Look up a process, turning a missing PID into an error.
    pub fn require(&self, pid: Pid) -> Result<&Pcb, SimError> {
        self.get(pid).ok_or(SimError::UnknownProcess(pid))
    }

    pub fn require_mut(&mut self, pid: Pid) -> Result<&mut Pcb, SimError> {
        self.get_mut(pid).ok_or(SimError::UnknownProcess(pid))
    }

    /// Processes in PID order.
    pub fn iter(&self) -> impl Iterator<Item = &Pcb> {
        self.pcbs.iter()
    }

    pub fn len(&self) -> usize {
        self.pcbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pcbs.is_empty()
    }

    pub fn finished_count(&self) -> usize {
        self.pcbs.iter().filter(|p| p.is_finished()).count()
    }

    /// Remove the most recently created process.
    pub(crate) fn pop(&mut self) -> Option<Pcb> {
        self.pcbs.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(n: usize) -> ProcessDef {
        ProcessDef::new("p", 0, 0, vec!["print x".to_string(); n])
    }

    #[test]
    fn test_create_assigns_sequential_pids_and_disjoint_windows() {
        let mut table = ProcessTable::new();
        let a = table.create(def(1)).unwrap();
        let b = table.create(def(2)).unwrap();
        assert_eq!((a, b), (Pid(1), Pid(2)));

        let wa = table.get(a).unwrap().memory_window;
        let wb = table.get(b).unwrap().memory_window;
        assert_eq!(wa, (0, WINDOW_WORDS));
        assert_eq!(wb, (WINDOW_WORDS, 2 * WINDOW_WORDS));
        assert_eq!(table.get(b).unwrap().state, ProcessState::Ready);
    }

    #[test]
    fn test_table_capacity() {
        let mut table = ProcessTable::new();
        for _ in 0..MAX_PROCESSES {
            table.create(def(1)).unwrap();
        }
        assert!(matches!(
            table.create(def(1)),
            Err(SimError::ProcessTableFull)
        ));
        assert_eq!(table.len(), MAX_PROCESSES);
    }

    #[test]
    fn test_empty_program_rejected() {
        let mut table = ProcessTable::new();
        assert!(matches!(table.create(def(0)), Err(SimError::EmptyProgram)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_pid_zero_is_never_found() {
        let mut table = ProcessTable::new();
        table.create(def(1)).unwrap();
        assert!(table.get(Pid(0)).is_none());
        assert!(table.get(Pid(2)).is_none());
    }

    #[test]
    fn test_from_program_skips_blank_lines() {
        let d = ProcessDef::from_program("prog", 1, 3, "assign x 1\r\n\nprint x\n   \n");
        assert_eq!(d.instructions, vec!["assign x 1", "print x"]);
        assert_eq!(d.arrival_time, 3);
    }
}
