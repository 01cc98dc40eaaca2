//! Error type for core simulator operations.
//!
//! Every core error is recoverable and local: the failing operation leaves
//! the simulation untouched and the driver may keep stepping.

use std::fmt;
use std::path::PathBuf;

use crate::resource::ResourceKind;
use crate::types::Pid;

/// Errors reported by the scheduler core and the driver surface.
#[derive(Debug)]
pub enum SimError {
    /// A ready or MLFQ level queue is at capacity.
    QueueFull { queue: &'static str },
    /// A resource's blocked set is at capacity.
    BlockedSetFull(ResourceKind),
    /// The process table already holds the maximum number of processes.
    ProcessTableFull,
    /// No free memory window is left for a new process.
    MemoryExhausted,
    /// The process's memory window has no free variable slot.
    WindowFull(Pid),
    /// `signal` on a resource that nobody holds.
    SignalIdleResource(ResourceKind),
    /// The referenced process does not exist.
    UnknownProcess(Pid),
    /// Only the RUNNING process may wait on a resource.
    NotRunnable(Pid),
    /// A resource name that is not `userInput`, `userOutput` or `file`.
    UnknownResource(String),
    /// `step`/`run` before any policy was selected.
    NoPolicySelected,
    /// The policy cannot change once scheduling has started.
    PolicyLocked,
    /// A process was created with no instructions.
    EmptyProgram,
    /// Reading or parsing a workload failed.
    Workload { path: Option<PathBuf>, msg: String },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::QueueFull { queue } => write!(f, "{queue} queue is full"),
            SimError::BlockedSetFull(r) => write!(f, "blocked set of {r} is full"),
            SimError::ProcessTableFull => write!(f, "maximum number of processes reached"),
            SimError::MemoryExhausted => write!(f, "no free memory window for a new process"),
            SimError::WindowFull(pid) => write!(f, "memory window of process {pid} is full"),
            SimError::SignalIdleResource(r) => write!(f, "signaling an unused resource: {r}"),
            SimError::UnknownProcess(pid) => write!(f, "no process with pid {pid}"),
            SimError::NotRunnable(pid) => write!(f, "process {pid} is not runnable"),
            SimError::UnknownResource(name) => write!(f, "unknown resource {name:?}"),
            SimError::NoPolicySelected => write!(f, "no scheduling policy selected"),
            SimError::PolicyLocked => {
                write!(f, "policy cannot change after scheduling started; reset first")
            }
            SimError::EmptyProgram => write!(f, "program has no instructions"),
            SimError::Workload {
                path: Some(path),
                msg,
            } => write!(f, "workload {}: {msg}", path.display()),
            SimError::Workload { path: None, msg } => write!(f, "workload: {msg}"),
        }
    }
}

impl std::error::Error for SimError {}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::Workload {
            path: None,
            msg: format!("JSON parse error: {e}"),
        }
    }
}
