//! Scheduling policies.
//!
//! Each policy is a resumable step function over [`SimState`]: all progress
//! between calls lives in the state, so a step picks up exactly where the
//! previous one stopped.
//!
//! | Policy | Unit of work per step | Preemption |
//! |--------|-----------------------|------------|
//! | FCFS   | one instruction       | never      |
//! | RR     | one quantum burst     | quantum end |
//! | MLFQ   | one level-quantum burst | quantum end, with demotion |

mod fcfs;
mod mlfq;
mod rr;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimError;
use crate::interp::Interpreter;
use crate::process::ProcessState;
use crate::state::SimState;
use crate::types::Pid;

/// The available scheduling policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    /// First-come-first-served.
    #[serde(rename = "fcfs")]
    Fcfs,
    /// Round-robin with a configurable quantum.
    #[serde(rename = "rr")]
    RoundRobin,
    /// Four-level multilevel feedback queue.
    #[serde(rename = "mlfq")]
    Mlfq,
}

impl PolicyKind {
    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::Fcfs => "fcfs",
            PolicyKind::RoundRobin => "rr",
            PolicyKind::Mlfq => "mlfq",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fcfs" => Ok(PolicyKind::Fcfs),
            "rr" | "round-robin" | "roundrobin" => Ok(PolicyKind::RoundRobin),
            "mlfq" => Ok(PolicyKind::Mlfq),
            other => Err(format!("unknown policy {other:?} (expected fcfs, rr or mlfq)")),
        }
    }
}

/// What one call to [`step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// `pid` executed `instructions` instructions and did not block.
    Ran { pid: Pid, instructions: usize },
    /// `pid` blocked on a resource during its turn.
    Blocked { pid: Pid },
    /// Nothing was ready; the clock advanced one idle tick.
    Idle,
    /// Every process has finished. No work was done.
    Done,
}

/// Result of handing one instruction to the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// The process is still runnable and has instructions left.
    Continue,
    /// The process moved into a resource's blocked set.
    Blocked,
    /// That was the last instruction; the process is now FINISHED.
    Finished,
}

/// Perform one unit of work for `policy`.
pub(crate) fn step<I: Interpreter + ?Sized>(
    policy: PolicyKind,
    state: &mut SimState,
    interp: &mut I,
) -> Result<StepOutcome, SimError> {
    if state.all_finished() {
        return Ok(StepOutcome::Done);
    }
    match policy {
        PolicyKind::Fcfs => fcfs::step(state, interp),
        PolicyKind::RoundRobin => rr::step(state, interp),
        PolicyKind::Mlfq => mlfq::step(state, interp),
    }
}

/// Dispatch the instruction at `pid`'s program counter.
///
/// Consumes exactly one tick. The program counter advances even when the
/// instruction blocked the process.
pub(crate) fn dispatch_one<I: Interpreter + ?Sized>(
    state: &mut SimState,
    interp: &mut I,
    pid: Pid,
) -> Result<Dispatch, SimError> {
    let pcb = state.table().require(pid)?;
    let pc = pcb.program_counter;
    let Some(line) = pcb.current_instruction().map(str::to_string) else {
        state.finish(pid)?;
        return Ok(Dispatch::Finished);
    };

    state.record_dispatch(pid, pc);
    debug!(pid = pid.0, pc, line = line.as_str(), "dispatch");
    interp.dispatch(state, pid, &line);
    state.advance_pc(pid)?;
    state.tick();

    let pcb = state.table().require(pid)?;
    if pcb.state == ProcessState::Blocked {
        return Ok(Dispatch::Blocked);
    }
    if pcb.is_exhausted() {
        state.finish(pid)?;
        return Ok(Dispatch::Finished);
    }
    Ok(Dispatch::Continue)
}

/// Advance the clock over a tick with nothing to run.
pub(crate) fn idle(state: &mut SimState) -> StepOutcome {
    state.idle_tick();
    StepOutcome::Idle
}
