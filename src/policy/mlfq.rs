//! Multilevel feedback queue.
//!
//! Four levels with quanta 1, 2, 4 and 8; level 4 is the generic ready
//! queue. The highest non-empty level is served first and new arrivals
//! enter level 1. A process that uses up its whole quantum drops one level.
//!
//! The demotion is marked on the process before the last instruction of
//! the quantum is dispatched, so a process that blocks on that instruction
//! still carries it and is demoted when a signal wakes it.

use tracing::debug;

use crate::error::SimError;
use crate::interp::Interpreter;
use crate::process::ProcessState;
use crate::state::SimState;
use crate::trace::TraceKind;
use crate::types::Level;

use super::{dispatch_one, idle, Dispatch, StepOutcome};

pub(super) fn step<I: Interpreter + ?Sized>(
    state: &mut SimState,
    interp: &mut I,
) -> Result<StepOutcome, SimError> {
    state.admit_arrivals()?;

    let selected = Level::ALL.into_iter().find_map(|level| {
        state
            .level_queue_mut(level)
            .dequeue()
            .map(|pid| (pid, level))
    });
    let Some((pid, level)) = selected else {
        return Ok(idle(state));
    };
    state.set_state(pid, ProcessState::Running)?;
    debug!(pid = pid.0, %level, "selected");

    let quantum = level.quantum();
    let mut used = 0;
    while used < quantum && !state.table().require(pid)?.is_exhausted() {
        state.admit_arrivals()?;
        if used == quantum - 1 {
            state.set_demote_pending(pid)?;
        }
        match dispatch_one(state, interp, pid)? {
            Dispatch::Blocked => return Ok(StepOutcome::Blocked { pid }),
            Dispatch::Finished => {
                return Ok(StepOutcome::Ran {
                    pid,
                    instructions: used + 1,
                })
            }
            Dispatch::Continue => used += 1,
        }
    }

    if state.table().require(pid)?.is_exhausted() {
        state.finish(pid)?;
    } else {
        state.record(TraceKind::Preempted { pid });
        state.readmit(pid)?;
    }
    Ok(StepOutcome::Ran {
        pid,
        instructions: used,
    })
}
