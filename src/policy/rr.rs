//! Round-robin.
//!
//! One step runs one burst: the head of the ready queue executes up to
//! `quantum` instructions, then goes back to the tail unless it finished or
//! blocked.

use tracing::debug;

use crate::error::SimError;
use crate::interp::Interpreter;
use crate::process::ProcessState;
use crate::state::SimState;
use crate::trace::TraceKind;

use super::{dispatch_one, idle, Dispatch, StepOutcome};

pub(super) fn step<I: Interpreter + ?Sized>(
    state: &mut SimState,
    interp: &mut I,
) -> Result<StepOutcome, SimError> {
    state.admit_arrivals()?;

    let Some(pid) = state.ready_queue_mut().dequeue() else {
        return Ok(idle(state));
    };
    state.set_state(pid, ProcessState::Running)?;

    let quantum = state.quantum().get();
    let mut used = 0;
    while used < quantum && !state.table().require(pid)?.is_exhausted() {
        state.admit_arrivals()?;
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
        debug!(pid = pid.0, used, "quantum expired");
        state.readmit(pid)?;
    }
    Ok(StepOutcome::Ran {
        pid,
        instructions: used,
    })
}
