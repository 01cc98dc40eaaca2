//! First-come-first-served.
//!
//! The head of the ready queue is peeked, not dequeued, and executes one
//! instruction per step until its program ends; only then does it leave
//! the queue. A head that blocks leaves the queue and rejoins at the tail
//! once a signal wakes it.

use crate::error::SimError;
use crate::interp::Interpreter;
use crate::process::ProcessState;
use crate::state::SimState;

use super::{dispatch_one, idle, Dispatch, StepOutcome};

pub(super) fn step<I: Interpreter + ?Sized>(
    state: &mut SimState,
    interp: &mut I,
) -> Result<StepOutcome, SimError> {
    state.admit_arrivals()?;

    loop {
        let Some(pid) = state.ready_queue().peek() else {
            return Ok(idle(state));
        };

        // Woken after its last instruction blocked: nothing left to run.
        if state.table().require(pid)?.is_exhausted() {
            state.ready_queue_mut().dequeue();
            state.finish(pid)?;
            if state.all_finished() {
                return Ok(StepOutcome::Done);
            }
            continue;
        }

        state.set_state(pid, ProcessState::Running)?;
        match dispatch_one(state, interp, pid)? {
            Dispatch::Blocked => {
                let head = state.ready_queue_mut().dequeue();
                debug_assert_eq!(head, Some(pid));
                return Ok(StepOutcome::Blocked { pid });
            }
            Dispatch::Finished => {
                state.ready_queue_mut().dequeue();
            }
            Dispatch::Continue => state.set_state(pid, ProcessState::Ready)?,
        }
        return Ok(StepOutcome::Ran {
            pid,
            instructions: 1,
        });
    }
}
