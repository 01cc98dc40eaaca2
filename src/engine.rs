//! Simulation driver.
//!
//! [`Simulator`] is the control surface a front end talks to: select a
//! policy, add processes, then either [`step`](Simulator::step) one unit of
//! work at a time or [`run`](Simulator::run) to completion. A run can be
//! interrupted between steps through the stop flag.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::SimError;
use crate::interp::Interpreter;
use crate::policy::{self, PolicyKind, StepOutcome};
use crate::process::{ProcessDef, ProcessState};
use crate::state::{SimState, Snapshot};
use crate::trace::Trace;
use crate::types::{Pid, MAX_PROCESSES};
use crate::workload::Workload;

/// How a call to [`Simulator::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every process finished.
    Completed,
    /// The stop flag was raised.
    Stopped,
    /// Every unfinished process is blocked and nothing else can run.
    Deadlocked,
}

/// The main simulator.
pub struct Simulator<I: Interpreter> {
    interp: I,
    state: SimState,
    stop: Arc<AtomicBool>,
}

impl<I: Interpreter> Simulator<I> {
    pub fn new(interp: I) -> Self {
        Simulator {
            interp,
            state: SimState::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Choose the scheduling policy.
    ///
    /// The policy is fixed once the first step ran; [`reset`](Self::reset)
    /// releases it.
    pub fn select_policy(&mut self, policy: PolicyKind) -> Result<(), SimError> {
        if self.state.session().started() && self.state.policy() != Some(policy) {
            return Err(SimError::PolicyLocked);
        }
        self.state.set_policy(policy);
        info!(%policy, "policy selected");
        Ok(())
    }

    pub fn policy(&self) -> Option<PolicyKind> {
        self.state.policy()
    }

    /// Set the round-robin quantum. Other policies ignore it.
    pub fn set_quantum(&mut self, quantum: NonZeroUsize) {
        self.state.set_quantum(quantum);
        info!(quantum = quantum.get(), "quantum set");
    }

    pub fn add_process(&mut self, def: ProcessDef) -> Result<Pid, SimError> {
        self.state.add_process(def).inspect_err(|e| {
            warn!(error = %e, "cannot create process");
        })
    }

    /// Apply a workload: its policy and quantum, if given, then its
    /// processes in order.
    ///
    /// Program files are read and capacity is checked before anything is
    /// changed.
    pub fn load(&mut self, workload: &Workload) -> Result<Vec<Pid>, SimError> {
        let defs = workload.process_defs()?;
        if self.state.table().len() + defs.len() > MAX_PROCESSES {
            return Err(SimError::ProcessTableFull);
        }
        if let Some(policy) = workload.policy {
            self.select_policy(policy)?;
        }
        if let Some(quantum) = workload.quantum {
            self.set_quantum(quantum);
        }
        defs.into_iter().map(|def| self.add_process(def)).collect()
    }

    /// Perform one unit of work under the selected policy.
    ///
    /// FCFS executes one instruction; Round-Robin and MLFQ execute one
    /// burst.
    pub fn step(&mut self) -> Result<StepOutcome, SimError> {
        let policy = self.state.policy().ok_or(SimError::NoPolicySelected)?;
        self.state.mark_started();
        policy::step(policy, &mut self.state, &mut self.interp)
    }

    /// Step until every process finished, the stop flag is raised, or the
    /// remaining processes are deadlocked.
    ///
    /// The stop flag is checked between steps and cleared when honored.
    pub fn run(&mut self) -> Result<RunOutcome, SimError> {
        let policy = self.state.policy().ok_or(SimError::NoPolicySelected)?;
        info!(%policy, processes = self.state.table().len(), "run started");

        loop {
            if self.stop.swap(false, Ordering::SeqCst) {
                info!("run stopped");
                return Ok(RunOutcome::Stopped);
            }
            if self.state.all_finished() {
                info!(
                    clock = self.state.clock(),
                    idle = self.state.idle_ticks(),
                    "all processes finished"
                );
                return Ok(RunOutcome::Completed);
            }
            if self.state.is_deadlocked() {
                let blocked: Vec<u32> = self
                    .state
                    .table()
                    .iter()
                    .filter(|p| p.state == ProcessState::Blocked)
                    .map(|p| p.pid.0)
                    .collect();
                warn!(?blocked, "deadlock: every unfinished process is blocked");
                return Ok(RunOutcome::Deadlocked);
            }
            self.step()?;
        }
    }

    /// Ask a running [`run`](Self::run) to return before its next step.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// The stop flag, for raising it from another thread or a signal
    /// handler.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Clear processes, memory, queues, resources, clock and trace.
    ///
    /// The policy and quantum are kept but the policy may be changed again.
    pub fn reset(&mut self) {
        self.state.reset();
        self.interp.reset();
        self.stop.store(false, Ordering::SeqCst);
        info!("simulation reset");
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Direct access to the simulation context, e.g. to release a resource
    /// with [`SimState::signal`] from a driver. [`SimState::wait`] only
    /// accepts the process being dispatched, so drivers get `NotRunnable`.
    pub fn state_mut(&mut self) -> &mut SimState {
        &mut self.state
    }

    pub fn trace(&self) -> &Trace {
        self.state.trace()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    pub fn interpreter(&self) -> &I {
        &self.interp
    }

    pub fn interpreter_mut(&mut self) -> &mut I {
        &mut self.interp
    }
}
