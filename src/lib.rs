//! sched_sim - Deterministic, externally steppable CPU scheduling simulator.
//!
//! Simulated processes run small line-oriented programs under one of three
//! policies (FCFS, Round-Robin, MLFQ) and contend for three mutex-like
//! resources whose waiters are woken in priority order.
//!
//! # Architecture
//!
//! - **State**: the single simulation context (process table, memory,
//!   queues, resources, clock)
//! - **Policies**: resumable step functions, one per scheduling policy
//! - **Resources**: `wait`/`signal` with a bounded priority heap per resource
//! - **Interpreter**: executes one program line per dispatch
//! - **Engine**: the driver surface (`step`, `run`, `stop`, `reset`)
//!
//! # Usage
//!
//! ```rust,no_run
//! use sched_sim::*;
//!
//! let mut sim = Simulator::new(ScriptInterpreter::new(StdConsole::new()));
//! sim.select_policy(PolicyKind::RoundRobin).unwrap();
//! sim.add_process(ProcessDef::new(
//!     "worker",
//!     0,
//!     0,
//!     vec!["assign x 5".into(), "print x".into()],
//! ))
//! .unwrap();
//!
//! let outcome = sim.run().unwrap();
//! assert_eq!(outcome, RunOutcome::Completed);
//! sim.trace().dump();
//! ```

pub mod console;
pub mod engine;
pub mod error;
pub mod fmt;
pub mod interp;
pub mod memory;
pub mod policy;
pub mod pqueue;
pub mod process;
pub mod queue;
pub mod resource;
pub mod state;
pub mod trace;
pub mod types;
pub mod workload;

// Re-export the main public types for convenience.
pub use console::{Console, ScriptedConsole, StdConsole};
pub use engine::{RunOutcome, Simulator};
pub use error::SimError;
pub use fmt::{sim_tick, SimFormat};
pub use interp::{from_fn, InterpError, Instruction, Interpreter, ScriptInterpreter};
pub use memory::HeaderWord;
pub use policy::{PolicyKind, StepOutcome};
pub use process::{Pcb, ProcessDef, ProcessState};
pub use resource::ResourceKind;
pub use state::{SimState, Snapshot, WaitOutcome};
pub use trace::{Trace, TraceEvent, TraceKind};
pub use types::{Level, Pid, Priority, Tick};
pub use workload::Workload;
