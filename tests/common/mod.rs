#![allow(dead_code)]

use tracing_subscriber::EnvFilter;

use sched_sim::*;

/// Simulator type used by most tests: the real line interpreter with a
/// scripted console.
pub type TestSim = Simulator<ScriptInterpreter<ScriptedConsole>>;

/// Initialize tracing from `RUST_LOG`.
///
/// `try_init()` is idempotent: first call in the process succeeds,
/// subsequent calls are silently ignored.
pub fn setup_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .event_format(SimFormat)
        .with_test_writer()
        .try_init();
}

/// A simulator with `policy` selected and no console input.
pub fn simulator(policy: PolicyKind) -> TestSim {
    simulator_with_inputs(policy, &[])
}

pub fn simulator_with_inputs(policy: PolicyKind, inputs: &[&str]) -> TestSim {
    let interp = ScriptInterpreter::new(ScriptedConsole::new(inputs.iter().copied()));
    let mut sim = Simulator::new(interp);
    sim.select_policy(policy).unwrap();
    sim
}

/// `n` side-effect-free instructions.
pub fn busy(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("assign v{i} {i}")).collect()
}

pub fn add(sim: &mut TestSim, name: &str, priority: i32, arrival: Tick, lines: &[&str]) -> Pid {
    let lines = lines.iter().map(|l| l.to_string()).collect();
    sim.add_process(ProcessDef::new(name, priority, arrival, lines))
        .unwrap()
}

pub fn add_busy(sim: &mut TestSim, name: &str, arrival: Tick, n: usize) -> Pid {
    sim.add_process(ProcessDef::new(name, 0, arrival, busy(n)))
        .unwrap()
}

/// Step once and check the state invariants afterwards.
pub fn step_checked<I: Interpreter>(sim: &mut Simulator<I>) -> StepOutcome {
    let outcome = sim.step().unwrap();
    if let Err(e) = sim.state().verify() {
        sim.trace().dump();
        panic!("invariant violated after {outcome:?}: {e}");
    }
    outcome
}

/// Like [`Simulator::run`], but verifies the invariants after every step.
pub fn run_checked<I: Interpreter>(sim: &mut Simulator<I>) -> RunOutcome {
    for _ in 0..100_000 {
        if sim.state().all_finished() {
            return RunOutcome::Completed;
        }
        if sim.state().is_deadlocked() {
            return RunOutcome::Deadlocked;
        }
        step_checked(sim);
    }
    panic!("simulation did not settle");
}

/// Every process finished with its program counter at the end, and never
/// had more instructions dispatched than it has.
pub fn assert_all_finished<I: Interpreter>(sim: &Simulator<I>) {
    for pcb in sim.state().table().iter() {
        assert_eq!(pcb.state, ProcessState::Finished, "pid {}", pcb.pid);
        assert_eq!(pcb.program_counter, pcb.instruction_count(), "pid {}", pcb.pid);
        assert!(sim.trace().dispatches_of(pcb.pid) <= pcb.instruction_count());
    }
}

/// PIDs woken by a signal, in order.
pub fn woken(trace: &Trace) -> Vec<Pid> {
    trace
        .events()
        .iter()
        .filter_map(|e| match e.kind {
            TraceKind::Woken { pid, .. } => Some(pid),
            _ => None,
        })
        .collect()
}
