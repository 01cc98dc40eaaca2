//! schedsim - Run CPU scheduling simulations from JSON workloads.

use std::io::{self, BufRead};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use sched_sim::{
    Interpreter, Level, Pid, PolicyKind, RunOutcome, ScriptInterpreter, SimFormat, Simulator,
    StdConsole, StepOutcome, Workload,
};

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    /// First-come-first-served.
    Fcfs,
    /// Round-robin.
    Rr,
    /// Multilevel feedback queue.
    Mlfq,
}

impl From<Policy> for PolicyKind {
    fn from(p: Policy) -> Self {
        match p {
            Policy::Fcfs => PolicyKind::Fcfs,
            Policy::Rr => PolicyKind::RoundRobin,
            Policy::Mlfq => PolicyKind::Mlfq,
        }
    }
}

/// Run CPU scheduling simulations from JSON workloads.
#[derive(Parser)]
#[command(name = "schedsim", version)]
struct Cli {
    /// Path to a JSON workload file.
    workload: PathBuf,

    /// Scheduling policy. Overrides the workload's policy.
    #[arg(short, long, value_enum)]
    policy: Option<Policy>,

    /// Round-robin quantum in instructions. Overrides the workload's quantum.
    #[arg(short, long, env = "SCHEDSIM_QUANTUM")]
    quantum: Option<NonZeroUsize>,

    /// Directory that file names used by programs resolve against.
    ///
    /// Defaults to the directory containing the workload file.
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Single-step mode: advance one step per Enter key press.
    #[arg(long)]
    step: bool,

    /// Print trace events to stderr.
    #[arg(long)]
    dump_trace: bool,

    /// Print the final state as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Enable verbose output. Specify twice for trace-level logs.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let workload = Workload::from_path(&cli.workload)
        .with_context(|| format!("failed to load {}", cli.workload.display()))?;

    let root = cli
        .root
        .clone()
        .or_else(|| workload.base_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let console = StdConsole::with_inputs(workload.inputs.iter().cloned());
    let mut sim = Simulator::new(ScriptInterpreter::with_root(console, root));

    sim.load(&workload).context("failed to create processes")?;
    if let Some(policy) = cli.policy {
        sim.select_policy(policy.into())?;
    }
    if let Some(quantum) = cli.quantum {
        sim.set_quantum(quantum);
    }
    if sim.policy().is_none() {
        bail!("no scheduling policy: pass --policy or set \"policy\" in the workload");
    }

    let stop = sim.stop_handle();
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })
    .context("Error setting Ctrl-C handler")?;

    let outcome = if cli.step {
        step_interactively(&mut sim)?
    } else {
        sim.run()?
    };

    if cli.dump_trace {
        sim.trace().dump();
    }
    report(&sim);
    let failures = sim.interpreter().failures();
    if !failures.is_empty() {
        eprintln!("{} instruction(s) failed; rerun with -v for details", failures.len());
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&sim.snapshot())?);
    }

    match outcome {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Stopped => {
            eprintln!("stopped at tick {}", sim.state().clock());
            Ok(())
        }
        RunOutcome::Deadlocked => bail!(
            "deadlock at tick {}: every unfinished process is blocked",
            sim.state().clock()
        ),
    }
}

fn step_interactively<I: Interpreter>(sim: &mut Simulator<I>) -> Result<RunOutcome> {
    let stop = sim.stop_handle();
    let mut line = String::new();
    loop {
        if stop.swap(false, Ordering::SeqCst) {
            return Ok(RunOutcome::Stopped);
        }
        let state = sim.state();
        if state.all_finished() {
            return Ok(RunOutcome::Completed);
        }
        if state.is_deadlocked() {
            return Ok(RunOutcome::Deadlocked);
        }

        eprint!("[tick {}] Enter to step, q to quit: ", state.clock());
        line.clear();
        if io::stdin().lock().read_line(&mut line)? == 0 || line.trim() == "q" {
            return Ok(RunOutcome::Stopped);
        }

        let outcome = sim.step()?;
        let state = sim.state();
        let desc = match outcome {
            StepOutcome::Ran { pid, instructions } => {
                format!("pid {pid} ran {instructions} instruction(s)")
            }
            StepOutcome::Blocked { pid } => format!("pid {pid} blocked"),
            StepOutcome::Idle => "idle".to_string(),
            StepOutcome::Done => "done".to_string(),
        };
        eprintln!("  {desc}; ready={:?}", pids(&state.ready_queue().preview()));
        if state.policy() == Some(PolicyKind::Mlfq) {
            let levels: Vec<String> = Level::ALL
                .iter()
                .map(|&l| format!("{l}={:?}", pids(&state.level_queue(l).preview())))
                .collect();
            eprintln!("  {}", levels.join(" "));
        }
    }
}

fn pids(list: &[Pid]) -> Vec<u32> {
    list.iter().map(|p| p.0).collect()
}

fn report<I: Interpreter>(sim: &Simulator<I>) {
    let state = sim.state();
    println!(
        "{:>4}  {:<16} {:<9} {:>9} {:>8} {:>8}",
        "PID", "NAME", "STATE", "PC", "ARRIVAL", "FINISHED"
    );
    for pcb in state.table().iter() {
        let finished = sim
            .trace()
            .finish_tick(pcb.pid)
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}  {:<16} {:<9} {:>9} {:>8} {:>8}",
            pcb.pid,
            pcb.name,
            pcb.state,
            format!("{}/{}", pcb.program_counter, pcb.instruction_count()),
            pcb.arrival_time,
            finished
        );
    }
    println!(
        "policy={} clock={} idle={}",
        state
            .policy()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string()),
        state.clock(),
        state.idle_ticks()
    );
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .event_format(SimFormat)
        .try_init();
}
