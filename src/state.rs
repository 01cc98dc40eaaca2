//! The simulation context.
//!
//! `SimState` owns every piece of mutable simulation state: the process
//! table, variable memory, the ready and MLFQ level queues, the resources,
//! the clock and the scheduling session. Queues and resources only hold
//! PIDs; the table is the single source of truth for process state.
//!
//! Between two steps no process is RUNNING, every queued process is READY
//! and every process in a blocked set is BLOCKED. [`SimState::verify`]
//! checks these relations.

use std::num::NonZeroUsize;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::fmt::set_sim_tick;
use crate::memory::{HeaderWord, Memory};
use crate::policy::PolicyKind;
use crate::process::{Pcb, ProcessDef, ProcessState, ProcessTable};
use crate::queue::BoundedQueue;
use crate::resource::{ResourceKind, Resources};
use crate::trace::{Trace, TraceKind};
use crate::types::{Level, Pid, Priority, Tick};

/// Round-robin quantum used until one is set explicitly.
pub const DEFAULT_QUANTUM: NonZeroUsize = match NonZeroUsize::new(2) {
    Some(q) => q,
    None => panic!("zero quantum"),
};

/// Result of a successful [`SimState::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The resource was free and now belongs to the caller.
    Granted,
    /// The caller joined the resource's blocked set.
    Blocked,
}

/// Scheduling progress that persists from one step to the next.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Indexed by table slot.
    arrived: Vec<bool>,
    finished: usize,
    started: bool,
}

impl Session {
    pub fn has_arrived(&self, pid: Pid) -> bool {
        self.arrived.get(pid.index()).copied().unwrap_or(false)
    }

    /// Number of processes that reached FINISHED.
    pub fn finished(&self) -> usize {
        self.finished
    }

    /// Whether any step has run since the last reset.
    pub fn started(&self) -> bool {
        self.started
    }
}

/// The whole simulated machine.
#[derive(Debug, Clone)]
pub struct SimState {
    table: ProcessTable,
    memory: Memory,
    /// Generic ready queue; doubles as MLFQ level 4.
    ready: BoundedQueue,
    /// MLFQ levels 1..=3.
    levels: [BoundedQueue; 3],
    resources: Resources,
    clock: Tick,
    idle_ticks: u64,
    policy: Option<PolicyKind>,
    quantum: NonZeroUsize,
    session: Session,
    trace: Trace,
}

impl SimState {
    pub fn new() -> Self {
        SimState {
            table: ProcessTable::new(),
            memory: Memory::new(),
            ready: BoundedQueue::new("ready"),
            levels: [
                BoundedQueue::new("level1"),
                BoundedQueue::new("level2"),
                BoundedQueue::new("level3"),
            ],
            resources: Resources::new(),
            clock: 0,
            idle_ticks: 0,
            policy: None,
            quantum: DEFAULT_QUANTUM,
            session: Session::default(),
            trace: Trace::new(),
        }
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn process(&self, pid: Pid) -> Option<&Pcb> {
        self.table.get(pid)
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn ready_queue(&self) -> &BoundedQueue {
        &self.ready
    }

    /// The queue backing an MLFQ level. Level 4 is the generic ready queue.
    pub fn level_queue(&self, level: Level) -> &BoundedQueue {
        match level.get() {
            n @ 1..=3 => &self.levels[usize::from(n) - 1],
            _ => &self.ready,
        }
    }

    pub(crate) fn level_queue_mut(&mut self, level: Level) -> &mut BoundedQueue {
        match level.get() {
            n @ 1..=3 => &mut self.levels[usize::from(n) - 1],
            _ => &mut self.ready,
        }
    }

    pub(crate) fn ready_queue_mut(&mut self) -> &mut BoundedQueue {
        &mut self.ready
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn clock(&self) -> Tick {
        self.clock
    }

    pub fn idle_ticks(&self) -> u64 {
        self.idle_ticks
    }

    pub fn policy(&self) -> Option<PolicyKind> {
        self.policy
    }

    pub fn quantum(&self) -> NonZeroUsize {
        self.quantum
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// True once every created process is FINISHED (vacuously true when
    /// the table is empty).
    pub fn all_finished(&self) -> bool {
        self.session.finished >= self.table.len()
    }

    pub(crate) fn set_policy(&mut self, policy: PolicyKind) {
        self.policy = Some(policy);
    }

    pub(crate) fn set_quantum(&mut self, quantum: NonZeroUsize) {
        self.quantum = quantum;
    }

    pub(crate) fn mark_started(&mut self) {
        self.session.started = true;
    }

    /// Create a READY process and claim its memory window.
    ///
    /// The process enters a queue once the clock reaches its arrival time.
    pub fn add_process(&mut self, def: ProcessDef) -> Result<Pid, SimError> {
        let pid = self.table.create(def)?;
        let pcb = self.table.require(pid)?;
        if let Err(e) = self.memory.allocate(pcb) {
            self.table.pop();
            return Err(e);
        }
        self.session.arrived.push(false);
        info!(
            pid = pid.0,
            name = pcb.name.as_str(),
            priority = pcb.priority,
            arrival = pcb.arrival_time,
            instructions = pcb.instruction_count(),
            "process created"
        );
        Ok(pid)
    }

    /// Read a variable from `pid`'s memory window.
    pub fn variable(&self, pid: Pid, name: &str) -> Result<Option<&str>, SimError> {
        let window = self.table.require(pid)?.memory_window;
        Ok(self.memory.get(window, name))
    }

    /// Read a header word mirrored from `pid`'s PCB.
    pub fn header(&self, pid: Pid, word: HeaderWord) -> Result<Option<&str>, SimError> {
        let window = self.table.require(pid)?.memory_window;
        Ok(self.memory.header(window, word))
    }

    /// Write a variable into `pid`'s memory window.
    pub fn set_variable(&mut self, pid: Pid, name: &str, value: &str) -> Result<(), SimError> {
        let window = self.table.require(pid)?.memory_window;
        self.memory
            .set(window, name, value)
            .map_err(|_| SimError::WindowFull(pid))
    }

    pub(crate) fn set_state(&mut self, pid: Pid, state: ProcessState) -> Result<(), SimError> {
        let pcb = self.table.require_mut(pid)?;
        pcb.state = state;
        self.memory.sync_header(pcb);
        Ok(())
    }

    pub(crate) fn advance_pc(&mut self, pid: Pid) -> Result<(), SimError> {
        let pcb = self.table.require_mut(pid)?;
        pcb.program_counter += 1;
        self.memory.sync_header(pcb);
        Ok(())
    }

    pub(crate) fn set_demote_pending(&mut self, pid: Pid) -> Result<(), SimError> {
        self.table.require_mut(pid)?.demote_pending = true;
        Ok(())
    }

    /// Mark `pid` FINISHED. Finishing twice is a no-op.
    pub(crate) fn finish(&mut self, pid: Pid) -> Result<(), SimError> {
        let pcb = self.table.require_mut(pid)?;
        if pcb.is_finished() {
            return Ok(());
        }
        pcb.state = ProcessState::Finished;
        self.memory.sync_header(pcb);
        self.session.finished += 1;
        self.trace.record(self.clock, TraceKind::Finished { pid });
        info!(pid = pid.0, "process finished");

        let held = self.resources.held_by(pid);
        if !held.is_empty() {
            warn!(pid = pid.0, resources = ?held, "process finished while holding resources");
        }
        Ok(())
    }

    /// Advance the clock by one tick.
    pub(crate) fn tick(&mut self) {
        self.clock += 1;
        set_sim_tick(self.clock);
    }

    pub(crate) fn idle_tick(&mut self) {
        self.trace.record(self.clock, TraceKind::Idle);
        self.idle_ticks += 1;
        debug!("no process ready");
        self.tick();
    }

    pub(crate) fn record(&mut self, kind: TraceKind) {
        self.trace.record(self.clock, kind);
    }

    pub(crate) fn record_dispatch(&mut self, pid: Pid, pc: usize) {
        self.trace.record(self.clock, TraceKind::Dispatched { pid, pc });
    }

    /// Queue every process whose arrival time has been reached.
    ///
    /// Processes are admitted in PID order. Under MLFQ they enter level 1,
    /// otherwise the generic ready queue.
    pub(crate) fn admit_arrivals(&mut self) -> Result<(), SimError> {
        let due: Vec<Pid> = self
            .table
            .iter()
            .filter(|p| {
                !self.session.has_arrived(p.pid)
                    && p.arrival_time <= self.clock
                    && p.state == ProcessState::Ready
            })
            .map(|p| p.pid)
            .collect();

        let mlfq = self.policy == Some(PolicyKind::Mlfq);
        for pid in due {
            let level = if mlfq { Level::TOP } else { Level::BOTTOM };
            self.level_queue_mut(level).enqueue(pid)?;
            if mlfq {
                self.table.require_mut(pid)?.mlfq_level = Level::TOP;
            }
            self.session.arrived[pid.index()] = true;
            self.trace.record(self.clock, TraceKind::Arrived { pid });
            info!(pid = pid.0, "process arrived");
        }
        Ok(())
    }

    /// The level `pid` re-enters at, and whether that consumes a pending
    /// demotion. Outside MLFQ everything goes to the generic ready queue.
    fn readmit_level(&self, pid: Pid) -> Result<(Level, bool), SimError> {
        let pcb = self.table.require(pid)?;
        Ok(match self.policy {
            Some(PolicyKind::Mlfq) if pcb.demote_pending => (pcb.mlfq_level.demoted(), true),
            Some(PolicyKind::Mlfq) => (pcb.mlfq_level, false),
            _ => (Level::BOTTOM, false),
        })
    }

    /// Put a runnable process back into the ready structures of the active
    /// policy and mark it READY.
    ///
    /// Under MLFQ a pending demotion is applied first.
    pub(crate) fn readmit(&mut self, pid: Pid) -> Result<(), SimError> {
        let (level, demote) = self.readmit_level(pid)?;
        self.level_queue_mut(level).enqueue(pid)?;

        let pcb = self.table.require_mut(pid)?;
        pcb.state = ProcessState::Ready;
        if demote {
            pcb.demote_pending = false;
            if pcb.mlfq_level != level {
                pcb.mlfq_level = level;
                self.trace.record(self.clock, TraceKind::Demoted { pid, level });
                debug!(pid = pid.0, %level, "demoted");
            }
        }
        self.memory.sync_header(pcb);
        Ok(())
    }

    /// Request `kind` on behalf of the RUNNING process `pid`.
    ///
    /// A free resource is granted at once and the caller keeps running.
    /// Otherwise the caller joins the blocked set, ordered by priority and
    /// then by arrival, and becomes BLOCKED.
    ///
    /// Only the process being dispatched may wait: a READY process still
    /// sits in a queue and would end up in two places at once.
    pub fn wait(&mut self, kind: ResourceKind, pid: Pid) -> Result<WaitOutcome, SimError> {
        let pcb = self.table.require(pid)?;
        if pcb.state != ProcessState::Running {
            return Err(SimError::NotRunnable(pid));
        }
        let priority = pcb.priority;

        let resource = self.resources.get_mut(kind);
        if resource.is_available() {
            resource.set_holder(Some(pid));
            self.trace.record(self.clock, TraceKind::Acquired { pid, resource: kind });
            debug!(pid = pid.0, resource = %kind, "resource granted");
            return Ok(WaitOutcome::Granted);
        }

        if resource.blocked_mut().insert(pid, priority).is_err() {
            return Err(SimError::BlockedSetFull(kind));
        }
        self.set_state(pid, ProcessState::Blocked)?;
        self.trace.record(self.clock, TraceKind::Blocked { pid, resource: kind });
        debug!(pid = pid.0, resource = %kind, priority, "blocked");
        Ok(WaitOutcome::Blocked)
    }

    /// Release `kind`, handing it to the first waiter if there is one.
    ///
    /// Returns the PID of the new holder. The woken process is re-admitted
    /// to the ready structures of the active policy.
    pub fn signal(&mut self, kind: ResourceKind) -> Result<Option<Pid>, SimError> {
        let resource = self.resources.get(kind);
        if resource.is_available() {
            return Err(SimError::SignalIdleResource(kind));
        }

        let Some(next) = resource.blocked().peek() else {
            self.resources.get_mut(kind).set_holder(None);
            self.trace.record(self.clock, TraceKind::Released { resource: kind });
            debug!(resource = %kind, "resource released");
            return Ok(None);
        };

        let (level, _) = self.readmit_level(next)?;
        let target = self.level_queue(level);
        if target.is_full() {
            return Err(SimError::QueueFull {
                queue: target.name(),
            });
        }

        let resource = self.resources.get_mut(kind);
        resource.blocked_mut().pop();
        resource.set_holder(Some(next));
        self.trace.record(self.clock, TraceKind::Woken { pid: next, resource: kind });
        debug!(pid = next.0, resource = %kind, "woken");
        self.readmit(next)?;
        Ok(Some(next))
    }

    /// Number of PIDs sitting in the ready and level queues.
    pub fn queued(&self) -> usize {
        self.ready.len() + self.levels.iter().map(BoundedQueue::len).sum::<usize>()
    }

    /// No process can ever run again: nothing is queued, nothing is yet to
    /// arrive, and every unfinished process is BLOCKED.
    pub fn is_deadlocked(&self) -> bool {
        if self.queued() > 0 {
            return false;
        }
        let mut blocked = 0;
        for pcb in self.table.iter() {
            match pcb.state {
                ProcessState::Finished => {}
                ProcessState::Blocked => blocked += 1,
                ProcessState::Ready | ProcessState::Running => return false,
            }
        }
        blocked > 0
    }

    fn all_queues(&self) -> impl Iterator<Item = &BoundedQueue> {
        self.levels.iter().chain(std::iter::once(&self.ready))
    }

    /// Check the cross-structure invariants that must hold between steps.
    pub fn verify(&self) -> Result<(), String> {
        let mut placements = vec![0usize; self.table.len()];

        for queue in self.all_queues() {
            for pid in queue.preview() {
                let pcb = self
                    .table
                    .get(pid)
                    .ok_or_else(|| format!("{} queue holds unknown pid {pid}", queue.name()))?;
                if pcb.state != ProcessState::Ready {
                    return Err(format!(
                        "pid {pid} is {} but sits in the {} queue",
                        pcb.state,
                        queue.name()
                    ));
                }
                if !self.session.has_arrived(pid) {
                    return Err(format!("pid {pid} queued before its arrival"));
                }
                placements[pid.index()] += 1;
            }
        }

        for (queue, level) in self.levels.iter().zip(Level::ALL) {
            for pid in queue.preview() {
                let actual = self.table.require(pid).map_err(|e| e.to_string())?.mlfq_level;
                if actual != level {
                    return Err(format!("pid {pid} at {actual} sits in {}", queue.name()));
                }
            }
        }

        for res in self.resources.iter() {
            if let Some(holder) = res.holder() {
                if self.table.get(holder).is_none() {
                    return Err(format!("{} held by unknown pid {holder}", res.kind()));
                }
            }
            if res.is_available() && !res.blocked().is_empty() {
                return Err(format!("{} is available but has waiters", res.kind()));
            }
            for pid in res.blocked().preview() {
                let pcb = self
                    .table
                    .get(pid)
                    .ok_or_else(|| format!("{} blocks unknown pid {pid}", res.kind()))?;
                if pcb.state != ProcessState::Blocked {
                    return Err(format!(
                        "pid {pid} is {} but waits on {}",
                        pcb.state,
                        res.kind()
                    ));
                }
                placements[pid.index()] += 1;
            }
        }

        for pcb in self.table.iter() {
            let pid = pcb.pid;
            let placed = placements[pid.index()];
            let expected = match pcb.state {
                ProcessState::Running => {
                    return Err(format!("pid {pid} is RUNNING between steps"));
                }
                ProcessState::Blocked => 1,
                ProcessState::Ready if self.session.has_arrived(pid) => 1,
                ProcessState::Ready => 0,
                ProcessState::Finished => {
                    if !pcb.is_exhausted() {
                        return Err(format!("pid {pid} finished with instructions left"));
                    }
                    0
                }
            };
            if placed != expected {
                return Err(format!(
                    "pid {pid} ({}) appears {placed} times in queues and blocked sets, expected {expected}",
                    pcb.state
                ));
            }

            let window = pcb.memory_window;
            let pc = pcb.program_counter.to_string();
            if self.memory.header(window, HeaderWord::State) != Some(pcb.state.label())
                || self.memory.header(window, HeaderWord::Pc) != Some(pc.as_str())
            {
                return Err(format!("memory header of pid {pid} is stale"));
            }
        }

        if self.session.finished != self.table.finished_count() {
            return Err(format!(
                "session counts {} finished, table has {}",
                self.session.finished,
                self.table.finished_count()
            ));
        }
        Ok(())
    }

    /// A serializable copy of everything a front end displays.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            clock: self.clock,
            idle_ticks: self.idle_ticks,
            policy: self.policy,
            quantum: self.quantum.get(),
            finished: self.session.finished,
            processes: self
                .table
                .iter()
                .map(|pcb| ProcessView {
                    pid: pcb.pid,
                    name: pcb.name.clone(),
                    state: pcb.state,
                    priority: pcb.priority,
                    program_counter: pcb.program_counter,
                    instruction_count: pcb.instruction_count(),
                    arrival_time: pcb.arrival_time,
                    mlfq_level: pcb.mlfq_level,
                    memory_window: pcb.memory_window,
                    variables: self
                        .memory
                        .variables(pcb.memory_window)
                        .into_iter()
                        .map(|(n, v)| (n.to_string(), v.to_string()))
                        .collect(),
                })
                .collect(),
            ready_queue: self.ready.preview(),
            level_queues: [
                self.levels[0].preview(),
                self.levels[1].preview(),
                self.levels[2].preview(),
            ],
            resources: self
                .resources
                .iter()
                .map(|r| ResourceView {
                    resource: r.kind(),
                    available: r.is_available(),
                    holder: r.holder(),
                    blocked: r.blocked().preview(),
                })
                .collect(),
        }
    }

    /// Tear everything down. The selected policy and quantum survive.
    pub fn reset(&mut self) {
        let policy = self.policy;
        let quantum = self.quantum;
        *self = SimState::new();
        self.policy = policy;
        self.quantum = quantum;
        set_sim_tick(0);
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the simulation.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub clock: Tick,
    pub idle_ticks: u64,
    pub policy: Option<PolicyKind>,
    pub quantum: usize,
    pub finished: usize,
    pub processes: Vec<ProcessView>,
    pub ready_queue: Vec<Pid>,
    /// MLFQ levels 1..=3, head first.
    pub level_queues: [Vec<Pid>; 3],
    pub resources: Vec<ResourceView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessView {
    pub pid: Pid,
    pub name: String,
    pub state: ProcessState,
    pub priority: Priority,
    pub program_counter: usize,
    pub instruction_count: usize,
    pub arrival_time: Tick,
    pub mlfq_level: Level,
    pub memory_window: (usize, usize),
    pub variables: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceView {
    pub resource: ResourceKind,
    pub available: bool,
    pub holder: Option<Pid>,
    /// Waiters in wake-up order.
    pub blocked: Vec<Pid>,
}
