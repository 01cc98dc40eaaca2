//! Trace event recording for the simulator.
//!
//! Every scheduling action (arrival, dispatch, block, wake, preemption,
//! demotion, completion, idle tick) is recorded as a `TraceEvent` stamped
//! with the logical clock at the moment it happened.

use serde::Serialize;

use crate::resource::ResourceKind;
use crate::types::{Level, Pid, Tick};

/// A single trace event produced by the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    /// Clock value when this event occurred.
    pub tick: Tick,
    /// The kind of event.
    pub kind: TraceKind,
}

/// The type of scheduling event recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TraceKind {
    /// A process reached its arrival time and was queued.
    Arrived { pid: Pid },
    /// One instruction of a process was handed to the interpreter.
    Dispatched { pid: Pid, pc: usize },
    /// A process was granted a free resource.
    Acquired { pid: Pid, resource: ResourceKind },
    /// A process blocked waiting for a resource.
    Blocked { pid: Pid, resource: ResourceKind },
    /// A signal handed the resource to a waiting process.
    Woken { pid: Pid, resource: ResourceKind },
    /// A signal released the resource with nobody waiting.
    Released { resource: ResourceKind },
    /// A process used up its quantum and went back to a ready queue.
    Preempted { pid: Pid },
    /// A process moved down one MLFQ level.
    Demoted { pid: Pid, level: Level },
    /// A process executed its last instruction.
    Finished { pid: Pid },
    /// No process was ready; the clock advanced anyway.
    Idle,
}

/// A complete simulation trace, containing all events in chronological order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trace {
    events: Vec<TraceEvent>,
}

impl Trace {
    pub(crate) fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub(crate) fn record(&mut self, tick: Tick, kind: TraceKind) {
        self.events.push(TraceEvent { tick, kind });
    }

    /// Get all events in chronological order.
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// The PID of every dispatched instruction, in dispatch order.
    pub fn dispatch_order(&self) -> Vec<Pid> {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                TraceKind::Dispatched { pid, .. } => Some(pid),
                _ => None,
            })
            .collect()
    }

    /// Number of instructions dispatched for `pid`.
    pub fn dispatches_of(&self, pid: Pid) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceKind::Dispatched { pid: p, .. } if p == pid))
            .count()
    }

    /// Lengths of the uninterrupted dispatch runs of `pid`.
    ///
    /// A run ends whenever another process is dispatched, the process
    /// blocks, is preempted, or finishes.
    pub fn bursts_of(&self, pid: Pid) -> Vec<usize> {
        let mut bursts = Vec::new();
        let mut current = 0;
        for event in &self.events {
            let ends_run = match event.kind {
                TraceKind::Dispatched { pid: p, .. } if p == pid => {
                    current += 1;
                    false
                }
                TraceKind::Dispatched { .. } => true,
                TraceKind::Preempted { pid: p }
                | TraceKind::Finished { pid: p }
                | TraceKind::Blocked { pid: p, .. } => p == pid,
                _ => false,
            };
            if ends_run && current > 0 {
                bursts.push(current);
                current = 0;
            }
        }
        if current > 0 {
            bursts.push(current);
        }
        bursts
    }

    /// Tick at which `pid` finished, if it did.
    pub fn finish_tick(&self, pid: Pid) -> Option<Tick> {
        self.events.iter().find_map(|e| match e.kind {
            TraceKind::Finished { pid: p } if p == pid => Some(e.tick),
            _ => None,
        })
    }

    /// Count the idle ticks.
    pub fn idle_ticks(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceKind::Idle))
            .count()
    }

    /// Pretty-print the trace for debugging.
    pub fn dump(&self) {
        for event in &self.events {
            eprintln!("[{:>6}] {}", event.tick, describe(&event.kind));
        }
    }
}

fn describe(kind: &TraceKind) -> String {
    match kind {
        TraceKind::Arrived { pid } => format!("ARRIVE   pid={pid}"),
        TraceKind::Dispatched { pid, pc } => format!("DISPATCH pid={pid} pc={pc}"),
        TraceKind::Acquired { pid, resource } => format!("ACQUIRE  pid={pid} res={resource}"),
        TraceKind::Blocked { pid, resource } => format!("BLOCK    pid={pid} res={resource}"),
        TraceKind::Woken { pid, resource } => format!("WAKE     pid={pid} res={resource}"),
        TraceKind::Released { resource } => format!("RELEASE  res={resource}"),
        TraceKind::Preempted { pid } => format!("PREEMPT  pid={pid}"),
        TraceKind::Demoted { pid, level } => format!("DEMOTE   pid={pid} level={level}"),
        TraceKind::Finished { pid } => format!("COMPLETE pid={pid}"),
        TraceKind::Idle => "IDLE".to_string(),
    }
}
