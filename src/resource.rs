//! Named mutex-like resources.
//!
//! A resource is either available with no holder, or held by exactly one
//! process with zero or more waiters in its blocked set. The holder and the
//! waiters are PIDs into the process table.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::SimError;
use crate::pqueue::MinPriorityQueue;
use crate::types::Pid;

/// The three resources of the simulated machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ResourceKind {
    #[serde(rename = "userInput")]
    UserInput,
    #[serde(rename = "userOutput")]
    UserOutput,
    #[serde(rename = "file")]
    File,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::UserInput,
        ResourceKind::UserOutput,
        ResourceKind::File,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::UserInput => "userInput",
            ResourceKind::UserOutput => "userOutput",
            ResourceKind::File => "file",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| SimError::UnknownResource(s.to_string()))
    }
}

/// One mutex-like resource.
#[derive(Debug, Clone)]
pub struct Resource {
    kind: ResourceKind,
    holder: Option<Pid>,
    blocked: MinPriorityQueue,
}

impl Resource {
    pub fn new(kind: ResourceKind) -> Self {
        Resource {
            kind,
            holder: None,
            blocked: MinPriorityQueue::new(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Available exactly when nobody holds the resource.
    pub fn is_available(&self) -> bool {
        self.holder.is_none()
    }

    pub fn holder(&self) -> Option<Pid> {
        self.holder
    }

    pub fn blocked(&self) -> &MinPriorityQueue {
        &self.blocked
    }

    pub(crate) fn blocked_mut(&mut self) -> &mut MinPriorityQueue {
        &mut self.blocked
    }

    pub(crate) fn set_holder(&mut self, holder: Option<Pid>) {
        self.holder = holder;
    }
}

/// The fixed set of resources, indexed by [`ResourceKind`].
#[derive(Debug, Clone)]
pub struct Resources {
    slots: [Resource; 3],
}

impl Resources {
    pub fn new() -> Self {
        Resources {
            slots: ResourceKind::ALL.map(Resource::new),
        }
    }

    pub fn get(&self, kind: ResourceKind) -> &Resource {
        &self.slots[kind.index()]
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut Resource {
        &mut self.slots[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.slots.iter()
    }

    /// The resources `pid` currently holds.
    pub fn held_by(&self, pid: Pid) -> Vec<ResourceKind> {
        self.slots
            .iter()
            .filter(|r| r.holder == Some(pid))
            .map(|r| r.kind)
            .collect()
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}
