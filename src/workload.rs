//! Workload definition, JSON loader and builder API.
//!
//! ```json
//! {
//!   "policy": "rr",
//!   "quantum": 2,
//!   "processes": [
//!     { "name": "P1", "priority": 1, "arrival": 0, "program": "Program_1.txt" },
//!     { "name": "P2", "arrival": 3, "instructions": ["assign x 5", "print x"] }
//!   ],
//!   "inputs": ["1", "10"]
//! }
//! ```
//!
//! `program` paths are relative to the workload file.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::policy::PolicyKind;
use crate::process::ProcessDef;
use crate::types::{Priority, Tick};

/// Where a process's program text comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ProgramSource {
    Inline { instructions: Vec<String> },
    File { program: PathBuf },
}

/// One process of a workload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProcessSpec {
    /// Defaults to the program file stem, or `P<n>`.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, alias = "arrival_time")]
    pub arrival: Tick,
    #[serde(flatten)]
    pub source: ProgramSource,
}

/// A complete simulation setup: policy, quantum, processes and canned
/// console input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Workload {
    #[serde(default)]
    pub policy: Option<PolicyKind>,
    #[serde(default)]
    pub quantum: Option<NonZeroUsize>,
    pub processes: Vec<ProcessSpec>,
    /// Lines fed to `assign x input` before the terminal is consulted.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Directory that relative program paths resolve against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Workload {
    pub fn builder() -> WorkloadBuilder {
        WorkloadBuilder {
            workload: Workload::default(),
        }
    }

    /// Parse a workload from JSON. Program paths resolve against the
    /// current directory.
    pub fn from_json(json: &str) -> Result<Workload, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a workload file.
    pub fn from_path(path: &Path) -> Result<Workload, SimError> {
        let fail = |msg: String| SimError::Workload {
            path: Some(path.to_path_buf()),
            msg,
        };
        let json = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        let mut workload: Workload =
            serde_json::from_str(&json).map_err(|e| fail(format!("JSON parse error: {e}")))?;
        workload.base_dir = path.parent().map(Path::to_path_buf);
        Ok(workload)
    }

    fn resolve(&self, program: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if program.is_relative() => dir.join(program),
            _ => program.to_path_buf(),
        }
    }

    /// Turn every process spec into a definition, reading program files.
    pub fn process_defs(&self) -> Result<Vec<ProcessDef>, SimError> {
        self.processes
            .iter()
            .enumerate()
            .map(|(i, spec)| self.process_def(i, spec))
            .collect()
    }

    fn process_def(&self, index: usize, spec: &ProcessSpec) -> Result<ProcessDef, SimError> {
        match &spec.source {
            ProgramSource::Inline { instructions } => {
                let name = spec
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("P{}", index + 1));
                let text = instructions.join("\n");
                Ok(ProcessDef::from_program(name, spec.priority, spec.arrival, &text))
            }
            ProgramSource::File { program } => {
                let path = self.resolve(program);
                let text = std::fs::read_to_string(&path).map_err(|e| SimError::Workload {
                    path: Some(path.clone()),
                    msg: format!("cannot read program: {e}"),
                })?;
                let name = spec.name.clone().unwrap_or_else(|| {
                    program
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| format!("P{}", index + 1))
                });
                Ok(ProcessDef::from_program(name, spec.priority, spec.arrival, &text))
            }
        }
    }
}

/// Builder for constructing workloads in code.
pub struct WorkloadBuilder {
    workload: Workload,
}

impl WorkloadBuilder {
    pub fn policy(mut self, policy: PolicyKind) -> Self {
        self.workload.policy = Some(policy);
        self
    }

    /// Set the round-robin quantum.
    pub fn quantum(mut self, quantum: usize) -> Self {
        self.workload.quantum = NonZeroUsize::new(quantum);
        assert!(self.workload.quantum.is_some(), "quantum must be positive");
        self
    }

    /// Add a process with inline instructions.
    pub fn process(mut self, name: &str, priority: Priority, arrival: Tick, lines: &[&str]) -> Self {
        self.workload.processes.push(ProcessSpec {
            name: Some(name.to_string()),
            priority,
            arrival,
            source: ProgramSource::Inline {
                instructions: lines.iter().map(|l| l.to_string()).collect(),
            },
        });
        self
    }

    /// Add a process whose program lives in a file.
    pub fn program(
        mut self,
        name: &str,
        priority: Priority,
        arrival: Tick,
        path: impl Into<PathBuf>,
    ) -> Self {
        self.workload.processes.push(ProcessSpec {
            name: Some(name.to_string()),
            priority,
            arrival,
            source: ProgramSource::File {
                program: path.into(),
            },
        });
        self
    }

    /// Queue a console input line.
    pub fn input(mut self, line: &str) -> Self {
        self.workload.inputs.push(line.to_string());
        self
    }

    pub fn build(self) -> Workload {
        assert!(
            !self.workload.processes.is_empty(),
            "workload must have at least one process"
        );
        self.workload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_workload() {
        let json = r#"{
            "policy": "mlfq",
            "quantum": 3,
            "processes": [
                { "name": "a", "priority": 2, "arrival": 1, "instructions": ["assign x 1", "print x"] },
                { "program": "progs/b.txt" }
            ],
            "inputs": ["7"]
        }"#;
        let w = Workload::from_json(json).unwrap();
        assert_eq!(w.policy, Some(PolicyKind::Mlfq));
        assert_eq!(w.quantum.map(NonZeroUsize::get), Some(3));
        assert_eq!(w.processes.len(), 2);
        assert_eq!(w.processes[0].priority, 2);
        assert_eq!(w.processes[0].arrival, 1);
        assert_eq!(
            w.processes[1].source,
            ProgramSource::File {
                program: PathBuf::from("progs/b.txt")
            }
        );
        assert_eq!(w.processes[1].arrival, 0);
        assert_eq!(w.inputs, vec!["7"]);
    }

    #[test]
    fn test_rejects_zero_quantum_and_unknown_fields() {
        let zero = r#"{ "quantum": 0, "processes": [] }"#;
        assert!(matches!(Workload::from_json(zero), Err(SimError::Workload { .. })));
        let extra = r#"{ "processes": [], "cpus": 4 }"#;
        assert!(Workload::from_json(extra).is_err());
    }

    #[test]
    fn test_inline_defs_get_default_names() {
        let w = Workload::from_json(r#"{ "processes": [ { "instructions": ["print x", ""] } ] }"#)
            .unwrap();
        let defs = w.process_defs().unwrap();
        assert_eq!(defs[0].name, "P1");
        assert_eq!(defs[0].instructions, vec!["print x"]);
    }

    #[test]
    fn test_program_files_resolve_against_workload_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Program_1.txt"), "assign a 1\nprint a\n").unwrap();
        let path = dir.path().join("w.json");
        std::fs::write(
            &path,
            r#"{ "policy": "fcfs", "processes": [ { "program": "Program_1.txt", "priority": 3 } ] }"#,
        )
        .unwrap();

        let w = Workload::from_path(&path).unwrap();
        let defs = w.process_defs().unwrap();
        assert_eq!(defs[0].name, "Program_1");
        assert_eq!(defs[0].priority, 3);
        assert_eq!(defs[0].instructions, vec!["assign a 1", "print a"]);
    }

    #[test]
    fn test_missing_program_file() {
        let w = Workload::builder()
            .program("ghost", 0, 0, "/nonexistent/ghost.txt")
            .build();
        assert!(matches!(
            w.process_defs(),
            Err(SimError::Workload { path: Some(_), .. })
        ));
    }

    #[test]
    fn test_builder() {
        let w = Workload::builder()
            .policy(PolicyKind::RoundRobin)
            .quantum(2)
            .process("A", 0, 0, &["print a"])
            .input("x")
            .build();
        assert_eq!(w.quantum.map(NonZeroUsize::get), Some(2));
        assert_eq!(w.processes[0].name.as_deref(), Some("A"));
        assert_eq!(w.inputs, vec!["x"]);
    }
}
