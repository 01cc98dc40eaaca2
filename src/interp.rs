//! Instruction interpreter.
//!
//! The scheduler hands a process one program line at a time through the
//! [`Interpreter`] trait and observes the process state afterwards; a line
//! that calls [`SimState::wait`] on a held resource leaves the process
//! BLOCKED.
//!
//! [`ScriptInterpreter`] implements the line language:
//!
//! ```text
//! assign <var> input              read a console line into <var>
//! assign <var> readFile <fvar>    read the file named by <fvar> into <var>
//! assign <var> <value>            store a literal
//! print <var>
//! printFromTo <a> <b>             print value(a)..=value(b), one per line
//! writeFile <fvar> <dvar>         write value(dvar) to the file named by <fvar>
//! readFile <fvar>                 print the first line of the file
//! semWait <resource>
//! semSignal <resource>
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::console::Console;
use crate::error::SimError;
use crate::resource::ResourceKind;
use crate::state::SimState;
use crate::types::{Pid, Tick};

/// Executes one program line on behalf of a process.
pub trait Interpreter {
    /// Execute `line` for `pid`.
    ///
    /// Errors inside the line are the interpreter's business; the scheduler
    /// only looks at the process state once this returns.
    fn dispatch(&mut self, state: &mut SimState, pid: Pid, line: &str);

    /// Drop any per-simulation state. Called on reset.
    fn reset(&mut self) {}
}

/// An interpreter backed by a closure. See [`from_fn`].
pub struct FromFn<F>(F);

/// Build an [`Interpreter`] from a closure.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut(&mut SimState, Pid, &str),
{
    FromFn(f)
}

impl<F> Interpreter for FromFn<F>
where
    F: FnMut(&mut SimState, Pid, &str),
{
    fn dispatch(&mut self, state: &mut SimState, pid: Pid, line: &str) {
        (self.0)(state, pid, line)
    }
}

/// Errors raised while executing a single line.
#[derive(Debug)]
pub enum InterpError {
    /// Known command with the wrong arguments, or an empty line.
    Malformed(String),
    UnknownCommand(String),
    UnknownResource(String),
    MissingVariable(String),
    NotANumber { var: String, value: String },
    /// The console has no more input.
    InputClosed,
    Console(io::Error),
    File { path: PathBuf, source: io::Error },
    /// A core operation (wait, signal, memory write) refused the request.
    Core(SimError),
}

impl fmt::Display for InterpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpError::Malformed(line) => write!(f, "malformed instruction {line:?}"),
            InterpError::UnknownCommand(cmd) => write!(f, "unknown command {cmd:?}"),
            InterpError::UnknownResource(name) => write!(f, "unknown resource {name:?}"),
            InterpError::MissingVariable(var) => write!(f, "variable {var:?} not found in memory"),
            InterpError::NotANumber { var, value } => {
                write!(f, "variable {var:?} holds {value:?}, not an integer")
            }
            InterpError::InputClosed => write!(f, "no more console input"),
            InterpError::Console(e) => write!(f, "console error: {e}"),
            InterpError::File { path, source } => write!(f, "{}: {source}", path.display()),
            InterpError::Core(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InterpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InterpError::Console(e) => Some(e),
            InterpError::File { source, .. } => Some(source),
            InterpError::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SimError> for InterpError {
    fn from(e: SimError) -> Self {
        InterpError::Core(e)
    }
}

/// One parsed program line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    AssignInput { var: String },
    AssignFromFile { var: String, file_var: String },
    Assign { var: String, value: String },
    Print { var: String },
    PrintFromTo { from: String, to: String },
    WriteFile { file_var: String, data_var: String },
    ReadFile { file_var: String },
    SemWait(ResourceKind),
    SemSignal(ResourceKind),
}

fn resource(name: &str) -> Result<ResourceKind, InterpError> {
    name.parse()
        .map_err(|_| InterpError::UnknownResource(name.to_string()))
}

impl FromStr for Instruction {
    type Err = InterpError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        fn s(token: &str) -> String {
            token.to_string()
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        Ok(match tokens.as_slice() {
            ["assign", var, "input"] => Instruction::AssignInput { var: s(var) },
            ["assign", var, "readFile", file_var] => Instruction::AssignFromFile {
                var: s(var),
                file_var: s(file_var),
            },
            ["assign", _, "readFile"] => return Err(InterpError::Malformed(s(line))),
            ["assign", var, value] => Instruction::Assign {
                var: s(var),
                value: s(value),
            },
            ["print", var] => Instruction::Print { var: s(var) },
            ["printFromTo", from, to] => Instruction::PrintFromTo {
                from: s(from),
                to: s(to),
            },
            ["writeFile", file_var, data_var] => Instruction::WriteFile {
                file_var: s(file_var),
                data_var: s(data_var),
            },
            ["readFile", file_var] => Instruction::ReadFile {
                file_var: s(file_var),
            },
            ["semWait", name] => Instruction::SemWait(resource(name)?),
            ["semSignal", name] => Instruction::SemSignal(resource(name)?),
            [cmd, ..]
                if matches!(
                    *cmd,
                    "assign"
                        | "print"
                        | "printFromTo"
                        | "writeFile"
                        | "readFile"
                        | "semWait"
                        | "semSignal"
                ) =>
            {
                return Err(InterpError::Malformed(s(line)))
            }
            [cmd, ..] => return Err(InterpError::UnknownCommand(s(cmd))),
            [] => return Err(InterpError::Malformed(s(line))),
        })
    }
}

/// A line that failed to execute.
#[derive(Debug)]
pub struct InterpFailure {
    pub pid: Pid,
    pub tick: Tick,
    pub line: String,
    pub error: InterpError,
}

/// Interpreter for the program line language.
///
/// Relative file names resolve against `root`. Failed lines are logged,
/// recorded and otherwise ignored: they still count as executed.
pub struct ScriptInterpreter<C: Console> {
    console: C,
    root: PathBuf,
    failures: Vec<InterpFailure>,
}

impl<C: Console> ScriptInterpreter<C> {
    pub fn new(console: C) -> Self {
        Self::with_root(console, ".")
    }

    pub fn with_root(console: C, root: impl Into<PathBuf>) -> Self {
        ScriptInterpreter {
            console,
            root: root.into(),
            failures: Vec::new(),
        }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lines that failed since the last reset.
    pub fn failures(&self) -> &[InterpFailure] {
        &self.failures
    }

    fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn lookup(state: &SimState, pid: Pid, var: &str) -> Result<String, InterpError> {
        state
            .variable(pid, var)?
            .map(str::to_string)
            .ok_or_else(|| InterpError::MissingVariable(var.to_string()))
    }

    fn integer(state: &SimState, pid: Pid, var: &str) -> Result<i64, InterpError> {
        let value = Self::lookup(state, pid, var)?;
        value
            .trim()
            .parse()
            .map_err(|_| InterpError::NotANumber {
                var: var.to_string(),
                value,
            })
    }

    fn write(&mut self, line: &str) -> Result<(), InterpError> {
        self.console.write_line(line).map_err(InterpError::Console)
    }

    /// Execute one parsed instruction.
    pub fn execute(
        &mut self,
        state: &mut SimState,
        pid: Pid,
        instruction: &Instruction,
    ) -> Result<(), InterpError> {
        match instruction {
            Instruction::AssignInput { var } => {
                let prompt = format!("process {pid}: value for {var}");
                let value = self
                    .console
                    .read_line(&prompt)
                    .map_err(InterpError::Console)?
                    .ok_or(InterpError::InputClosed)?;
                state.set_variable(pid, var, &value)?;
            }
            Instruction::AssignFromFile { var, file_var } => {
                let path = self.resolve(&Self::lookup(state, pid, file_var)?);
                let contents = fs::read_to_string(&path)
                    .map_err(|source| InterpError::File { path, source })?;
                state.set_variable(pid, var, &contents)?;
            }
            Instruction::Assign { var, value } => state.set_variable(pid, var, value)?,
            Instruction::Print { var } => {
                let value = Self::lookup(state, pid, var)?;
                self.write(&value)?;
            }
            Instruction::PrintFromTo { from, to } => {
                let from = Self::integer(state, pid, from)?;
                let to = Self::integer(state, pid, to)?;
                for i in from..=to {
                    self.write(&i.to_string())?;
                }
            }
            Instruction::WriteFile { file_var, data_var } => {
                let path = self.resolve(&Self::lookup(state, pid, file_var)?);
                let data = Self::lookup(state, pid, data_var)?;
                fs::write(&path, data).map_err(|source| InterpError::File { path, source })?;
            }
            Instruction::ReadFile { file_var } => {
                let path = self.resolve(&Self::lookup(state, pid, file_var)?);
                let contents = fs::read_to_string(&path)
                    .map_err(|source| InterpError::File { path, source })?;
                let first = contents.lines().next().unwrap_or("");
                self.write(first)?;
            }
            Instruction::SemWait(kind) => {
                let outcome = state.wait(*kind, pid)?;
                debug!(pid = pid.0, resource = %kind, ?outcome, "semWait");
            }
            Instruction::SemSignal(kind) => {
                let woken = state.signal(*kind)?;
                debug!(pid = pid.0, resource = %kind, woken = ?woken, "semSignal");
            }
        }
        Ok(())
    }
}

impl<C: Console> Interpreter for ScriptInterpreter<C> {
    fn dispatch(&mut self, state: &mut SimState, pid: Pid, line: &str) {
        let result = line
            .parse::<Instruction>()
            .and_then(|instruction| self.execute(state, pid, &instruction));
        if let Err(error) = result {
            warn!(pid = pid.0, line, %error, "instruction failed");
            self.failures.push(InterpFailure {
                pid,
                tick: state.clock(),
                line: line.to_string(),
                error,
            });
        }
    }

    fn reset(&mut self) {
        self.failures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use crate::process::ProcessDef;

    fn parse(line: &str) -> Result<Instruction, InterpError> {
        line.parse()
    }

    fn one_process() -> SimState {
        let mut state = SimState::new();
        state
            .add_process(ProcessDef::new("p", 0, 0, vec!["print x".into()]))
            .unwrap();
        state
    }

    #[test]
    fn test_parse_assign_forms() {
        assert_eq!(
            parse("assign a input").unwrap(),
            Instruction::AssignInput { var: "a".into() }
        );
        assert_eq!(
            parse("assign b readFile a").unwrap(),
            Instruction::AssignFromFile {
                var: "b".into(),
                file_var: "a".into()
            }
        );
        assert_eq!(
            parse("  assign c 42 ").unwrap(),
            Instruction::Assign {
                var: "c".into(),
                value: "42".into()
            }
        );
        assert!(matches!(parse("assign b readFile"), Err(InterpError::Malformed(_))));
        assert!(matches!(parse("assign x"), Err(InterpError::Malformed(_))));
    }

    #[test]
    fn test_parse_semaphores() {
        assert_eq!(
            parse("semWait userInput").unwrap(),
            Instruction::SemWait(ResourceKind::UserInput)
        );
        assert_eq!(
            parse("semSignal file").unwrap(),
            Instruction::SemSignal(ResourceKind::File)
        );
        assert!(matches!(
            parse("semWait printer"),
            Err(InterpError::UnknownResource(name)) if name == "printer"
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse("jump 3"), Err(InterpError::UnknownCommand(c)) if c == "jump"));
        assert!(matches!(parse("print"), Err(InterpError::Malformed(_))));
        assert!(matches!(parse("   "), Err(InterpError::Malformed(_))));
    }

    #[test]
    fn test_assign_and_print() {
        let mut state = one_process();
        let mut interp = ScriptInterpreter::new(ScriptedConsole::default());
        interp.dispatch(&mut state, Pid(1), "assign x hello");
        interp.dispatch(&mut state, Pid(1), "print x");
        assert_eq!(interp.console().output(), ["hello".to_string()]);
        assert!(interp.failures().is_empty());
    }

    #[test]
    fn test_print_from_to() {
        let mut state = one_process();
        let mut interp = ScriptInterpreter::new(ScriptedConsole::new(["3", "5"]));
        interp.dispatch(&mut state, Pid(1), "assign a input");
        interp.dispatch(&mut state, Pid(1), "assign b input");
        interp.dispatch(&mut state, Pid(1), "printFromTo a b");
        assert_eq!(interp.console().output(), ["3", "4", "5"].map(String::from));
    }

    #[test]
    fn test_failures_are_recorded() {
        let mut state = one_process();
        let mut interp = ScriptInterpreter::new(ScriptedConsole::default());
        interp.dispatch(&mut state, Pid(1), "print nothing");
        interp.dispatch(&mut state, Pid(1), "assign y input");
        interp.dispatch(&mut state, Pid(1), "semSignal file");

        let errors: Vec<_> = interp.failures().iter().map(|f| &f.error).collect();
        assert!(matches!(errors[0], InterpError::MissingVariable(v) if v == "nothing"));
        assert!(matches!(errors[1], InterpError::InputClosed));
        assert!(matches!(
            errors[2],
            InterpError::Core(SimError::SignalIdleResource(ResourceKind::File))
        ));

        interp.reset();
        assert!(interp.failures().is_empty());
    }

    #[test]
    fn test_not_a_number() {
        let mut state = one_process();
        let mut interp = ScriptInterpreter::new(ScriptedConsole::default());
        interp.dispatch(&mut state, Pid(1), "assign a one");
        interp.dispatch(&mut state, Pid(1), "assign b 3");
        interp.dispatch(&mut state, Pid(1), "printFromTo a b");
        assert!(matches!(
            &interp.failures()[0].error,
            InterpError::NotANumber { var, .. } if var == "a"
        ));
    }

    #[test]
    fn test_from_fn_interpreter() {
        let mut state = one_process();
        let mut seen = Vec::new();
        let mut interp = from_fn(|_: &mut SimState, pid: Pid, line: &str| {
            seen.push((pid, line.to_string()));
        });
        interp.dispatch(&mut state, Pid(1), "anything");
        drop(interp);
        assert_eq!(seen, vec![(Pid(1), "anything".to_string())]);
    }
}
