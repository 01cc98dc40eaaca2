//! User-facing I/O for simulated programs.
//!
//! `assign x input` reads from a console and `print` writes to one. The
//! terminal console backs the command-line driver; the scripted console
//! feeds canned input and captures output.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Line-oriented input and output.
pub trait Console {
    /// Read one line, without its line terminator. `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

/// The process's stdin and stdout. Prompts go to stderr.
///
/// Lines queued with [`StdConsole::with_inputs`] are consumed before stdin
/// is read.
#[derive(Debug, Default, Clone)]
pub struct StdConsole {
    pending: VecDeque<String>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StdConsole {
            pending: inputs.into_iter().map(Into::into).collect(),
        }
    }
}

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if let Some(line) = self.pending.pop_front() {
            return Ok(Some(line));
        }

        let mut stderr = io::stderr().lock();
        write!(stderr, "{prompt}: ")?;
        stderr.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{line}")
    }
}

/// Canned input, captured output.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    output: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedConsole {
            inputs: inputs.into_iter().map(Into::into).collect(),
            output: Vec::new(),
        }
    }

    /// Queue another input line.
    pub fn push_input(&mut self, line: impl Into<String>) {
        self.inputs.push_back(line.into());
    }

    /// Every line written so far, oldest first.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn remaining_inputs(&self) -> usize {
        self.inputs.len()
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.inputs.pop_front())
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.output.push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_console() {
        let mut console = ScriptedConsole::new(["first", "second"]);
        assert_eq!(console.read_line("x").unwrap().as_deref(), Some("first"));
        console.push_input("third");
        assert_eq!(console.remaining_inputs(), 2);
        assert_eq!(console.read_line("x").unwrap().as_deref(), Some("second"));
        assert_eq!(console.read_line("x").unwrap().as_deref(), Some("third"));
        assert_eq!(console.read_line("x").unwrap(), None);

        console.write_line("hello").unwrap();
        assert_eq!(console.output(), ["hello".to_string()]);
    }
}
