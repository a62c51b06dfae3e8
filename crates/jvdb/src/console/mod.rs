//! Line-oriented command console.
//! - command: command grammar
//! - handlers: command execution against the session

mod command;
mod handlers;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::Path;

pub use command::{Command, HELP};

use crate::output::Printer;

/// What the console asks of the drain loop after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Stay,
    Resume,
    Quit,
}

/// Source of console lines: interactive stdin or a script.
pub struct CommandConsole {
    input: Box<dyn BufRead>,
    interactive: bool,
}

impl CommandConsole {
    #[must_use]
    pub fn new(input: Box<dyn BufRead>, interactive: bool) -> Self {
        Self { input, interactive }
    }

    /// Interactive console on stdin; prints a prompt before each read.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(Box::new(io::stdin().lock()), true)
    }

    pub fn from_script(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(Box::new(BufReader::new(file)), false))
    }

    /// In-memory script, one command per line.
    #[must_use]
    pub fn scripted(text: &str) -> Self {
        Self::new(Box::new(Cursor::new(text.to_string())), false)
    }

    /// Next line without its terminator; `None` at end of input.
    pub(crate) fn next_line(&mut self, printer: &mut Printer) -> io::Result<Option<String>> {
        if self.interactive {
            printer.prompt();
        }
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}
