//! Console command grammar.

use crate::target::StepDepth;

pub const HELP: &str = "\
Commands:
  help
  break <Class:line> | <Class#method>
  list
  run | resume | c
  step in|over|out
  where | stack
  locals
  print <name|this.field>
  threads
  trace on|off
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Break(String),
    List,
    Resume,
    Step(StepDepth),
    Where,
    Locals,
    Print(String),
    Threads,
    /// `None` when the argument is neither `on` nor `off`.
    Trace(Option<bool>),
    Quit,
    Unknown(String),
}

impl Command {
    /// Parse one console line; `None` for blank lines.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let command = match name {
            "help" => Self::Help,
            "break" => Self::Break(arg.to_string()),
            "list" => Self::List,
            "run" | "resume" | "c" => Self::Resume,
            "step" => Self::Step(step_depth(arg)),
            "where" | "stack" => Self::Where,
            "locals" => Self::Locals,
            "print" => Self::Print(arg.to_string()),
            "threads" => Self::Threads,
            "trace" => Self::Trace(if arg.eq_ignore_ascii_case("on") {
                Some(true)
            } else if arg.eq_ignore_ascii_case("off") {
                Some(false)
            } else {
                None
            }),
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        };
        Some(command)
    }
}

/// `in`/`into` and `out` select depth; anything else steps over.
fn step_depth(arg: &str) -> StepDepth {
    match arg {
        "in" | "into" => StepDepth::Into,
        "out" => StepDepth::Out,
        _ => StepDepth::Over,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("   \t"), None);
    }

    #[test]
    fn aliases() {
        for line in ["run", "resume", "c"] {
            assert_eq!(Command::parse(line), Some(Command::Resume));
        }
        assert_eq!(Command::parse("stack"), Some(Command::Where));
        assert_eq!(Command::parse("exit"), Some(Command::Quit));
    }

    #[test]
    fn argument_is_trimmed_remainder() {
        assert_eq!(
            Command::parse("  break   Demo : 10  "),
            Some(Command::Break("Demo : 10".into()))
        );
        assert_eq!(
            Command::parse("print this.counter"),
            Some(Command::Print("this.counter".into()))
        );
        assert_eq!(Command::parse("print"), Some(Command::Print(String::new())));
    }

    #[test]
    fn step_depths() {
        assert_eq!(Command::parse("step"), Some(Command::Step(StepDepth::Over)));
        assert_eq!(Command::parse("step in"), Some(Command::Step(StepDepth::Into)));
        assert_eq!(Command::parse("step into"), Some(Command::Step(StepDepth::Into)));
        assert_eq!(Command::parse("step out"), Some(Command::Step(StepDepth::Out)));
        assert_eq!(Command::parse("step sideways"), Some(Command::Step(StepDepth::Over)));
    }

    #[test]
    fn trace_is_case_insensitive() {
        assert_eq!(Command::parse("trace ON"), Some(Command::Trace(Some(true))));
        assert_eq!(Command::parse("trace off"), Some(Command::Trace(Some(false))));
        assert_eq!(Command::parse("trace"), Some(Command::Trace(None)));
    }

    #[test]
    fn commands_are_case_sensitive() {
        assert_eq!(
            Command::parse("HELP"),
            Some(Command::Unknown("HELP".into()))
        );
    }
}
