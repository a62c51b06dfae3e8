//! Console command execution against the session.
//! - execute: dispatch one parsed command
//! - step: one-shot step intent, replacing the thread's previous one

use tracing::debug;

use crate::console::command::HELP;
use crate::console::{Command, Flow};
use crate::error::Error;
use crate::inspect::StackInspector;
use crate::session::DebugSession;
use crate::spec::BreakpointSpec;
use crate::target::{StepDepth, ThreadId, WatchRequest};

impl DebugSession {
    pub(crate) fn execute(&mut self, command: Command) -> Flow {
        debug!(?command, "console command");
        match command {
            Command::Help => {
                self.printer.lines(HELP.lines());
                Flow::Stay
            }
            Command::Break(arg) => {
                match BreakpointSpec::parse(&arg) {
                    Ok(spec) => {
                        self.add_breakpoint(spec.clone());
                        self.printer.line(format!("Added breakpoint: {spec}"));
                    }
                    Err(err) => self.printer.line(format!("[error] {err}")),
                }
                Flow::Stay
            }
            Command::List => {
                self.list_breakpoints();
                Flow::Stay
            }
            Command::Resume => Flow::Resume,
            Command::Step(depth) => self.step(depth),
            Command::Where => {
                if let Some(thread) = self.thread_or_warn() {
                    let lines = StackInspector::new(self.target.as_mut()).stack_lines(thread);
                    self.printer.lines(lines);
                }
                Flow::Stay
            }
            Command::Locals => {
                if let Some(thread) = self.thread_or_warn() {
                    let lines = StackInspector::new(self.target.as_mut()).locals_lines(thread);
                    self.printer.lines(lines);
                }
                Flow::Stay
            }
            Command::Print(arg) => {
                self.print_variable(&arg);
                Flow::Stay
            }
            Command::Threads => {
                self.list_threads();
                Flow::Stay
            }
            Command::Trace(on) => {
                if let Some(on) = on {
                    self.printer.set_tracing(on);
                }
                let tracing = self.printer.tracing();
                self.printer.line(format!("trace={tracing}"));
                Flow::Stay
            }
            Command::Quit => Flow::Quit,
            Command::Unknown(name) => {
                self.printer
                    .line(format!("Unknown command: {name} (try 'help')"));
                Flow::Stay
            }
        }
    }

    fn thread_or_warn(&mut self) -> Option<ThreadId> {
        let thread = self.cursor.current_thread;
        if thread.is_none() {
            self.printer.line(format!("[{}]", Error::NoCurrentThread));
        }
        thread
    }

    fn list_breakpoints(&mut self) {
        let lines: Vec<String> = self
            .registry
            .installed()
            .iter()
            .map(crate::registry::InstalledBreakpoint::list_line)
            .collect();
        if lines.is_empty() {
            self.printer.line("[no breakpoints]");
        }
        self.printer.lines(lines);
    }

    fn list_threads(&mut self) {
        match self.target.threads() {
            Ok(threads) => {
                for thread in threads {
                    self.printer.line(format!(
                        "[{}] id={} state={} suspended={}",
                        thread.name,
                        thread.id,
                        thread.status.label(),
                        thread.suspended
                    ));
                }
            }
            Err(err) => self.printer.line(format!("[threads unavailable: {err}]")),
        }
    }

    fn print_variable(&mut self, arg: &str) {
        if arg.is_empty() {
            self.printer.line("Usage: print <name|this.field>");
            return;
        }
        let Some(thread) = self.thread_or_warn() else {
            return;
        };
        let mut inspector = StackInspector::new(self.target.as_mut());
        let line = match arg.strip_prefix("this.") {
            Some(field) => inspector.this_field_line(thread, field),
            None => inspector.local_line(thread, arg),
        };
        self.printer.line(line);
    }

    /// Replace any step intent of the current thread and resume.
    fn step(&mut self, depth: StepDepth) -> Flow {
        let Some(thread) = self.cursor.current_thread else {
            self.printer.line("[cannot step: no suspended thread]");
            return Flow::Stay;
        };
        if let Some(previous) = self.steps.remove(&thread) {
            self.delete_request(previous);
        }
        match self
            .target
            .create_request(&WatchRequest::Step { thread, depth })
        {
            Ok(request) => {
                self.steps.insert(thread, request);
                Flow::Resume
            }
            Err(err) => {
                self.printer.line(format!("[cannot step: {err}]"));
                Flow::Stay
            }
        }
    }
}
