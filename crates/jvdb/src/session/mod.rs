//! Session controller: event-drain loop, breakpoint registry, cursor.
//! - events: per-event dispatch
//! - install: breakpoint installation and request bookkeeping
//! - tests: controller tests against a scripted target

mod events;
mod install;

#[cfg(test)]
mod tests;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::config::{DebugConfig, ExceptionPolicy};
use crate::console::{Command, CommandConsole, Flow};
use crate::error::Result;
use crate::output::Printer;
use crate::registry::BreakpointRegistry;
use crate::target::{RequestId, SuspendPolicy, Target, ThreadId, WatchRequest};

/// Where the operator is: the last pausing event and the loop state.
///
/// `current_batch` holds the suspend policy of the batch being drained and
/// decides whether the loop resumes the target after it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub current_thread: Option<ThreadId>,
    pub current_batch: Option<SuspendPolicy>,
    pub quit: bool,
}

#[derive(Debug, Default)]
struct ExceptionWatch {
    policy: ExceptionPolicy,
    requests: Vec<RequestId>,
}

pub struct DebugSession {
    pub(crate) target: Box<dyn Target>,
    pub(crate) registry: BreakpointRegistry,
    exceptions: ExceptionWatch,
    pub(crate) steps: FxHashMap<ThreadId, RequestId>,
    pub(crate) cursor: Cursor,
    pub(crate) printer: Printer,
    disposed: bool,
}

impl DebugSession {
    pub fn new(target: Box<dyn Target>, printer: Printer) -> Self {
        Self {
            target,
            registry: BreakpointRegistry::new(),
            exceptions: ExceptionWatch::default(),
            steps: FxHashMap::default(),
            cursor: Cursor::default(),
            printer,
            disposed: false,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &BreakpointRegistry {
        &self.registry
    }

    #[must_use]
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    #[must_use]
    pub fn exception_policy(&self) -> ExceptionPolicy {
        self.exceptions.policy
    }

    /// Live step request per thread.
    #[must_use]
    pub fn step_requests(&self) -> &FxHashMap<ThreadId, RequestId> {
        &self.steps
    }

    #[must_use]
    pub fn tracing(&self) -> bool {
        self.printer.tracing()
    }

    pub fn set_tracing(&mut self, on: bool) {
        self.printer.set_tracing(on);
    }

    /// Append a structured record to the event log, if any.
    pub fn record(&mut self, event: &str, fields: &[(&str, &str)]) {
        self.printer.record(event, fields);
    }

    /// Apply the config file: exception policy first, then breakpoints.
    pub fn apply_config(&mut self, config: &DebugConfig) {
        self.set_exception_policy(config.pause_on_exception);
        for spec in &config.breakpoints {
            self.add_breakpoint(spec.clone());
        }
    }

    /// Replace the exception watch. Old requests are cleared first; `none`
    /// leaves no watch installed.
    pub fn set_exception_policy(&mut self, policy: ExceptionPolicy) {
        for request in std::mem::take(&mut self.exceptions.requests) {
            self.delete_request(request);
        }
        self.exceptions.policy = policy;
        let (caught, uncaught) = policy.flags();
        if !(caught || uncaught) {
            return;
        }
        match self
            .target
            .create_request(&WatchRequest::Exception { caught, uncaught })
        {
            Ok(request) => self.exceptions.requests.push(request),
            Err(err) => self
                .printer
                .line(format!("[warn] cannot watch exceptions: {err}")),
        }
    }

    /// Drain events until the target exits or the operator quits.
    ///
    /// The target is resumed once at the end of every batch that suspended
    /// it, unless the session is quitting.
    pub fn run(&mut self, console: &mut CommandConsole) -> Result<()> {
        self.install_class_prepare_watches();
        while !self.cursor.quit {
            let batch = match self.target.next_batch() {
                Ok(batch) => batch,
                Err(err) if err.is_terminal() => {
                    debug!("event channel closed: {err}");
                    self.vm_exited();
                    break;
                }
                Err(err) => {
                    self.printer.line(format!("[error] event channel failed: {err}"));
                    self.cursor.quit = true;
                    break;
                }
            };
            self.cursor.current_batch = Some(batch.suspend_policy);
            for event in batch.events {
                if self.cursor.quit {
                    break;
                }
                self.dispatch(event, console)?;
            }
            let suspended = self
                .cursor
                .current_batch
                .is_some_and(|policy| policy != SuspendPolicy::None);
            if !self.cursor.quit && suspended {
                if let Err(err) = self.target.resume() {
                    debug!("resume ignored: {err}");
                }
            }
        }
        self.dispose();
        Ok(())
    }

    /// Hold the console open until a command ends the pause.
    fn pause(&mut self, console: &mut CommandConsole) -> Result<()> {
        loop {
            let Some(line) = console.next_line(&mut self.printer)? else {
                info!("console input ended");
                self.cursor.quit = true;
                return Ok(());
            };
            let Some(command) = Command::parse(&line) else {
                continue;
            };
            match self.execute(command) {
                Flow::Stay => {}
                Flow::Resume => return Ok(()),
                Flow::Quit => {
                    self.cursor.quit = true;
                    return Ok(());
                }
            }
        }
    }

    fn vm_exited(&mut self) {
        self.printer.line("[VMExit] Target VM exited.");
        self.cursor.quit = true;
    }

    pub(crate) fn delete_request(&mut self, request: RequestId) {
        if let Err(err) = self.target.delete_request(request) {
            debug!(?request, "delete request ignored: {err}");
        }
    }

    /// Release the target and close the event log. Runs once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.target.dispose();
        self.printer.close_log();
    }
}

impl Drop for DebugSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
