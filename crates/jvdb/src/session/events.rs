//! Per-event dispatch of the drain loop.

use tracing::debug;

use crate::console::CommandConsole;
use crate::error::Result;
use crate::target::{RequestId, TargetEvent, ThreadId};

use super::DebugSession;

impl DebugSession {
    pub(super) fn dispatch(
        &mut self,
        event: TargetEvent,
        console: &mut CommandConsole,
    ) -> Result<()> {
        match event {
            TargetEvent::VmStart { thread } => {
                self.cursor.current_thread = Some(thread);
                self.printer
                    .line("[VMStart] Target VM started. Type 'help' to see commands.");
                self.pause(console)
            }
            TargetEvent::Breakpoint {
                thread, location, ..
            } => {
                self.cursor.current_thread = Some(thread);
                let location = location.to_string();
                self.printer.line(format!("[Breakpoint] {location}"));
                self.printer
                    .record("BreakpointEvent", &[("location", location.as_str())]);
                self.pause(console)
            }
            TargetEvent::Step {
                request,
                thread,
                location,
            } => {
                self.step_completed(thread, request);
                self.cursor.current_thread = Some(thread);
                let location = location.to_string();
                self.printer.line(format!("[Step] {location}"));
                self.printer.record("StepEvent", &[("location", location.as_str())]);
                self.pause(console)
            }
            TargetEvent::MethodEntry {
                request,
                thread,
                location,
            } => {
                if !self
                    .registry
                    .method_entry_matches(request, &location.method)
                {
                    return Ok(());
                }
                self.cursor.current_thread = Some(thread);
                let label = location.entry_label();
                self.printer.line(format!("[MethodEntry] {label}"));
                self.printer
                    .record("MethodEntryEvent", &[("location", label.as_str())]);
                self.pause(console)
            }
            TargetEvent::Exception {
                thread,
                location,
                exception_type,
                caught,
                ..
            } => {
                self.cursor.current_thread = Some(thread);
                let location = location.to_string();
                debug!(%exception_type, caught, "exception stop");
                self.printer
                    .line(format!("[Exception] {exception_type} at {location}"));
                self.printer.record(
                    "ExceptionEvent",
                    &[("exception", exception_type.as_str()), ("location", location.as_str())],
                );
                self.pause(console)
            }
            TargetEvent::ClassPrepare { loaded, .. } => {
                self.printer.line(format!("[ClassPrepare] {}", loaded.name));
                self.install_pending_for(&loaded);
                Ok(())
            }
            TargetEvent::VmDeath | TargetEvent::VmDisconnected => {
                self.vm_exited();
                Ok(())
            }
        }
    }

    /// A delivered step has expired its one-shot request.
    fn step_completed(&mut self, thread: ThreadId, request: RequestId) {
        if self.steps.get(&thread) == Some(&request) {
            self.steps.remove(&thread);
        }
    }
}
