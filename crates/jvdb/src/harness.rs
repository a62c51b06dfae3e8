//! Test harness: a scripted in-memory target and a shared output buffer.
//!
//! The script describes what the program does (load a class, reach a line,
//! enter a method, throw). Events are only produced for requests that are
//! installed at that moment, so the session's request bookkeeping is
//! observable from the outside.

use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::target::{
    CodeLocation, EventBatch, LoadedType, LocalVariable, ObjectId, RequestId, SuspendPolicy,
    Target, TargetError, TargetEvent, TargetResult, ThreadId, ThreadInfo, ThreadStatus, Value,
    WatchRequest,
};

/// `Write` sink whose contents stay readable after it is boxed away.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);

impl OutputBuffer {
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

const THIS_OBJECT: ObjectId = 1000;
pub const MAIN_THREAD: ThreadId = 1;

/// A class the program can load.
#[derive(Debug, Clone)]
pub struct FakeClass {
    pub name: SmolStr,
    pub source: Option<SmolStr>,
    pub method: SmolStr,
    /// Lines with code; `None` when compiled without line tables.
    pub lines: Option<Vec<u32>>,
}

impl FakeClass {
    pub fn new(name: &str, method: &str, lines: &[u32]) -> Self {
        Self {
            name: name.into(),
            source: Some(format!("{}.java", name.rsplit('.').next().unwrap_or(name)).into()),
            method: method.into(),
            lines: Some(lines.to_vec()),
        }
    }

    #[must_use]
    pub fn without_line_info(mut self) -> Self {
        self.lines = None;
        self
    }
}

/// A suspended position of one thread.
#[derive(Debug, Clone)]
pub struct Stop {
    pub thread: ThreadId,
    pub location: CodeLocation,
    pub callers: Vec<CodeLocation>,
    /// `None` when compiled without variable tables.
    pub locals: Option<Vec<LocalVariable>>,
    pub this_fields: Option<Vec<(SmolStr, Value)>>,
}

impl Stop {
    pub fn at(class: &str, method: &str, line: u32) -> Self {
        let source = format!("{}.java", class.rsplit('.').next().unwrap_or(class));
        Self {
            thread: MAIN_THREAD,
            location: CodeLocation::new(class, method, Some(source.as_str()), Some(line)),
            callers: Vec::new(),
            locals: Some(Vec::new()),
            this_fields: None,
        }
    }

    #[must_use]
    pub fn on_thread(mut self, thread: ThreadId) -> Self {
        self.thread = thread;
        self
    }

    #[must_use]
    pub fn caller(mut self, location: CodeLocation) -> Self {
        self.callers.push(location);
        self
    }

    #[must_use]
    pub fn local(mut self, name: &str, type_name: &str, value: Value) -> Self {
        self.locals.get_or_insert_with(Vec::new).push(LocalVariable {
            name: name.into(),
            type_name: type_name.into(),
            value,
        });
        self
    }

    #[must_use]
    pub fn without_locals(mut self) -> Self {
        self.locals = None;
        self
    }

    #[must_use]
    pub fn this_field(mut self, name: &str, value: Value) -> Self {
        self.this_fields
            .get_or_insert_with(Vec::new)
            .push((name.into(), value));
        self
    }
}

#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// VM start on the main thread.
    Start,
    LoadClass(SmolStr),
    /// Execution reaches the stop's line.
    Line(Stop),
    /// The stop's method is entered.
    EnterMethod(Stop),
    Throw {
        stop: Stop,
        exception_type: SmolStr,
        caught: bool,
    },
    /// Deliver a batch as-is.
    Batch(EventBatch),
    Disconnect,
}

#[derive(Debug, Default)]
pub struct FakeState {
    classes: Vec<FakeClass>,
    loaded: Vec<LoadedType>,
    script: VecDeque<ScriptStep>,
    /// Installed requests, in creation order.
    pub requests: IndexMap<RequestId, WatchRequest>,
    /// Every request ever created.
    pub created: Vec<WatchRequest>,
    next_request: i32,
    pub resumes: usize,
    /// Resumes issued while nothing was suspended.
    pub redundant_resumes: usize,
    pub disposed: usize,
    fail_resume: bool,
    suspended: bool,
    stop: Option<Stop>,
    ended: bool,
}

impl FakeState {
    /// Installed requests matching `predicate`.
    pub fn active<F>(&self, predicate: F) -> Vec<&WatchRequest>
    where
        F: Fn(&WatchRequest) -> bool,
    {
        self.requests.values().filter(|req| predicate(req)).collect()
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn load(&mut self, name: &str) -> Option<LoadedType> {
        let class = self.classes.iter().find(|class| class.name == name)?;
        let loaded = LoadedType {
            id: 100 + self.loaded.len() as u64,
            name: class.name.clone(),
        };
        self.loaded.push(loaded.clone());
        Some(loaded)
    }

    fn matching<F>(&self, predicate: F) -> Vec<RequestId>
    where
        F: Fn(&WatchRequest) -> bool,
    {
        self.requests
            .iter()
            .filter(|(_, req)| predicate(req))
            .map(|(id, _)| *id)
            .collect()
    }

    fn play(&mut self, step: ScriptStep) -> Option<EventBatch> {
        let (events, stop) = match step {
            ScriptStep::Start => {
                let events = vec![TargetEvent::VmStart {
                    thread: MAIN_THREAD,
                }];
                (events, None)
            }
            ScriptStep::LoadClass(name) => {
                let loaded = self.load(&name)?;
                let events = self
                    .matching(|req| {
                        matches!(req, WatchRequest::ClassPrepare { class_name } if *class_name == name)
                    })
                    .into_iter()
                    .map(|request| TargetEvent::ClassPrepare {
                        request,
                        loaded: loaded.clone(),
                    })
                    .collect();
                (events, None)
            }
            ScriptStep::Line(stop) => {
                let mut events = Vec::new();
                let steps = self.matching(
                    |req| matches!(req, WatchRequest::Step { thread, .. } if *thread == stop.thread),
                );
                for request in steps {
                    // One-shot: the request expires once delivered.
                    self.requests.shift_remove(&request);
                    events.push(TargetEvent::Step {
                        request,
                        thread: stop.thread,
                        location: stop.location.clone(),
                    });
                }
                let here = &stop.location;
                for request in self.matching(|req| {
                    matches!(req, WatchRequest::Breakpoint { location }
                        if location.declaring_type == here.declaring_type && location.line == here.line)
                }) {
                    events.push(TargetEvent::Breakpoint {
                        request,
                        thread: stop.thread,
                        location: stop.location.clone(),
                    });
                }
                (events, Some(stop))
            }
            ScriptStep::EnterMethod(stop) => {
                let class = stop.location.declaring_type.clone();
                let events = self
                    .matching(|req| {
                        matches!(req, WatchRequest::MethodEntry { class_name } if *class_name == class)
                    })
                    .into_iter()
                    .map(|request| TargetEvent::MethodEntry {
                        request,
                        thread: stop.thread,
                        location: stop.location.clone(),
                    })
                    .collect();
                (events, Some(stop))
            }
            ScriptStep::Throw {
                stop,
                exception_type,
                caught,
            } => {
                let events = self
                    .matching(|req| match req {
                        WatchRequest::Exception {
                            caught: on_caught,
                            uncaught: on_uncaught,
                        } => (caught && *on_caught) || (!caught && *on_uncaught),
                        _ => false,
                    })
                    .into_iter()
                    .map(|request| TargetEvent::Exception {
                        request,
                        thread: stop.thread,
                        location: stop.location.clone(),
                        exception_type: exception_type.clone(),
                        caught,
                    })
                    .collect();
                (events, Some(stop))
            }
            ScriptStep::Batch(batch) => return Some(batch),
            ScriptStep::Disconnect => {
                self.ended = true;
                return Some(EventBatch {
                    suspend_policy: SuspendPolicy::None,
                    events: vec![TargetEvent::VmDisconnected],
                });
            }
        };
        if events.is_empty() {
            return None;
        }
        self.stop = stop;
        Some(EventBatch {
            suspend_policy: SuspendPolicy::All,
            events,
        })
    }

    fn suspended_stop(&self, thread: ThreadId) -> TargetResult<Option<&Stop>> {
        if !self.suspended {
            return Err(TargetError::ThreadNotSuspended);
        }
        Ok(self.stop.as_ref().filter(|stop| stop.thread == thread))
    }
}

/// In-memory [`Target`] driven by a script of program actions.
///
/// When the script runs out the VM dies; afterwards it reports a disconnect.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTarget {
    state: Rc<RefCell<FakeState>>,
}

impl ScriptedTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A class the program may load later.
    #[must_use]
    pub fn class(self, class: FakeClass) -> Self {
        self.state.borrow_mut().classes.push(class);
        self
    }

    /// A class that is already loaded when the session starts.
    #[must_use]
    pub fn loaded_class(self, class: FakeClass) -> Self {
        let name = class.name.clone();
        {
            let mut state = self.state.borrow_mut();
            state.classes.push(class);
            state.load(&name);
        }
        self
    }

    #[must_use]
    pub fn then(self, step: ScriptStep) -> Self {
        self.state.borrow_mut().script.push_back(step);
        self
    }

    /// Answer every resume with a protocol error. The target runs on.
    #[must_use]
    pub fn rejecting_resume(self) -> Self {
        self.state.borrow_mut().fail_resume = true;
        self
    }

    /// Shared view of the target for assertions after it is boxed.
    #[must_use]
    pub fn state(&self) -> StateHandle {
        StateHandle(Rc::clone(&self.state))
    }
}

#[derive(Debug, Clone)]
pub struct StateHandle(Rc<RefCell<FakeState>>);

impl StateHandle {
    #[must_use]
    pub fn get(&self) -> Ref<'_, FakeState> {
        self.0.borrow()
    }
}

impl Target for ScriptedTarget {
    fn next_batch(&mut self) -> TargetResult<EventBatch> {
        let mut state = self.state.borrow_mut();
        if state.suspended {
            return Err(TargetError::Protocol(
                "waiting for events while the target is suspended".to_string(),
            ));
        }
        loop {
            let Some(step) = state.script.pop_front() else {
                if state.ended {
                    return Err(TargetError::Disconnected);
                }
                state.ended = true;
                return Ok(EventBatch {
                    suspend_policy: SuspendPolicy::None,
                    events: vec![TargetEvent::VmDeath],
                });
            };
            if let Some(batch) = state.play(step) {
                state.suspended = batch.suspend_policy != SuspendPolicy::None;
                return Ok(batch);
            }
        }
    }

    fn resume(&mut self) -> TargetResult<()> {
        let mut state = self.state.borrow_mut();
        state.resumes += 1;
        if !state.suspended {
            state.redundant_resumes += 1;
        }
        state.suspended = false;
        if state.fail_resume {
            return Err(TargetError::Protocol("resume rejected".to_string()));
        }
        Ok(())
    }

    fn classes_by_name(&mut self, name: &str) -> TargetResult<Vec<LoadedType>> {
        let state = self.state.borrow();
        Ok(state
            .loaded
            .iter()
            .filter(|loaded| loaded.name == name)
            .cloned()
            .collect())
    }

    fn locations_of_line(
        &mut self,
        ty: &LoadedType,
        line: u32,
    ) -> TargetResult<Vec<CodeLocation>> {
        let state = self.state.borrow();
        let Some(class) = state.classes.iter().find(|class| class.name == ty.name) else {
            return Ok(Vec::new());
        };
        let Some(lines) = &class.lines else {
            return Err(TargetError::AbsentInformation(ty.name.to_string()));
        };
        if !lines.contains(&line) {
            return Ok(Vec::new());
        }
        Ok(vec![CodeLocation::new(
            class.name.clone(),
            class.method.clone(),
            class.source.as_deref(),
            Some(line),
        )])
    }

    fn create_request(&mut self, request: &WatchRequest) -> TargetResult<RequestId> {
        let mut state = self.state.borrow_mut();
        state.next_request += 1;
        let id = RequestId::new(request.kind(), state.next_request);
        state.requests.insert(id, request.clone());
        state.created.push(request.clone());
        Ok(id)
    }

    fn delete_request(&mut self, request: RequestId) -> TargetResult<()> {
        self.state.borrow_mut().requests.shift_remove(&request);
        Ok(())
    }

    fn threads(&mut self) -> TargetResult<Vec<ThreadInfo>> {
        let state = self.state.borrow();
        Ok(vec![ThreadInfo {
            id: MAIN_THREAD,
            name: "main".to_string(),
            status: ThreadStatus::Running,
            suspended: state.suspended,
        }])
    }

    fn frames(&mut self, thread: ThreadId) -> TargetResult<Vec<CodeLocation>> {
        let state = self.state.borrow();
        Ok(state
            .suspended_stop(thread)?
            .map(|stop| {
                std::iter::once(stop.location.clone())
                    .chain(stop.callers.iter().cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn visible_locals(
        &mut self,
        thread: ThreadId,
        frame: usize,
    ) -> TargetResult<Vec<LocalVariable>> {
        let state = self.state.borrow();
        let Some(stop) = state.suspended_stop(thread)? else {
            return Ok(Vec::new());
        };
        if frame > 0 {
            return Ok(Vec::new());
        }
        stop.locals.clone().ok_or_else(|| {
            TargetError::AbsentInformation(stop.location.declaring_type.to_string())
        })
    }

    fn this_object(&mut self, thread: ThreadId, _frame: usize) -> TargetResult<Option<ObjectId>> {
        let state = self.state.borrow();
        Ok(state
            .suspended_stop(thread)?
            .and_then(|stop| stop.this_fields.as_ref())
            .map(|_| THIS_OBJECT))
    }

    fn field_value(&mut self, object: ObjectId, field: &str) -> TargetResult<Option<Value>> {
        let state = self.state.borrow();
        if object != THIS_OBJECT {
            return Ok(None);
        }
        Ok(state
            .stop
            .as_ref()
            .and_then(|stop| stop.this_fields.as_ref())
            .and_then(|fields| fields.iter().find(|(name, _)| name == field))
            .map(|(_, value)| value.clone()))
    }

    fn dispose(&mut self) {
        self.state.borrow_mut().disposed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resuming_a_running_target_is_a_no_op() {
        let mut target = ScriptedTarget::new();
        let state = target.state();

        assert!(target.resume().is_ok());
        assert!(target.resume().is_ok());

        let state = state.get();
        assert_eq!(state.resumes, 2);
        assert_eq!(state.redundant_resumes, 2);
        assert!(!state.is_suspended());
    }

    #[test]
    fn rejected_resume_still_releases_the_target() {
        let mut target = ScriptedTarget::new()
            .rejecting_resume()
            .then(ScriptStep::Start);
        target.next_batch().unwrap();

        assert!(matches!(target.resume(), Err(TargetError::Protocol(_))));
        assert!(!target.state().get().is_suspended());
    }
}
