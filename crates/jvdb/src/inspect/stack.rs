//! Call stack and locals of a suspended thread, rendered as console lines.

use crate::inspect::format::format_value;
use crate::target::{Target, TargetError, ThreadId};

const LOCALS_ABSENT: &str = "[locals unavailable: class compiled without -g:vars]";

fn not_suspended(thread: ThreadId) -> String {
    format!("[thread not suspended: thread {thread} is running]")
}

pub struct StackInspector<'a> {
    target: &'a mut dyn Target,
}

impl<'a> StackInspector<'a> {
    pub fn new(target: &'a mut dyn Target) -> Self {
        Self { target }
    }

    /// `#i Type.method(Source:line)` per frame, innermost first.
    pub fn stack_lines(&mut self, thread: ThreadId) -> Vec<String> {
        match self.target.frames(thread) {
            Ok(frames) => frames
                .iter()
                .enumerate()
                .map(|(index, location)| format!("#{index} {location}"))
                .collect(),
            Err(err) => vec![format!("[stack unavailable: {err}]")],
        }
    }

    /// `type name = value` per visible local of the innermost frame.
    pub fn locals_lines(&mut self, thread: ThreadId) -> Vec<String> {
        match self.target.visible_locals(thread, 0) {
            Ok(locals) => locals
                .iter()
                .map(|local| {
                    format!(
                        "{} {} = {}",
                        local.type_name,
                        local.name,
                        format_value(&local.value)
                    )
                })
                .collect(),
            Err(TargetError::AbsentInformation(_)) => vec![LOCALS_ABSENT.to_string()],
            Err(TargetError::ThreadNotSuspended) => vec![not_suspended(thread)],
            Err(err) => vec![format!("[locals unavailable: {err}]")],
        }
    }

    /// `name = value` for one local of the innermost frame.
    pub fn local_line(&mut self, thread: ThreadId, name: &str) -> String {
        match self.target.visible_locals(thread, 0) {
            Ok(locals) => locals
                .iter()
                .find(|local| local.name == name)
                .map_or_else(
                    || format!("[no such local: {name}]"),
                    |local| format!("{name} = {}", format_value(&local.value)),
                ),
            Err(TargetError::AbsentInformation(_)) => LOCALS_ABSENT.to_string(),
            Err(TargetError::ThreadNotSuspended) => not_suspended(thread),
            Err(err) => format!("[error] {err}"),
        }
    }

    /// `field = value` for a field of `this` in the innermost frame.
    pub fn this_field_line(&mut self, thread: ThreadId, field: &str) -> String {
        let this = match self.target.this_object(thread, 0) {
            Ok(Some(this)) => this,
            Ok(None) => return "[no this]".to_string(),
            Err(TargetError::ThreadNotSuspended) => return not_suspended(thread),
            Err(err) => return format!("[error] {err}"),
        };
        match self.target.field_value(this, field) {
            Ok(Some(value)) => format!("{field} = {}", format_value(&value)),
            Ok(None) => "[no such field]".to_string(),
            Err(err) => format!("[error] {err}"),
        }
    }
}
