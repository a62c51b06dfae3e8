//! [`Target`] over a live JDWP connection.
//!
//! Type names, method lists, source names and line tables are cached per
//! reference type; a type's debug info does not change once it is loaded.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::debug;

use jvdb_wire::commands::{event_kinds, tags};
use jvdb_wire::{
    error_codes, signature_to_type_name, type_name_to_signature, EventKind, FieldInfo,
    JdwpConnection, LineTable, Location, MethodInfo, Modifier, ReferenceTypeId, StepSize, TaggedValue, TypeTag,
    WireError,
};

use crate::connect::LaunchedVm;
use crate::inspect::ARRAY_PREVIEW_LIMIT;
use crate::target::{
    CodeLocation, EventBatch, LoadedType, LocalVariable, ObjectId, RequestId, RequestKind,
    SuspendPolicy, Target, TargetError, TargetEvent, TargetResult, ThreadId, ThreadInfo, Value,
    WatchRequest,
};

/// Nesting depth past which array elements are not fetched.
const MAX_VALUE_DEPTH: usize = 3;
const ACC_STATIC: i32 = 0x0008;
const ACC_NATIVE: i32 = 0x0100;

impl From<WireError> for TargetError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Closed | WireError::Io(_) => Self::Disconnected,
            err if err.code() == Some(error_codes::VM_DEAD) => Self::Terminated,
            err if err.is_thread_not_suspended() => Self::ThreadNotSuspended,
            err if err.is_absent_information() => Self::AbsentInformation(err.to_string()),
            other => Self::Protocol(other.to_string()),
        }
    }
}

fn event_kind_of(kind: RequestKind) -> u8 {
    match kind {
        RequestKind::Breakpoint => event_kinds::BREAKPOINT,
        RequestKind::MethodEntry => event_kinds::METHOD_ENTRY,
        RequestKind::ClassPrepare => event_kinds::CLASS_PREPARE,
        RequestKind::Exception => event_kinds::EXCEPTION,
        RequestKind::Step => event_kinds::SINGLE_STEP,
    }
}

fn is_static(field: &FieldInfo) -> bool {
    field.mod_bits & ACC_STATIC != 0
}

pub struct JdwpTarget {
    conn: JdwpConnection,
    names: FxHashMap<ReferenceTypeId, SmolStr>,
    type_tags: FxHashMap<ReferenceTypeId, u8>,
    sources: FxHashMap<ReferenceTypeId, Option<SmolStr>>,
    methods: FxHashMap<ReferenceTypeId, Vec<MethodInfo>>,
    /// `None` for methods without line info (native, abstract, `-g:none`).
    lines: FxHashMap<(ReferenceTypeId, u64), Option<LineTable>>,
    process: Option<LaunchedVm>,
    disposed: bool,
}

impl JdwpTarget {
    #[must_use]
    pub fn new(conn: JdwpConnection) -> Self {
        Self {
            conn,
            names: FxHashMap::default(),
            type_tags: FxHashMap::default(),
            sources: FxHashMap::default(),
            methods: FxHashMap::default(),
            lines: FxHashMap::default(),
            process: None,
            disposed: false,
        }
    }

    /// Tie a launched process to the target; it is killed on dispose.
    #[must_use]
    pub fn with_process(mut self, process: LaunchedVm) -> Self {
        self.process = Some(process);
        self
    }

    fn type_name(&mut self, ref_type: ReferenceTypeId) -> TargetResult<SmolStr> {
        if let Some(name) = self.names.get(&ref_type) {
            return Ok(name.clone());
        }
        let signature = self.conn.signature(ref_type)?;
        let name = SmolStr::from(signature_to_type_name(&signature));
        self.names.insert(ref_type, name.clone());
        Ok(name)
    }

    fn source_name(&mut self, ref_type: ReferenceTypeId) -> TargetResult<Option<SmolStr>> {
        if let Some(source) = self.sources.get(&ref_type) {
            return Ok(source.clone());
        }
        let source = match self.conn.source_file(ref_type) {
            Ok(source) => Some(SmolStr::from(source)),
            Err(err) if err.is_absent_information() => None,
            Err(err) => return Err(err.into()),
        };
        self.sources.insert(ref_type, source.clone());
        Ok(source)
    }

    fn method_list(&mut self, ref_type: ReferenceTypeId) -> TargetResult<Vec<MethodInfo>> {
        if let Some(methods) = self.methods.get(&ref_type) {
            return Ok(methods.clone());
        }
        let methods = self.conn.methods(ref_type)?;
        self.methods.insert(ref_type, methods.clone());
        Ok(methods)
    }

    fn line_table(
        &mut self,
        ref_type: ReferenceTypeId,
        method: u64,
    ) -> TargetResult<Option<LineTable>> {
        if let Some(table) = self.lines.get(&(ref_type, method)) {
            return Ok(table.clone());
        }
        let table = match self.conn.line_table(ref_type, method) {
            Ok(table) if table.lines.is_empty() => None,
            Ok(table) => Some(table),
            Err(err) if err.is_absent_information() || err.is_native_method() => None,
            Err(err) => return Err(err.into()),
        };
        self.lines.insert((ref_type, method), table.clone());
        Ok(table)
    }

    fn resolve(&mut self, location: Location) -> TargetResult<CodeLocation> {
        let type_name = self.type_name(location.class_id)?;
        let method = self
            .method_list(location.class_id)?
            .into_iter()
            .find(|method| method.id == location.method_id)
            .map_or_else(|| SmolStr::new_inline("<unknown>"), |method| method.name.into());
        let line = self
            .line_table(location.class_id, location.method_id)?
            .and_then(|table| table.line_for(location.index))
            .and_then(|line| u32::try_from(line).ok());
        let source = self.source_name(location.class_id)?;
        Ok(
            CodeLocation::new(type_name, method, source.as_deref(), line)
                .with_handle(location),
        )
    }

    fn runtime_type_name(&mut self, object: ObjectId) -> TargetResult<SmolStr> {
        let (_, ref_type) = self.conn.reference_type(object)?;
        self.type_name(ref_type)
    }

    fn translate(&mut self, request_id: i32, kind: EventKind) -> TargetResult<Option<TargetEvent>> {
        let event = match kind {
            EventKind::VmStart { thread } => TargetEvent::VmStart { thread },
            EventKind::Breakpoint { thread, location } => TargetEvent::Breakpoint {
                request: RequestId::new(RequestKind::Breakpoint, request_id),
                thread,
                location: self.resolve(location)?,
            },
            EventKind::SingleStep { thread, location } => TargetEvent::Step {
                request: RequestId::new(RequestKind::Step, request_id),
                thread,
                location: self.resolve(location)?,
            },
            EventKind::MethodEntry { thread, location } => TargetEvent::MethodEntry {
                request: RequestId::new(RequestKind::MethodEntry, request_id),
                thread,
                location: self.resolve(location)?,
            },
            EventKind::Exception {
                thread,
                location,
                exception,
                catch_location,
                ..
            } => TargetEvent::Exception {
                request: RequestId::new(RequestKind::Exception, request_id),
                thread,
                location: self.resolve(location)?,
                exception_type: self.runtime_type_name(exception)?,
                caught: catch_location.is_some(),
            },
            EventKind::ClassPrepare {
                type_tag,
                type_id,
                signature,
                ..
            } => {
                let name = SmolStr::from(signature_to_type_name(&signature));
                self.names.insert(type_id, name.clone());
                self.type_tags.insert(type_id, type_tag);
                TargetEvent::ClassPrepare {
                    request: RequestId::new(RequestKind::ClassPrepare, request_id),
                    loaded: LoadedType { id: type_id, name },
                }
            }
            EventKind::VmDeath => TargetEvent::VmDeath,
            EventKind::ThreadStart { .. }
            | EventKind::ThreadDeath { .. }
            | EventKind::ClassUnload { .. } => return Ok(None),
        };
        Ok(Some(event))
    }

    fn materialize(&mut self, value: TaggedValue, depth: usize) -> TargetResult<Value> {
        Ok(match value {
            TaggedValue::Void => Value::Null,
            TaggedValue::Boolean(value) => Value::Boolean(value),
            TaggedValue::Byte(value) => Value::Byte(value),
            TaggedValue::Char(unit) => Value::Char(
                char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER),
            ),
            TaggedValue::Short(value) => Value::Short(value),
            TaggedValue::Int(value) => Value::Int(value),
            TaggedValue::Long(value) => Value::Long(value),
            TaggedValue::Float(value) => Value::Float(value),
            TaggedValue::Double(value) => Value::Double(value),
            TaggedValue::Object { id: 0, .. } => Value::Null,
            TaggedValue::Object {
                tag: tags::STRING,
                id,
            } => Value::String(self.conn.string_value(id)?),
            TaggedValue::Object {
                tag: tags::ARRAY,
                id,
            } => {
                let type_name = self.runtime_type_name(id)?;
                let length = self.conn.array_length(id)?;
                let preview = length.min(ARRAY_PREVIEW_LIMIT);
                let mut elements = Vec::with_capacity(preview);
                if depth < MAX_VALUE_DEPTH && preview > 0 {
                    for element in self.conn.array_values(id, 0, preview)? {
                        elements.push(self.materialize(element, depth + 1)?);
                    }
                }
                Value::Array {
                    type_name,
                    length,
                    elements,
                }
            }
            TaggedValue::Object { id, .. } => Value::Object {
                type_name: self.runtime_type_name(id)?,
                id,
            },
        })
    }

    fn frame_at(&self, thread: ThreadId, frame: usize) -> TargetResult<Option<(u64, Location)>> {
        Ok(self
            .conn
            .frames(thread)?
            .get(frame)
            .map(|info| (info.frame_id, info.location)))
    }
}

impl Target for JdwpTarget {
    fn next_batch(&mut self) -> TargetResult<EventBatch> {
        loop {
            let Some(set) = self.conn.recv_event()? else {
                return Ok(EventBatch {
                    suspend_policy: SuspendPolicy::None,
                    events: vec![TargetEvent::VmDisconnected],
                });
            };
            let mut events = Vec::with_capacity(set.events.len());
            for event in set.events {
                if let Some(event) = self.translate(event.request_id, event.kind)? {
                    events.push(event);
                }
            }
            if events.is_empty() {
                debug!("skipping batch with no session events");
                if set.suspend_policy != SuspendPolicy::None {
                    self.conn.resume_vm()?;
                }
                continue;
            }
            return Ok(EventBatch {
                suspend_policy: set.suspend_policy,
                events,
            });
        }
    }

    fn resume(&mut self) -> TargetResult<()> {
        Ok(self.conn.resume_vm()?)
    }

    fn classes_by_name(&mut self, name: &str) -> TargetResult<Vec<LoadedType>> {
        let classes = self
            .conn
            .classes_by_signature(&type_name_to_signature(name))?;
        let name = SmolStr::from(name);
        Ok(classes
            .into_iter()
            .map(|class| {
                self.names.insert(class.type_id, name.clone());
                self.type_tags.insert(class.type_id, class.type_tag);
                LoadedType {
                    id: class.type_id,
                    name: name.clone(),
                }
            })
            .collect())
    }

    fn locations_of_line(
        &mut self,
        ty: &LoadedType,
        line: u32,
    ) -> TargetResult<Vec<CodeLocation>> {
        let Ok(wanted) = i32::try_from(line) else {
            return Ok(Vec::new());
        };
        let methods = self.method_list(ty.id)?;
        let source = self.source_name(ty.id)?;
        let type_tag = self
            .type_tags
            .get(&ty.id)
            .copied()
            .unwrap_or(TypeTag::Class.as_byte());
        let mut has_line_info = false;
        let mut found = Vec::new();
        for method in methods.iter().filter(|method| method.mod_bits & ACC_NATIVE == 0) {
            let Some(table) = self.line_table(ty.id, method.id)? else {
                continue;
            };
            has_line_info = true;
            if let Some(index) = table.first_index_of(wanted) {
                let handle = Location {
                    type_tag,
                    class_id: ty.id,
                    method_id: method.id,
                    index,
                };
                found.push(
                    CodeLocation::new(
                        ty.name.clone(),
                        method.name.as_str(),
                        source.as_deref(),
                        Some(line),
                    )
                    .with_handle(handle),
                );
            }
        }
        if !has_line_info && !methods.is_empty() {
            return Err(TargetError::AbsentInformation(ty.name.to_string()));
        }
        Ok(found)
    }

    fn create_request(&mut self, request: &WatchRequest) -> TargetResult<RequestId> {
        let modifiers = match request {
            WatchRequest::Breakpoint { location } => vec![Modifier::LocationOnly(location.handle)],
            WatchRequest::MethodEntry { class_name } | WatchRequest::ClassPrepare { class_name } => {
                vec![Modifier::ClassMatch(class_name.to_string())]
            }
            WatchRequest::Exception { caught, uncaught } => vec![Modifier::ExceptionOnly {
                ref_type: 0,
                caught: *caught,
                uncaught: *uncaught,
            }],
            WatchRequest::Step { thread, depth } => vec![
                Modifier::Step {
                    thread: *thread,
                    size: StepSize::Line,
                    depth: *depth,
                },
                Modifier::Count(1),
            ],
        };
        let kind = request.kind();
        let id = self
            .conn
            .set_event_request(event_kind_of(kind), SuspendPolicy::All, &modifiers)?;
        debug!(?kind, id, "event request set");
        Ok(RequestId::new(kind, id))
    }

    fn delete_request(&mut self, request: RequestId) -> TargetResult<()> {
        Ok(self
            .conn
            .clear_event_request(event_kind_of(request.kind), request.id)?)
    }

    fn threads(&mut self) -> TargetResult<Vec<ThreadInfo>> {
        let mut threads = Vec::new();
        for id in self.conn.all_threads()? {
            let info = self.conn.thread_name(id).and_then(|name| {
                let (status, suspended) = self.conn.thread_status(id)?;
                Ok(ThreadInfo {
                    id,
                    name,
                    status,
                    suspended,
                })
            });
            match info {
                Ok(info) => threads.push(info),
                // Died while listing.
                Err(err) if err.code() == Some(error_codes::INVALID_THREAD) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(threads)
    }

    fn frames(&mut self, thread: ThreadId) -> TargetResult<Vec<CodeLocation>> {
        let frames = self.conn.frames(thread)?;
        frames
            .into_iter()
            .map(|frame| self.resolve(frame.location))
            .collect()
    }

    fn visible_locals(
        &mut self,
        thread: ThreadId,
        frame: usize,
    ) -> TargetResult<Vec<LocalVariable>> {
        let Some((frame_id, location)) = self.frame_at(thread, frame)? else {
            return Ok(Vec::new());
        };
        let variables = match self
            .conn
            .variable_table(location.class_id, location.method_id)
        {
            Ok(variables) => variables,
            Err(err) if err.is_absent_information() || err.is_native_method() => {
                let type_name = self.type_name(location.class_id)?;
                return Err(TargetError::AbsentInformation(type_name.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        let visible: Vec<_> = variables
            .into_iter()
            .filter(|var| var.name != "this" && var.is_visible_at(location.index))
            .collect();
        let slots: Vec<(i32, u8)> = visible
            .iter()
            .map(|var| {
                let tag = var.signature.bytes().next().unwrap_or(tags::OBJECT);
                (var.slot, tag)
            })
            .collect();
        let values = self.conn.frame_values(thread, frame_id, &slots)?;
        let mut locals = Vec::with_capacity(visible.len());
        for (var, value) in visible.into_iter().zip(values) {
            locals.push(LocalVariable {
                type_name: signature_to_type_name(&var.signature).into(),
                name: var.name.into(),
                value: self.materialize(value, 0)?,
            });
        }
        Ok(locals)
    }

    fn this_object(&mut self, thread: ThreadId, frame: usize) -> TargetResult<Option<ObjectId>> {
        let Some((frame_id, _)) = self.frame_at(thread, frame)? else {
            return Ok(None);
        };
        Ok(match self.conn.this_object(thread, frame_id)? {
            TaggedValue::Object { id, .. } if id != 0 => Some(id),
            _ => None,
        })
    }

    fn field_value(&mut self, object: ObjectId, field: &str) -> TargetResult<Option<Value>> {
        let (_, mut ref_type) = self.conn.reference_type(object)?;
        loop {
            let declared = self
                .conn
                .fields(ref_type)?
                .into_iter()
                .find(|info| info.name == field);
            if let Some(info) = declared {
                // Statics live on the declaring type, not the instance.
                let values = if is_static(&info) {
                    self.conn.static_values(ref_type, &[info.id])?
                } else {
                    self.conn.object_values(object, &[info.id])?
                };
                let Some(value) = values.into_iter().next() else {
                    return Ok(None);
                };
                return self.materialize(value, 0).map(Some);
            }
            match self.conn.superclass(ref_type)? {
                Some(parent) => ref_type = parent,
                None => return Ok(None),
            }
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.conn.dispose();
        if let Some(process) = self.process.take() {
            drop(process);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jdwp_error(code: u16) -> WireError {
        WireError::Jdwp {
            code,
            command_set: 1,
            command: 1,
        }
    }

    #[test]
    fn wire_errors_map_to_target_errors() {
        assert_eq!(TargetError::from(WireError::Closed), TargetError::Disconnected);
        assert_eq!(
            TargetError::from(jdwp_error(error_codes::VM_DEAD)),
            TargetError::Terminated
        );
        assert_eq!(
            TargetError::from(jdwp_error(error_codes::THREAD_NOT_SUSPENDED)),
            TargetError::ThreadNotSuspended
        );
        assert!(matches!(
            TargetError::from(jdwp_error(error_codes::ABSENT_INFORMATION)),
            TargetError::AbsentInformation(_)
        ));
        assert!(matches!(
            TargetError::from(jdwp_error(error_codes::INVALID_OBJECT)),
            TargetError::Protocol(_)
        ));
    }

    #[test]
    fn request_kinds_map_to_event_kinds() {
        assert_eq!(event_kind_of(RequestKind::Step), event_kinds::SINGLE_STEP);
        assert_eq!(event_kind_of(RequestKind::MethodEntry), event_kinds::METHOD_ENTRY);
        assert_eq!(event_kind_of(RequestKind::ClassPrepare), event_kinds::CLASS_PREPARE);
    }

    #[test]
    fn static_fields_are_recognised_by_modifier() {
        let field = |mod_bits| FieldInfo {
            id: 1,
            name: "COUNT".to_string(),
            signature: "I".to_string(),
            mod_bits,
        };
        assert!(is_static(&field(0x0008 | 0x0001)));
        assert!(!is_static(&field(0x0002)));
    }
}
