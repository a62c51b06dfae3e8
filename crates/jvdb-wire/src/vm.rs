//! Typed JDWP commands.
//! - VirtualMachine: sizes, class lookup, threads, resume
//! - ReferenceType/ClassType/Method: metadata used to resolve locations
//! - ObjectReference/StringReference/ArrayReference: value inspection
//! - ThreadReference/StackFrame: stacks and locals
//! - EventRequest: install/clear watches

use crate::codec::PacketReader;
use crate::commands::{
    array_commands, class_type_commands, command_sets, event_request_commands, method_commands,
    object_commands, reference_type_commands, stack_frame_commands, string_commands,
    thread_commands, vm_commands,
};
use crate::connection::JdwpConnection;
use crate::error::{WireError, WireResult};
use crate::types::{
    FieldInfo, FrameInfo, IdSizes, LineEntry, MethodInfo, Modifier, ObjectId, ReferenceTypeId,
    SuspendPolicy, TaggedValue, ThreadId, ThreadStatus, VariableInfo,
};

/// One entry of a `ClassesBySignature` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedClass {
    pub type_tag: u8,
    pub type_id: ReferenceTypeId,
    pub status: i32,
}

/// Line number table of a single method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTable {
    pub start: u64,
    pub end: u64,
    pub lines: Vec<LineEntry>,
}

impl LineTable {
    /// Source line covering `index`: the entry with the greatest code index
    /// not past it.
    #[must_use]
    pub fn line_for(&self, index: u64) -> Option<i32> {
        self.lines
            .iter()
            .filter(|entry| entry.code_index <= index)
            .max_by_key(|entry| entry.code_index)
            .map(|entry| entry.line)
    }

    /// Lowest code index mapped to `line`, if the method has code there.
    #[must_use]
    pub fn first_index_of(&self, line: i32) -> Option<u64> {
        self.lines
            .iter()
            .filter(|entry| entry.line == line)
            .map(|entry| entry.code_index)
            .min()
    }
}

fn size(value: i32) -> WireResult<usize> {
    usize::try_from(value).map_err(|_| WireError::Malformed(format!("invalid id size {value}")))
}

fn read_methods(reader: &mut PacketReader<'_>) -> WireResult<Vec<(u64, String, String, i32)>> {
    let count = reader.count()?;
    let mut members = Vec::with_capacity(count.min(256));
    for _ in 0..count {
        let id = reader.method_id()?;
        members.push((id, reader.string()?, reader.string()?, reader.i32()?));
    }
    Ok(members)
}

impl JdwpConnection {
    pub(crate) fn id_sizes(&self) -> WireResult<IdSizes> {
        let data = self.command(
            command_sets::VIRTUAL_MACHINE,
            vm_commands::ID_SIZES,
            Vec::new(),
        )?;
        let mut reader = PacketReader::new(&data, IdSizes::default());
        Ok(IdSizes {
            field_id: size(reader.i32()?)?,
            method_id: size(reader.i32()?)?,
            object_id: size(reader.i32()?)?,
            reference_type_id: size(reader.i32()?)?,
            frame_id: size(reader.i32()?)?,
        })
    }

    pub fn classes_by_signature(&self, signature: &str) -> WireResult<Vec<LoadedClass>> {
        let mut out = self.writer();
        out.string(signature);
        let data = self.command(
            command_sets::VIRTUAL_MACHINE,
            vm_commands::CLASSES_BY_SIGNATURE,
            out.into_bytes(),
        )?;
        let mut reader = self.reader(&data);
        let count = reader.count()?;
        let mut classes = Vec::with_capacity(count.min(16));
        for _ in 0..count {
            classes.push(LoadedClass {
                type_tag: reader.u8()?,
                type_id: reader.reference_type_id()?,
                status: reader.i32()?,
            });
        }
        Ok(classes)
    }

    pub fn all_threads(&self) -> WireResult<Vec<ThreadId>> {
        let data = self.command(
            command_sets::VIRTUAL_MACHINE,
            vm_commands::ALL_THREADS,
            Vec::new(),
        )?;
        let mut reader = self.reader(&data);
        let count = reader.count()?;
        (0..count).map(|_| reader.object_id()).collect()
    }

    /// Resume every thread (`VirtualMachine.Resume`).
    pub fn resume_vm(&self) -> WireResult<()> {
        self.command(command_sets::VIRTUAL_MACHINE, vm_commands::RESUME, Vec::new())
            .map(drop)
    }

    pub fn signature(&self, ref_type: ReferenceTypeId) -> WireResult<String> {
        let mut out = self.writer();
        out.reference_type_id(ref_type);
        let data = self.command(
            command_sets::REFERENCE_TYPE,
            reference_type_commands::SIGNATURE,
            out.into_bytes(),
        )?;
        self.reader(&data).string()
    }

    pub fn fields(&self, ref_type: ReferenceTypeId) -> WireResult<Vec<FieldInfo>> {
        let mut out = self.writer();
        out.reference_type_id(ref_type);
        let data = self.command(
            command_sets::REFERENCE_TYPE,
            reference_type_commands::FIELDS,
            out.into_bytes(),
        )?;
        let mut reader = self.reader(&data);
        let count = reader.count()?;
        let mut fields = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            fields.push(FieldInfo {
                id: reader.field_id()?,
                name: reader.string()?,
                signature: reader.string()?,
                mod_bits: reader.i32()?,
            });
        }
        Ok(fields)
    }

    pub fn methods(&self, ref_type: ReferenceTypeId) -> WireResult<Vec<MethodInfo>> {
        let mut out = self.writer();
        out.reference_type_id(ref_type);
        let data = self.command(
            command_sets::REFERENCE_TYPE,
            reference_type_commands::METHODS,
            out.into_bytes(),
        )?;
        let mut reader = self.reader(&data);
        Ok(read_methods(&mut reader)?
            .into_iter()
            .map(|(id, name, signature, mod_bits)| MethodInfo {
                id,
                name,
                signature,
                mod_bits,
            })
            .collect())
    }

    /// Source file name; fails with ABSENT_INFORMATION when compiled without it.
    pub fn source_file(&self, ref_type: ReferenceTypeId) -> WireResult<String> {
        let mut out = self.writer();
        out.reference_type_id(ref_type);
        let data = self.command(
            command_sets::REFERENCE_TYPE,
            reference_type_commands::SOURCE_FILE,
            out.into_bytes(),
        )?;
        self.reader(&data).string()
    }

    /// Direct superclass, `None` for `java.lang.Object` and interfaces.
    pub fn superclass(&self, class: ReferenceTypeId) -> WireResult<Option<ReferenceTypeId>> {
        let mut out = self.writer();
        out.reference_type_id(class);
        let data = self.command(
            command_sets::CLASS_TYPE,
            class_type_commands::SUPERCLASS,
            out.into_bytes(),
        )?;
        let id = self.reader(&data).reference_type_id()?;
        Ok((id != 0).then_some(id))
    }

    pub fn line_table(&self, ref_type: ReferenceTypeId, method: u64) -> WireResult<LineTable> {
        let mut out = self.writer();
        out.reference_type_id(ref_type).method_id(method);
        let data = self.command(
            command_sets::METHOD,
            method_commands::LINE_TABLE,
            out.into_bytes(),
        )?;
        let mut reader = self.reader(&data);
        let start = reader.u64()?;
        let end = reader.u64()?;
        let count = reader.count()?;
        let mut lines = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            lines.push(LineEntry {
                code_index: reader.u64()?,
                line: reader.i32()?,
            });
        }
        Ok(LineTable { start, end, lines })
    }

    pub fn variable_table(
        &self,
        ref_type: ReferenceTypeId,
        method: u64,
    ) -> WireResult<Vec<VariableInfo>> {
        let mut out = self.writer();
        out.reference_type_id(ref_type).method_id(method);
        let data = self.command(
            command_sets::METHOD,
            method_commands::VARIABLE_TABLE,
            out.into_bytes(),
        )?;
        let mut reader = self.reader(&data);
        let _arg_count = reader.i32()?;
        let count = reader.count()?;
        let mut variables = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            let code_index = reader.u64()?;
            let name = reader.string()?;
            let signature = reader.string()?;
            let length = reader.i32()?;
            let slot = reader.i32()?;
            variables.push(VariableInfo {
                code_index,
                name,
                signature,
                length: u32::try_from(length).unwrap_or(0),
                slot,
            });
        }
        Ok(variables)
    }

    /// Runtime type of an object: `(type_tag, type_id)`.
    pub fn reference_type(&self, object: ObjectId) -> WireResult<(u8, ReferenceTypeId)> {
        let mut out = self.writer();
        out.object_id(object);
        let data = self.command(
            command_sets::OBJECT_REFERENCE,
            object_commands::REFERENCE_TYPE,
            out.into_bytes(),
        )?;
        let mut reader = self.reader(&data);
        Ok((reader.u8()?, reader.reference_type_id()?))
    }

    pub fn object_values(&self, object: ObjectId, fields: &[u64]) -> WireResult<Vec<TaggedValue>> {
        let mut out = self.writer();
        out.object_id(object);
        out.i32(i32::try_from(fields.len()).unwrap_or(i32::MAX));
        for field in fields {
            out.field_id(*field);
        }
        let data = self.command(
            command_sets::OBJECT_REFERENCE,
            object_commands::GET_VALUES,
            out.into_bytes(),
        )?;
        let mut reader = self.reader(&data);
        let count = reader.count()?;
        (0..count).map(|_| reader.tagged_value()).collect()
    }

    /// Static field values of a type (`ReferenceType.GetValues`).
    pub fn static_values(
        &self,
        ref_type: ReferenceTypeId,
        fields: &[u64],
    ) -> WireResult<Vec<TaggedValue>> {
        let mut out = self.writer();
        out.reference_type_id(ref_type);
        out.i32(i32::try_from(fields.len()).unwrap_or(i32::MAX));
        for field in fields {
            out.field_id(*field);
        }
        let data = self.command(
            command_sets::REFERENCE_TYPE,
            reference_type_commands::GET_VALUES,
            out.into_bytes(),
        )?;
        let mut reader = self.reader(&data);
        let count = reader.count()?;
        (0..count).map(|_| reader.tagged_value()).collect()
    }

    pub fn string_value(&self, string: ObjectId) -> WireResult<String> {
        let mut out = self.writer();
        out.object_id(string);
        let data = self.command(
            command_sets::STRING_REFERENCE,
            string_commands::VALUE,
            out.into_bytes(),
        )?;
        self.reader(&data).string()
    }

    pub fn thread_name(&self, thread: ThreadId) -> WireResult<String> {
        let mut out = self.writer();
        out.object_id(thread);
        let data = self.command(
            command_sets::THREAD_REFERENCE,
            thread_commands::NAME,
            out.into_bytes(),
        )?;
        self.reader(&data).string()
    }

    /// Thread status and whether the thread is suspended.
    pub fn thread_status(&self, thread: ThreadId) -> WireResult<(ThreadStatus, bool)> {
        let mut out = self.writer();
        out.object_id(thread);
        let data = self.command(
            command_sets::THREAD_REFERENCE,
            thread_commands::STATUS,
            out.into_bytes(),
        )?;
        let mut reader = self.reader(&data);
        let status = ThreadStatus::from_i32(reader.i32()?);
        let suspended = reader.i32()? & 1 != 0;
        Ok((status, suspended))
    }

    /// All frames of a suspended thread, innermost first.
    pub fn frames(&self, thread: ThreadId) -> WireResult<Vec<FrameInfo>> {
        let mut out = self.writer();
        out.object_id(thread).i32(0).i32(-1);
        let data = self.command(
            command_sets::THREAD_REFERENCE,
            thread_commands::FRAMES,
            out.into_bytes(),
        )?;
        let mut reader = self.reader(&data);
        let count = reader.count()?;
        let mut frames = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            frames.push(FrameInfo {
                frame_id: reader.frame_id()?,
                location: reader.location()?,
            });
        }
        Ok(frames)
    }

    pub fn array_length(&self, array: ObjectId) -> WireResult<usize> {
        let mut out = self.writer();
        out.object_id(array);
        let data = self.command(
            command_sets::ARRAY_REFERENCE,
            array_commands::LENGTH,
            out.into_bytes(),
        )?;
        self.reader(&data).count()
    }

    pub fn array_values(
        &self,
        array: ObjectId,
        first: usize,
        length: usize,
    ) -> WireResult<Vec<TaggedValue>> {
        let mut out = self.writer();
        out.object_id(array)
            .i32(i32::try_from(first).unwrap_or(i32::MAX))
            .i32(i32::try_from(length).unwrap_or(i32::MAX));
        let data = self.command(
            command_sets::ARRAY_REFERENCE,
            array_commands::GET_VALUES,
            out.into_bytes(),
        )?;
        let mut reader = self.reader(&data);
        let tag = reader.u8()?;
        let count = reader.count()?;
        if TaggedValue::is_primitive_tag(tag) {
            (0..count).map(|_| reader.untagged_value(tag)).collect()
        } else {
            (0..count).map(|_| reader.tagged_value()).collect()
        }
    }

    /// Read local slots of a frame; each slot comes with its signature tag.
    pub fn frame_values(
        &self,
        thread: ThreadId,
        frame: u64,
        slots: &[(i32, u8)],
    ) -> WireResult<Vec<TaggedValue>> {
        let mut out = self.writer();
        out.object_id(thread)
            .frame_id(frame)
            .i32(i32::try_from(slots.len()).unwrap_or(i32::MAX));
        for (slot, tag) in slots {
            out.i32(*slot).u8(*tag);
        }
        let data = self.command(
            command_sets::STACK_FRAME,
            stack_frame_commands::GET_VALUES,
            out.into_bytes(),
        )?;
        let mut reader = self.reader(&data);
        let count = reader.count()?;
        (0..count).map(|_| reader.tagged_value()).collect()
    }

    /// `this` of a frame; a null object for static and native frames.
    pub fn this_object(&self, thread: ThreadId, frame: u64) -> WireResult<TaggedValue> {
        let mut out = self.writer();
        out.object_id(thread).frame_id(frame);
        let data = self.command(
            command_sets::STACK_FRAME,
            stack_frame_commands::THIS_OBJECT,
            out.into_bytes(),
        )?;
        self.reader(&data).tagged_value()
    }

    /// `EventRequest.Set`; returns the VM-assigned request id.
    pub fn set_event_request(
        &self,
        event_kind: u8,
        suspend_policy: SuspendPolicy,
        modifiers: &[Modifier],
    ) -> WireResult<i32> {
        let mut out = self.writer();
        out.u8(event_kind)
            .u8(suspend_policy.as_byte())
            .i32(i32::try_from(modifiers.len()).unwrap_or(i32::MAX));
        for modifier in modifiers {
            out.modifier(modifier);
        }
        let data = self.command(
            command_sets::EVENT_REQUEST,
            event_request_commands::SET,
            out.into_bytes(),
        )?;
        self.reader(&data).i32()
    }

    pub fn clear_event_request(&self, event_kind: u8, request_id: i32) -> WireResult<()> {
        let mut out = self.writer();
        out.u8(event_kind).i32(request_id);
        self.command(
            command_sets::EVENT_REQUEST,
            event_request_commands::CLEAR,
            out.into_bytes(),
        )
        .map(drop)
    }
}
