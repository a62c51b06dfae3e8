//! Composite event decoding (`Event.Composite`, command 64/100).

use crate::codec::PacketReader;
use crate::commands::event_kinds;
use crate::error::{WireError, WireResult};
use crate::types::{IdSizes, Location, ObjectId, ReferenceTypeId, SuspendPolicy, ThreadId};

/// Events delivered together in one composite packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSet {
    pub suspend_policy: SuspendPolicy,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub request_id: i32,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    VmStart {
        thread: ThreadId,
    },
    SingleStep {
        thread: ThreadId,
        location: Location,
    },
    Breakpoint {
        thread: ThreadId,
        location: Location,
    },
    MethodEntry {
        thread: ThreadId,
        location: Location,
    },
    Exception {
        thread: ThreadId,
        location: Location,
        exception_tag: u8,
        exception: ObjectId,
        catch_location: Option<Location>,
    },
    ThreadStart {
        thread: ThreadId,
    },
    ThreadDeath {
        thread: ThreadId,
    },
    ClassPrepare {
        thread: ThreadId,
        type_tag: u8,
        type_id: ReferenceTypeId,
        signature: String,
        status: i32,
    },
    ClassUnload {
        signature: String,
    },
    VmDeath,
}

/// Decode the body of an `Event.Composite` command.
pub fn decode_composite(data: &[u8], sizes: IdSizes) -> WireResult<EventSet> {
    let mut reader = PacketReader::new(data, sizes);
    let policy_byte = reader.u8()?;
    let suspend_policy = SuspendPolicy::from_byte(policy_byte)
        .ok_or_else(|| WireError::Malformed(format!("unknown suspend policy {policy_byte}")))?;
    let count = reader.count()?;
    let mut events = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        events.push(decode_event(&mut reader)?);
    }
    Ok(EventSet {
        suspend_policy,
        events,
    })
}

fn decode_event(reader: &mut PacketReader<'_>) -> WireResult<Event> {
    let kind_byte = reader.u8()?;
    let request_id = reader.i32()?;
    let kind = match kind_byte {
        event_kinds::VM_START => EventKind::VmStart {
            thread: reader.object_id()?,
        },
        event_kinds::SINGLE_STEP => EventKind::SingleStep {
            thread: reader.object_id()?,
            location: reader.location()?,
        },
        event_kinds::BREAKPOINT => EventKind::Breakpoint {
            thread: reader.object_id()?,
            location: reader.location()?,
        },
        event_kinds::METHOD_ENTRY => EventKind::MethodEntry {
            thread: reader.object_id()?,
            location: reader.location()?,
        },
        event_kinds::EXCEPTION => {
            let thread = reader.object_id()?;
            let location = reader.location()?;
            let exception_tag = reader.u8()?;
            let exception = reader.object_id()?;
            let catch_location = reader.location()?;
            EventKind::Exception {
                thread,
                location,
                exception_tag,
                exception,
                catch_location: (!catch_location.is_null()).then_some(catch_location),
            }
        }
        event_kinds::THREAD_START => EventKind::ThreadStart {
            thread: reader.object_id()?,
        },
        event_kinds::THREAD_DEATH => EventKind::ThreadDeath {
            thread: reader.object_id()?,
        },
        event_kinds::CLASS_PREPARE => EventKind::ClassPrepare {
            thread: reader.object_id()?,
            type_tag: reader.u8()?,
            type_id: reader.reference_type_id()?,
            signature: reader.string()?,
            status: reader.i32()?,
        },
        event_kinds::CLASS_UNLOAD => EventKind::ClassUnload {
            signature: reader.string()?,
        },
        event_kinds::VM_DEATH => EventKind::VmDeath,
        other => {
            return Err(WireError::Malformed(format!(
                "unsupported event kind {other}"
            )))
        }
    };
    Ok(Event { request_id, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PacketWriter;

    fn sizes() -> IdSizes {
        IdSizes::default()
    }

    #[test]
    fn decodes_breakpoint_with_thread_start() {
        let location = Location {
            type_tag: 1,
            class_id: 0x10,
            method_id: 0x20,
            index: 4,
        };
        let mut writer = PacketWriter::new(sizes());
        writer.u8(SuspendPolicy::All.as_byte()).i32(2);
        writer.u8(event_kinds::THREAD_START).i32(0).object_id(1);
        writer
            .u8(event_kinds::BREAKPOINT)
            .i32(5)
            .object_id(1)
            .location(&location);
        let set = decode_composite(&writer.into_bytes(), sizes()).unwrap();

        assert_eq!(set.suspend_policy, SuspendPolicy::All);
        assert_eq!(set.events.len(), 2);
        assert_eq!(set.events[0].kind, EventKind::ThreadStart { thread: 1 });
        assert_eq!(set.events[1].request_id, 5);
        assert_eq!(
            set.events[1].kind,
            EventKind::Breakpoint {
                thread: 1,
                location
            }
        );
    }

    #[test]
    fn uncaught_exception_has_no_catch_location() {
        let throw_at = Location {
            type_tag: 1,
            class_id: 3,
            method_id: 4,
            index: 9,
        };
        let mut writer = PacketWriter::new(sizes());
        writer.u8(SuspendPolicy::All.as_byte()).i32(1);
        writer
            .u8(event_kinds::EXCEPTION)
            .i32(8)
            .object_id(1)
            .location(&throw_at)
            .u8(b'L')
            .object_id(77)
            .location(&Location {
                type_tag: 0,
                class_id: 0,
                method_id: 0,
                index: 0,
            });
        let set = decode_composite(&writer.into_bytes(), sizes()).unwrap();
        let EventKind::Exception {
            exception,
            catch_location,
            ..
        } = &set.events[0].kind
        else {
            panic!("expected exception event");
        };
        assert_eq!(*exception, 77);
        assert!(catch_location.is_none());
    }

    #[test]
    fn decodes_class_prepare_and_vm_death() {
        let mut writer = PacketWriter::new(sizes());
        writer.u8(SuspendPolicy::None.as_byte()).i32(2);
        writer
            .u8(event_kinds::CLASS_PREPARE)
            .i32(3)
            .object_id(1)
            .u8(1)
            .reference_type_id(42)
            .string("LDemo;")
            .i32(7);
        writer.u8(event_kinds::VM_DEATH).i32(0);
        let set = decode_composite(&writer.into_bytes(), sizes()).unwrap();
        assert_eq!(set.suspend_policy, SuspendPolicy::None);
        assert!(matches!(
            &set.events[0].kind,
            EventKind::ClassPrepare { type_id: 42, signature, .. } if signature == "LDemo;"
        ));
        assert_eq!(set.events[1].kind, EventKind::VmDeath);
    }

    #[test]
    fn unknown_kind_is_malformed() {
        let mut writer = PacketWriter::new(sizes());
        writer.u8(2).i32(1).u8(200).i32(0);
        assert!(decode_composite(&writer.into_bytes(), sizes()).is_err());
    }
}
