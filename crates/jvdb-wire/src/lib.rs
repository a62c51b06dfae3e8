//! Java Debug Wire Protocol (JDWP) client.
//!
//! Covers the subset of JDWP a line-oriented debugger needs: the handshake,
//! packet framing, composite event decoding, event requests, and the
//! reference/thread/frame queries used for stack and variable inspection.

mod codec;
pub mod commands;
mod connection;
mod error;
mod events;
mod packet;
mod types;
mod vm;

pub use codec::{PacketReader, PacketWriter};
pub use connection::JdwpConnection;
pub use error::{error_codes, WireError, WireResult};
pub use events::{decode_composite, Event, EventKind, EventSet};
pub use packet::{read_packet, write_packet, CommandPacket, Packet, ReplyPacket, HEADER_LEN};
pub use types::{
    signature_to_type_name, type_name_to_signature, FieldInfo, FrameInfo, IdSizes, LineEntry,
    Location, MethodInfo, Modifier, ObjectId, ReferenceTypeId, StepDepth, StepSize,
    SuspendPolicy, TaggedValue, ThreadId, ThreadStatus, TypeTag, VariableInfo,
};
pub use vm::{LineTable, LoadedClass};
