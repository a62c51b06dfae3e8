//! Big-endian packet body encoding.
//! - PacketWriter: build command payloads
//! - PacketReader: decode reply/event payloads using the VM's ID sizes

use crate::commands::tags;
use crate::error::{WireError, WireResult};
use crate::types::{IdSizes, Location, Modifier, TaggedValue};

#[derive(Debug)]
pub struct PacketWriter {
    buf: Vec<u8>,
    sizes: IdSizes,
}

impl PacketWriter {
    #[must_use]
    pub fn new(sizes: IdSizes) -> Self {
        Self {
            buf: Vec::new(),
            sizes,
        }
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.u8(u8::from(value))
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        let len = i32::try_from(value.len()).unwrap_or(i32::MAX);
        self.i32(len);
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    fn sized(&mut self, value: u64, size: usize) -> &mut Self {
        let bytes = value.to_be_bytes();
        let size = size.min(bytes.len());
        self.buf.extend_from_slice(&bytes[bytes.len() - size..]);
        self
    }

    pub fn object_id(&mut self, value: u64) -> &mut Self {
        self.sized(value, self.sizes.object_id)
    }

    pub fn reference_type_id(&mut self, value: u64) -> &mut Self {
        self.sized(value, self.sizes.reference_type_id)
    }

    pub fn method_id(&mut self, value: u64) -> &mut Self {
        self.sized(value, self.sizes.method_id)
    }

    pub fn field_id(&mut self, value: u64) -> &mut Self {
        self.sized(value, self.sizes.field_id)
    }

    pub fn frame_id(&mut self, value: u64) -> &mut Self {
        self.sized(value, self.sizes.frame_id)
    }

    pub fn location(&mut self, location: &Location) -> &mut Self {
        self.u8(location.type_tag)
            .reference_type_id(location.class_id)
            .method_id(location.method_id)
            .u64(location.index)
    }

    pub fn modifier(&mut self, modifier: &Modifier) -> &mut Self {
        self.u8(modifier.kind());
        match modifier {
            Modifier::Count(count) => self.i32(*count),
            Modifier::ThreadOnly(thread) => self.object_id(*thread),
            Modifier::ClassMatch(pattern) => self.string(pattern),
            Modifier::LocationOnly(location) => self.location(location),
            Modifier::ExceptionOnly {
                ref_type,
                caught,
                uncaught,
            } => self
                .reference_type_id(*ref_type)
                .bool(*caught)
                .bool(*uncaught),
            Modifier::Step { .. } => {
                let Some((thread, size, depth)) = modifier.step_args() else {
                    return self;
                };
                self.object_id(thread).i32(size).i32(depth)
            }
        }
    }
}

#[derive(Debug)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
    sizes: IdSizes,
}

impl<'a> PacketReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8], sizes: IdSizes) -> Self {
        Self {
            data,
            pos: 0,
            sizes,
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize) -> WireResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                WireError::Malformed(format!(
                    "wanted {len} bytes at offset {}, have {}",
                    self.pos,
                    self.remaining()
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn u8(&mut self) -> WireResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn bool(&mut self) -> WireResult<bool> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> WireResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn i32(&mut self) -> WireResult<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn u64(&mut self) -> WireResult<u64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(raw))
    }

    /// Read an `int` count and reject negative values.
    pub fn count(&mut self) -> WireResult<usize> {
        let value = self.i32()?;
        usize::try_from(value)
            .map_err(|_| WireError::Malformed(format!("negative count {value}")))
    }

    pub fn string(&mut self) -> WireResult<String> {
        let len = self.count()?;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn sized(&mut self, size: usize) -> WireResult<u64> {
        if size > 8 {
            return Err(WireError::Malformed(format!("id size {size} too large")));
        }
        let bytes = self.take(size)?;
        Ok(bytes
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
    }

    pub fn object_id(&mut self) -> WireResult<u64> {
        self.sized(self.sizes.object_id)
    }

    pub fn reference_type_id(&mut self) -> WireResult<u64> {
        self.sized(self.sizes.reference_type_id)
    }

    pub fn method_id(&mut self) -> WireResult<u64> {
        self.sized(self.sizes.method_id)
    }

    pub fn field_id(&mut self) -> WireResult<u64> {
        self.sized(self.sizes.field_id)
    }

    pub fn frame_id(&mut self) -> WireResult<u64> {
        self.sized(self.sizes.frame_id)
    }

    pub fn location(&mut self) -> WireResult<Location> {
        Ok(Location {
            type_tag: self.u8()?,
            class_id: self.reference_type_id()?,
            method_id: self.method_id()?,
            index: self.u64()?,
        })
    }

    pub fn tagged_value(&mut self) -> WireResult<TaggedValue> {
        let tag = self.u8()?;
        self.untagged_value(tag)
    }

    /// Read a value whose tag is known from context (array regions).
    pub fn untagged_value(&mut self, tag: u8) -> WireResult<TaggedValue> {
        let value = match tag {
            tags::VOID => TaggedValue::Void,
            tags::BOOLEAN => TaggedValue::Boolean(self.bool()?),
            tags::BYTE => TaggedValue::Byte(i8::from_be_bytes([self.u8()?])),
            tags::CHAR => TaggedValue::Char(self.u16()?),
            tags::SHORT => {
                let raw = self.u16()?;
                TaggedValue::Short(i16::from_be_bytes(raw.to_be_bytes()))
            }
            tags::INT => TaggedValue::Int(self.i32()?),
            tags::LONG => TaggedValue::Long(i64::from_be_bytes(self.u64()?.to_be_bytes())),
            tags::FLOAT => TaggedValue::Float(f32::from_bits(u32::from_be_bytes(
                self.i32()?.to_be_bytes(),
            ))),
            tags::DOUBLE => TaggedValue::Double(f64::from_bits(self.u64()?)),
            tags::OBJECT
            | tags::ARRAY
            | tags::STRING
            | tags::THREAD
            | tags::THREAD_GROUP
            | tags::CLASS_LOADER
            | tags::CLASS_OBJECT => TaggedValue::Object {
                tag,
                id: self.object_id()?,
            },
            other => {
                return Err(WireError::Malformed(format!(
                    "unknown value tag {:?}",
                    char::from(other)
                )))
            }
        };
        Ok(value)
    }
}
