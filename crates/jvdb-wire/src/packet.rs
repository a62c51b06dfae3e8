//! JDWP packet framing.
//! - read_packet: parse one header + body from a stream
//! - write_packet: emit a command packet

use std::io::{self, Read, Write};

pub const HEADER_LEN: usize = 11;
const REPLY_FLAG: u8 = 0x80;
const MAX_PREALLOC: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPacket {
    pub id: u32,
    pub command_set: u8,
    pub command: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPacket {
    pub id: u32,
    pub error_code: u16,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Command(CommandPacket),
    Reply(ReplyPacket),
}

/// Read a packet; `Ok(None)` on a clean end of stream before a header.
pub fn read_packet<R: Read>(reader: &mut R) -> io::Result<Option<Packet>> {
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        let read = reader.read(&mut header[filled..])?;
        if read == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated packet header",
            ));
        }
        filled += read;
    }

    let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    if length < HEADER_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("packet length {length} shorter than header"),
        ));
    }
    let id = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    let flags = header[8];

    // Untrusted length: allocate as bytes arrive.
    let body_len = length - HEADER_LEN;
    let mut data = Vec::with_capacity(body_len.min(MAX_PREALLOC));
    reader.by_ref().take(body_len as u64).read_to_end(&mut data)?;
    if data.len() < body_len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "truncated packet body",
        ));
    }

    if flags & REPLY_FLAG != 0 {
        Ok(Some(Packet::Reply(ReplyPacket {
            id,
            error_code: u16::from_be_bytes([header[9], header[10]]),
            data,
        })))
    } else {
        Ok(Some(Packet::Command(CommandPacket {
            id,
            command_set: header[9],
            command: header[10],
            data,
        })))
    }
}

pub fn write_packet<W: Write>(writer: &mut W, packet: &CommandPacket) -> io::Result<()> {
    let length = u32::try_from(HEADER_LEN + packet.data.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "packet too large"))?;
    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(&length.to_be_bytes());
    header[4..8].copy_from_slice(&packet.id.to_be_bytes());
    header[8] = 0;
    header[9] = packet.command_set;
    header[10] = packet.command;
    writer.write_all(&header)?;
    writer.write_all(&packet.data)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_roundtrip() {
        let packet = CommandPacket {
            id: 7,
            command_set: 1,
            command: 9,
            data: vec![1, 2, 3],
        };
        let mut buffer = Vec::new();
        write_packet(&mut buffer, &packet).unwrap();
        assert_eq!(buffer.len(), HEADER_LEN + 3);

        let read = read_packet(&mut &buffer[..]).unwrap().unwrap();
        assert_eq!(read, Packet::Command(packet));
    }

    #[test]
    fn reply_flag_and_error_code() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&(HEADER_LEN as u32).to_be_bytes());
        raw.extend_from_slice(&3u32.to_be_bytes());
        raw.push(0x80);
        raw.extend_from_slice(&101u16.to_be_bytes());

        let read = read_packet(&mut &raw[..]).unwrap().unwrap();
        assert_eq!(
            read,
            Packet::Reply(ReplyPacket {
                id: 3,
                error_code: 101,
                data: Vec::new(),
            })
        );
    }

    #[test]
    fn clean_eof_yields_none() {
        let empty: &[u8] = &[];
        assert!(read_packet(&mut &empty[..]).unwrap().is_none());
    }

    #[test]
    fn truncated_header_is_an_error() {
        let raw = [0u8, 0, 0];
        assert!(read_packet(&mut &raw[..]).is_err());
    }

    #[test]
    fn undersized_length_is_rejected() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&4u32.to_be_bytes());
        raw.extend_from_slice(&[0u8; 7]);
        let err = read_packet(&mut &raw[..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn oversized_length_with_short_body_is_truncated() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&u32::MAX.to_be_bytes());
        raw.extend_from_slice(&[0u8; 7]);
        raw.extend_from_slice(&[1, 2]);
        let err = read_packet(&mut &raw[..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
