//! JDWP transport: handshake, reply demultiplexing, ordered event channel.
//!
//! One reader thread owns the socket's read half. Replies are routed back to
//! the caller waiting on the matching packet id; `Event.Composite` packets
//! are forwarded, in arrival order, over a single channel that the session
//! drains. All other state stays on the caller's thread.

use std::io::{BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::codec::{PacketReader, PacketWriter};
use crate::commands::{command_sets, event_commands, vm_commands};
use crate::error::{WireError, WireResult};
use crate::events::{decode_composite, EventSet};
use crate::packet::{read_packet, write_packet, CommandPacket, Packet, ReplyPacket};
use crate::types::IdSizes;

const HANDSHAKE: &[u8] = b"JDWP-Handshake";

#[derive(Debug)]
enum Incoming {
    Composite(Vec<u8>),
    Closed,
}

#[derive(Debug, Default)]
struct PendingReplies {
    closed: bool,
    waiters: FxHashMap<u32, Sender<ReplyPacket>>,
}

/// A live JDWP connection to a target VM.
#[derive(Debug)]
pub struct JdwpConnection {
    stream: TcpStream,
    writer: Mutex<BufWriter<TcpStream>>,
    pending: Arc<Mutex<PendingReplies>>,
    next_id: AtomicU32,
    events: Receiver<Incoming>,
    sizes: IdSizes,
    reader: Option<JoinHandle<()>>,
}

impl JdwpConnection {
    /// Connect to a VM listening on `addr` (attach).
    pub fn connect(addr: SocketAddr, timeout: Duration) -> WireResult<Self> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        Self::from_stream(stream)
    }

    /// Wrap an already-connected socket (launch: the VM dialed in).
    pub fn from_stream(stream: TcpStream) -> WireResult<Self> {
        stream.set_nodelay(true)?;
        handshake(&stream)?;

        let pending = Arc::new(Mutex::new(PendingReplies::default()));
        let (events_tx, events_rx) = unbounded();
        let read_half = stream.try_clone()?;
        let reader_pending = Arc::clone(&pending);
        let reader = thread::Builder::new()
            .name("jdwp-reader".to_string())
            .spawn(move || reader_loop(read_half, &reader_pending, &events_tx))?;

        let mut connection = Self {
            writer: Mutex::new(BufWriter::new(stream.try_clone()?)),
            stream,
            pending,
            next_id: AtomicU32::new(1),
            events: events_rx,
            sizes: IdSizes::default(),
            reader: Some(reader),
        };
        connection.sizes = connection.id_sizes()?;
        debug!(sizes = ?connection.sizes, "jdwp connection established");
        Ok(connection)
    }

    #[must_use]
    pub fn sizes(&self) -> IdSizes {
        self.sizes
    }

    pub(crate) fn writer(&self) -> PacketWriter {
        PacketWriter::new(self.sizes)
    }

    pub(crate) fn reader<'a>(&self, data: &'a [u8]) -> PacketReader<'a> {
        PacketReader::new(data, self.sizes)
    }

    /// Send a command and block for its reply body.
    pub fn command(&self, command_set: u8, command: u8, data: Vec<u8>) -> WireResult<Vec<u8>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = bounded(1);
        {
            let mut pending = self.pending.lock();
            if pending.closed {
                return Err(WireError::Closed);
            }
            pending.waiters.insert(id, reply_tx);
        }

        let packet = CommandPacket {
            id,
            command_set,
            command,
            data,
        };
        trace!(id, command_set, command, "jdwp ->");
        let written = {
            let mut writer = self.writer.lock();
            write_packet(&mut *writer, &packet)
        };
        if let Err(err) = written {
            self.pending.lock().waiters.remove(&id);
            return Err(err.into());
        }

        let reply = reply_rx.recv().map_err(|_| WireError::Closed)?;
        trace!(id, error = reply.error_code, "jdwp <-");
        if reply.error_code != 0 {
            return Err(WireError::Jdwp {
                code: reply.error_code,
                command_set,
                command,
            });
        }
        Ok(reply.data)
    }

    /// Block for the next composite event; `None` once the VM is gone.
    pub fn recv_event(&self) -> WireResult<Option<EventSet>> {
        match self.events.recv() {
            Ok(Incoming::Composite(data)) => decode_composite(&data, self.sizes).map(Some),
            Ok(Incoming::Closed) | Err(_) => Ok(None),
        }
    }

    /// Release the VM (`VirtualMachine.Dispose`) and close the socket.
    ///
    /// Failures are ignored: the VM may already be gone.
    pub fn dispose(&mut self) {
        if let Err(err) = self.command(
            command_sets::VIRTUAL_MACHINE,
            vm_commands::DISPOSE,
            Vec::new(),
        ) {
            debug!("dispose ignored: {err}");
        }
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for JdwpConnection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn handshake(stream: &TcpStream) -> WireResult<()> {
    let mut stream = stream;
    stream.write_all(HANDSHAKE)?;
    stream.flush()?;
    let mut reply = [0u8; HANDSHAKE.len()];
    stream
        .read_exact(&mut reply)
        .map_err(|err| WireError::Handshake(err.to_string()))?;
    if reply != HANDSHAKE {
        return Err(WireError::Handshake(format!(
            "unexpected reply {:?}",
            String::from_utf8_lossy(&reply)
        )));
    }
    Ok(())
}

fn reader_loop(
    stream: TcpStream,
    pending: &Mutex<PendingReplies>,
    events: &Sender<Incoming>,
) {
    let mut reader = BufReader::new(stream);
    loop {
        match read_packet(&mut reader) {
            Ok(Some(Packet::Reply(reply))) => {
                let waiter = pending.lock().waiters.remove(&reply.id);
                match waiter {
                    Some(waiter) => {
                        let _ = waiter.send(reply);
                    }
                    None => debug!(id = reply.id, "reply without waiter"),
                }
            }
            Ok(Some(Packet::Command(command))) => {
                if command.command_set == command_sets::EVENT
                    && command.command == event_commands::COMPOSITE
                {
                    if events.send(Incoming::Composite(command.data)).is_err() {
                        break;
                    }
                } else {
                    debug!(
                        command_set = command.command_set,
                        command = command.command,
                        "ignoring VM command"
                    );
                }
            }
            Ok(None) => {
                debug!("jdwp stream closed");
                break;
            }
            Err(err) => {
                debug!("jdwp read failed: {err}");
                break;
            }
        }
    }
    {
        let mut pending = pending.lock();
        pending.closed = true;
        pending.waiters.clear();
    }
    let _ = events.send(Incoming::Closed);
}
