//! Builders for server packets and a scripted in-memory stream, used by unit tests.

use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use crate::constant::{CapabilityFlags, ColumnFlags, ColumnType, ServerStatusFlags};
use crate::protocol::packet::PacketHeader;
use crate::protocol::primitive::*;
use zerocopy::IntoBytes;

pub fn column_definition_packet(
    table: &str,
    name: &str,
    column_type: ColumnType,
    flags: ColumnFlags,
    charset: u16,
) -> Vec<u8> {
    let mut out = Vec::new();
    for field in ["def", "test", table, table, name, name] {
        write_bytes_lenenc(&mut out, field.as_bytes());
    }
    write_int_1(&mut out, 0x0c);
    write_int_2(&mut out, charset);
    write_int_4(&mut out, 11);
    write_int_1(&mut out, column_type as u8);
    write_int_2(&mut out, flags.bits());
    write_int_1(&mut out, 0);
    write_int_2(&mut out, 0);
    out
}

pub fn ok_packet_with_header(
    header: u8,
    affected_rows: u64,
    last_insert_id: u64,
    status_flags: ServerStatusFlags,
) -> Vec<u8> {
    let mut out = vec![header];
    write_int_lenenc(&mut out, affected_rows);
    write_int_lenenc(&mut out, last_insert_id);
    write_int_2(&mut out, status_flags.bits());
    write_int_2(&mut out, 0);
    out
}

pub fn ok_packet(affected_rows: u64, last_insert_id: u64, status_flags: ServerStatusFlags) -> Vec<u8> {
    ok_packet_with_header(0x00, affected_rows, last_insert_id, status_flags)
}

pub fn err_packet(error_code: u16, sql_state: &str, message: &str) -> Vec<u8> {
    let mut out = vec![0xFF];
    write_int_2(&mut out, error_code);
    out.push(b'#');
    out.extend_from_slice(sql_state.as_bytes());
    out.extend_from_slice(message.as_bytes());
    out
}

pub fn eof_packet(status_flags: ServerStatusFlags) -> Vec<u8> {
    let mut out = vec![0xFE];
    write_int_2(&mut out, 0);
    write_int_2(&mut out, status_flags.bits());
    out
}

/// HandshakeV10 with connection id 42 that advertises every capability
pub fn initial_handshake(server_version: &str, plugin: &str, scramble: &[u8]) -> Vec<u8> {
    let caps = CapabilityFlags::all().bits();
    let mut out = vec![10];
    write_string_null(&mut out, server_version);
    write_int_4(&mut out, 42);
    out.extend_from_slice(&scramble[..8]);
    write_int_1(&mut out, 0);
    write_int_2(&mut out, caps as u16);
    write_int_1(&mut out, 45);
    write_int_2(&mut out, ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT.bits());
    write_int_2(&mut out, (caps >> 16) as u16);
    write_int_1(&mut out, 21);
    out.extend_from_slice(&[0; 10]);
    out.extend_from_slice(&scramble[8..20]);
    write_int_1(&mut out, 0);
    write_string_null(&mut out, plugin);
    out
}

pub fn prepare_ok(statement_id: u32, num_columns: u16, num_params: u16) -> Vec<u8> {
    let mut out = vec![0x00];
    write_int_4(&mut out, statement_id);
    write_int_2(&mut out, num_columns);
    write_int_2(&mut out, num_params);
    write_int_1(&mut out, 0);
    write_int_2(&mut out, 0);
    out
}

/// Text protocol row; `None` cells are NULL
pub fn text_row(cells: &[Option<&[u8]>]) -> Vec<u8> {
    let mut out = Vec::new();
    for cell in cells {
        match cell {
            Some(bytes) => write_bytes_lenenc(&mut out, bytes),
            None => out.push(0xFB),
        }
    }
    out
}

/// Route the crate's `tracing` output to the test harness. Later calls are no-ops.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init()
        .unwrap_or_default();
}

/// Server side of a conversation, as the bytes the client will read
#[derive(Debug, Default, Clone)]
pub struct Script {
    bytes: Vec<u8>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Greeting and auth OK for a `mysql_native_password` login
    pub fn login() -> Self {
        Self::new()
            .packet(
                0,
                &initial_handshake("8.0.36", "mysql_native_password", b"abcdefghijklmnopqrst"),
            )
            .packet(2, &ok_packet(0, 0, ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT))
    }

    pub fn packet(mut self, sequence_id: u8, payload: &[u8]) -> Self {
        self.bytes
            .extend_from_slice(PacketHeader::encode(payload.len(), sequence_id).as_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    /// Append raw bytes, for malformed input
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Packets with consecutive sequence ids starting at `first_sequence_id`
    pub fn packets(mut self, first_sequence_id: u8, payloads: &[Vec<u8>]) -> Self {
        let mut sequence_id = first_sequence_id;
        for payload in payloads {
            self = self.packet(sequence_id, payload);
            sequence_id = sequence_id.wrapping_add(1);
        }
        self
    }

    pub fn into_stream(self) -> ScriptedStream {
        ScriptedStream {
            input: Cursor::new(self.bytes),
            written: Arc::default(),
        }
    }
}

/// In-memory stream that replays a [`Script`] and records what the client writes
#[derive(Debug)]
pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedStream {
    /// Handle to the bytes written by the client, shared with the stream
    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written)
    }
}

/// Split recorded client bytes into `(sequence_id, payload)` packets
pub fn client_packets(written: &Mutex<Vec<u8>>) -> Vec<(u8, Vec<u8>)> {
    let written = written.lock().unwrap();
    let mut packets = Vec::new();
    let mut rest = written.as_slice();
    while !rest.is_empty() {
        let header = PacketHeader::from_bytes(rest).unwrap();
        let length = header.length();
        packets.push((header.sequence_id, rest[4..4 + length].to_vec()));
        rest = &rest[4 + length..];
    }
    packets
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(feature = "tokio")]
mod async_io {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

    use super::ScriptedStream;

    impl AsyncRead for ScriptedStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let this = self.get_mut();
            let n = std::io::Read::read(&mut this.input, buf.initialize_unfilled())?;
            buf.advance(n);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for ScriptedStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            self.get_mut().written.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }
}
