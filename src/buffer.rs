use zerocopy::IntoBytes;

use crate::protocol::packet::{MAX_PAYLOAD_LENGTH, PacketHeader, split_frames};

/// A set of reusable buffers for MySQL protocol communication
///
/// `Conn` uses a single `BufferSet` for all its operations.
#[derive(Debug)]
pub struct BufferSet {
    /// Payload of the server's initial handshake. Bytes are valid during Conn.
    pub initial_handshake: Vec<u8>,

    /// Payload of the last packet read, with multi-frame packets already joined.
    /// Bytes are valid until the next read.
    pub read_buffer: Vec<u8>,

    /// General-purpose write buffer
    /// It always has at least 4 bytes which is reserved for the first packet header.
    /// Layout: [4-byte header space][payload that is possibly larger than 16MB]
    write_buffer: Vec<u8>,

    /// Frames of a payload that did not fit in one packet, headers interleaved
    split_buffer: Vec<u8>,
}

impl BufferSet {
    pub fn new() -> Self {
        Self {
            initial_handshake: Vec::new(),
            read_buffer: Vec::new(),
            write_buffer: vec![0; 4],
            split_buffer: Vec::new(),
        }
    }

    /// Clear the write buffer, reserve 4 bytes for the header, and return mutable access.
    #[inline]
    pub fn new_write_buffer(&mut self) -> &mut Vec<u8> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(&[0u8; 4]);
        &mut self.write_buffer
    }

    /// The payload written since the last [`BufferSet::new_write_buffer`]
    #[inline]
    pub fn payload(&self) -> &[u8] {
        self.write_buffer.get(4..).unwrap_or_default()
    }

    #[inline]
    pub fn payload_len(&self) -> usize {
        self.write_buffer.len().saturating_sub(4)
    }

    /// Frame the payload for the wire, advancing `sequence_id` once per frame.
    ///
    /// A payload that fits in one frame gets its header written into the reserved space, so
    /// no copy is made. Larger payloads are split into `split_buffer`.
    pub fn frames(&mut self, sequence_id: &mut u8) -> &[u8] {
        let payload_len = self.payload_len();
        if payload_len < MAX_PAYLOAD_LENGTH {
            let header = PacketHeader::encode(payload_len, *sequence_id);
            *sequence_id = sequence_id.wrapping_add(1);
            self.write_buffer[..4].copy_from_slice(header.as_bytes());
            return &self.write_buffer;
        }

        self.split_buffer.clear();
        let payload = &self.write_buffer[4..];
        for (header, chunk) in split_frames(payload, sequence_id) {
            self.split_buffer.extend_from_slice(header.as_bytes());
            self.split_buffer.extend_from_slice(chunk);
        }
        &self.split_buffer
    }
}

impl Default for BufferSet {
    fn default() -> Self {
        Self::new()
    }
}
