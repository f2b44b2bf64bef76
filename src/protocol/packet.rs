use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// The largest payload a single frame can carry. A payload of this exact length is always
/// followed by another frame, possibly empty.
pub const MAX_PAYLOAD_LENGTH: usize = 0xFF_FFFF;

/// MySQL packet header (zero-copy)
///
/// Layout matches MySQL wire protocol:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence_id: u8,
}

impl PacketHeader {
    pub fn encode(length: usize, sequence_id: u8) -> Self {
        let len = u32::to_le_bytes(length as u32);
        Self {
            length: [len[0], len[1], len[2]],
            sequence_id,
        }
    }

    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(header, _rest)| header)
            .map_err(|_e| Error::UnexpectedEof)
    }

    /// Check the sequence id against the expected one and advance the counter
    pub fn check_sequence(&self, expected: &mut u8) -> Result<()> {
        if self.sequence_id != *expected {
            return Err(Error::PacketOutOfOrder {
                expected: *expected,
                got: self.sequence_id,
            });
        }
        *expected = expected.wrapping_add(1);
        Ok(())
    }
}

/// Split a logical payload into frames, assigning consecutive sequence ids.
///
/// A payload whose length is a multiple of [`MAX_PAYLOAD_LENGTH`] (including the empty payload
/// of zero-length commands) ends with an empty frame.
pub fn split_frames<'a>(payload: &'a [u8], sequence_id: &mut u8) -> Vec<(PacketHeader, &'a [u8])> {
    let mut frames = Vec::with_capacity(payload.len() / MAX_PAYLOAD_LENGTH + 1);
    let mut remaining = payload;
    loop {
        let chunk_size = remaining.len().min(MAX_PAYLOAD_LENGTH);
        let (chunk, rest) = remaining.split_at(chunk_size);
        frames.push((PacketHeader::encode(chunk_size, *sequence_id), chunk));
        *sequence_id = sequence_id.wrapping_add(1);
        remaining = rest;
        if chunk_size < MAX_PAYLOAD_LENGTH {
            return frames;
        }
    }
}

/// OK packet payload
///
/// Layout: 0x00 (or 0xFE when terminating a result set) followed by variable-length fields:
/// - affected_rows: length-encoded integer
/// - last_insert_id: length-encoded integer
/// - status_flags: 2 bytes
/// - warnings: 2 bytes
/// - info: variable-length string
#[derive(Debug, Clone, Copy)]
pub struct OkPayloadBytes<'a>(pub &'a [u8]);

impl<'a> OkPayloadBytes<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ErrPayloadBytes<'a>(pub &'a [u8]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = PacketHeader::encode(0x123456, 7);
        let bytes = header.as_bytes();
        assert_eq!(bytes, [0x56, 0x34, 0x12, 7]);
        let parsed = PacketHeader::from_bytes(bytes).unwrap();
        assert_eq!(parsed.length(), 0x123456);
        assert_eq!(parsed.sequence_id, 7);
    }

    #[test]
    fn test_check_sequence_wraps() {
        let header = PacketHeader::encode(0, 255);
        let mut expected = 255;
        header.check_sequence(&mut expected).unwrap();
        assert_eq!(expected, 0);
    }

    #[test]
    fn test_check_sequence_mismatch() {
        let header = PacketHeader::encode(0, 3);
        let mut expected = 1;
        let err = header.check_sequence(&mut expected).unwrap_err();
        assert!(matches!(
            err,
            Error::PacketOutOfOrder {
                expected: 1,
                got: 3
            }
        ));
    }

    #[test]
    fn test_split_small_payload() {
        let mut seq = 0;
        let frames = split_frames(b"\x0e", &mut seq);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0.length(), 1);
        assert_eq!(seq, 1);
    }

    #[test]
    fn test_split_large_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_LENGTH + 10];
        let mut seq = 254;
        let frames = split_frames(&payload, &mut seq);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0.length(), MAX_PAYLOAD_LENGTH);
        assert_eq!(frames[0].0.sequence_id, 254);
        assert_eq!(frames[1].0.length(), 10);
        assert_eq!(frames[1].0.sequence_id, 255);
        assert_eq!(seq, 0);
    }

    #[test]
    fn test_split_exact_multiple_adds_empty_frame() {
        let payload = vec![0u8; MAX_PAYLOAD_LENGTH];
        let mut seq = 0;
        let frames = split_frames(&payload, &mut seq);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].0.length(), 0);
        assert_eq!(seq, 2);
    }
}
