use zerocopy::byteorder::little_endian::U32 as U32LE;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constant::CapabilityFlags;
use super::handshake::MAX_PACKET_SIZE;

/// SSLRequest: the first 32 bytes of HandshakeResponse41, sent before the TLS handshake
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub(crate) struct SslRequest {
    client_flag: U32LE,
    max_packet_size: U32LE,
    character_set: u8,
    filler: [u8; 23],
}

/// Write SSL request packet (sent before HandshakeResponse when TLS is enabled)
pub fn write_ssl_request(out: &mut Vec<u8>, capability_flags: CapabilityFlags, charset: u8) {
    let request = SslRequest {
        client_flag: U32LE::new(capability_flags.bits()),
        max_packet_size: U32LE::new(MAX_PACKET_SIZE),
        character_set: charset,
        filler: [0; 23],
    };
    out.extend_from_slice(request.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_request_layout() {
        let mut out = Vec::new();
        write_ssl_request(&mut out, CapabilityFlags::CLIENT_SSL, 45);
        assert_eq!(out.len(), 32);
        assert_eq!(&out[..4], 0x800u32.to_le_bytes());
        assert_eq!(&out[4..8], MAX_PACKET_SIZE.to_le_bytes());
        assert_eq!(out[8], 45);
        assert!(out[9..].iter().all(|&b| b == 0));
    }
}
