use crate::constant::ServerStatusFlags;
use crate::error::{Error, Result};
use crate::protocol::packet::{ErrPayloadBytes, OkPayloadBytes};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::U16 as U16LE;
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// OK packet response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: ServerStatusFlags,
    pub warnings: u16,
    pub info: String,
}

impl OkPayload {
    /// Build from a legacy EOF packet, which only carries warnings and status flags
    pub fn from_eof(eof: &EofPacket) -> Self {
        Self {
            affected_rows: 0,
            last_insert_id: 0,
            status_flags: eof.status_flags(),
            warnings: eof.warnings.get(),
            info: String::new(),
        }
    }

    pub fn more_results_exist(&self) -> bool {
        self.status_flags
            .contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS)
    }
}

impl TryFrom<OkPayloadBytes<'_>> for OkPayload {
    type Error = Error;

    fn try_from(bytes: OkPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.bytes())?;
        if header != 0x00 && header != 0xFE {
            return Err(Error::InvalidPacket);
        }

        let (affected_rows, rest) = read_int_lenenc(data)?;
        let (last_insert_id, rest) = read_int_lenenc(rest)?;
        let (status_flags, rest) = read_int_2(rest)?;
        // Pre-4.1 servers may stop after the status flags
        let (warnings, rest) = if rest.len() >= 2 {
            read_int_2(rest)?
        } else {
            (0, rest)
        };

        // With CLIENT_SESSION_TRACK the info is lenenc, otherwise it is the rest of the packet.
        // We never negotiate session tracking.
        let info = String::from_utf8_lossy(rest).into_owned();

        Ok(OkPayload {
            affected_rows,
            last_insert_id,
            status_flags: ServerStatusFlags::from_bits_truncate(status_flags),
            warnings,
            info,
        })
    }
}

/// ERR packet response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ERROR {} ({}): {}", self.error_code, self.sql_state, self.message)]
pub struct ErrPayload {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl TryFrom<ErrPayloadBytes<'_>> for ErrPayload {
    type Error = Error;

    fn try_from(bytes: ErrPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != 0xFF {
            return Err(Error::InvalidPacket);
        }

        let (error_code, data) = read_int_2(data)?;

        // SQL state marker '#' is absent before 4.1 and in errors sent during the handshake
        // by some servers
        let (sql_state, rest) = match data.split_first() {
            Some((b'#', rest)) => {
                let (state_bytes, rest) = read_string_fix(rest, 5)?;
                (String::from_utf8_lossy(state_bytes).into_owned(), rest)
            }
            _ => (String::new(), data),
        };

        let message = String::from_utf8_lossy(rest).into_owned();

        Ok(ErrPayload {
            error_code,
            sql_state,
            message,
        })
    }
}

/// EOF packet response (zero-copy)
///
/// Layout matches MySQL wire protocol after header byte 0xFE:
/// - warnings: 2 bytes (little-endian)
/// - status_flags: 2 bytes (little-endian)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct EofPacket {
    pub warnings: U16LE,
    pub status_flags: U16LE,
}

impl EofPacket {
    pub fn status_flags(&self) -> ServerStatusFlags {
        ServerStatusFlags::from_bits_truncate(self.status_flags.get())
    }
}

/// Whether a packet is an EOF packet: header 0xFE and shorter than 9 bytes.
///
/// Longer 0xFE packets are length-encoded integers (8-byte form) or auth switch requests.
pub fn is_eof_packet(payload: &[u8]) -> bool {
    payload.first() == Some(&0xFE) && payload.len() < 9
}

/// Read EOF packet (header byte 0xFE, length < 9) - zero-copy
pub fn read_eof_packet(payload: &[u8]) -> Result<&EofPacket> {
    let (header, data) = read_int_1(payload)?;
    if header != 0xFE {
        return Err(Error::InvalidPacket);
    }

    EofPacket::ref_from_prefix(data)
        .map(|(eof, _rest)| eof)
        .map_err(|_e| Error::UnexpectedEof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_ok_packet() {
        // affected_rows=1, last_insert_id=5, status=AUTOCOMMIT|MORE_RESULTS, warnings=2, info
        let payload = [0x00, 0x01, 0x05, 0x0A, 0x00, 0x02, 0x00, b'h', b'i'];
        let ok = OkPayload::try_from(OkPayloadBytes(&payload)).unwrap();
        assert_eq!(
            ok,
            OkPayload {
                affected_rows: 1,
                last_insert_id: 5,
                status_flags: ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT
                    | ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS,
                warnings: 2,
                info: "hi".to_string(),
            }
        );
        assert!(ok.more_results_exist());
    }

    #[test]
    fn test_parse_err_packet() {
        let mut payload = vec![0xFF, 0x7A, 0x04, b'#'];
        payload.extend_from_slice(b"42S02");
        payload.extend_from_slice(b"Table 'test.some_non_existent_table' doesn't exist");
        let err = ErrPayload::try_from(ErrPayloadBytes(&payload)).unwrap();
        assert_eq!(err.error_code, 1146);
        assert_eq!(err.sql_state, "42S02");
        assert_eq!(
            err.message,
            "Table 'test.some_non_existent_table' doesn't exist"
        );
    }

    #[test]
    fn test_parse_err_packet_without_state() {
        let payload = [0xFF, 0x10, 0x04, b'T', b'o', b'o'];
        let err = ErrPayload::try_from(ErrPayloadBytes(&payload)).unwrap();
        assert_eq!(err.error_code, 1040);
        assert_eq!(err.sql_state, "");
        assert_eq!(err.message, "Too");
    }

    #[test]
    fn test_eof_packet() {
        let payload = [0xFE, 0x00, 0x00, 0x22, 0x00];
        assert!(is_eof_packet(&payload));
        let eof = read_eof_packet(&payload).unwrap();
        let ok = OkPayload::from_eof(eof);
        assert_eq!(
            ok.status_flags,
            ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT
                | ServerStatusFlags::SERVER_STATUS_NO_INDEX_USED
        );
        assert!(!ok.more_results_exist());
    }
}
