use crate::constant::{CapabilityFlags, CommandByte};
use crate::error::{Error, Result};
use crate::protocol::command::ColumnDefinitionBytes;
use crate::protocol::packet::ErrPayloadBytes;
use crate::protocol::primitive::*;
use crate::protocol::r#trait::params::Params;
use crate::protocol::response::is_eof_packet;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Prepared statement OK response (zero-copy)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct PrepareOk {
    statement_id: U32LE,
    num_columns: U16LE,
    num_params: U16LE,
    _reserved: u8,
    warning_count: U16LE,
}

impl PrepareOk {
    pub fn statement_id(&self) -> u32 {
        self.statement_id.get()
    }

    /// Number of columns in the result set, 0 for statements without one
    pub fn num_columns(&self) -> u16 {
        self.num_columns.get()
    }

    pub fn num_params(&self) -> u16 {
        self.num_params.get()
    }

    pub fn warning_count(&self) -> u16 {
        self.warning_count.get()
    }
}

/// Write COM_STMT_PREPARE command
pub fn write_prepare(out: &mut Vec<u8>, sql: &str) {
    write_int_1(out, CommandByte::StmtPrepare as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// Read COM_STMT_PREPARE response
pub fn read_prepare_ok(payload: &[u8]) -> Result<&PrepareOk> {
    match read_int_1(payload)? {
        (0x00, data) => PrepareOk::ref_from_prefix(data)
            .map(|(ok, _rest)| ok)
            .map_err(|_e| Error::UnexpectedEof),
        (0xFF, _) => Err(ErrPayloadBytes(payload).into()),
        _ => Err(Error::InvalidPacket),
    }
}

/// Write COM_STMT_EXECUTE command
///
/// Types are always sent (new-params-bound-flag = 1), so a statement can be executed with
/// parameters of different types each time.
pub fn write_execute<P: Params>(out: &mut Vec<u8>, statement_id: u32, params: P) -> Result<()> {
    write_int_1(out, CommandByte::StmtExecute as u8);
    write_int_4(out, statement_id);

    // CURSOR_TYPE_NO_CURSOR
    write_int_1(out, 0x00);
    // iteration count
    write_int_4(out, 1);

    if !params.is_empty() {
        params.write_null_bitmap(out);
        write_int_1(out, 0x01);
        params.write_types(out);
        params.write_values(out)?;
    }
    Ok(())
}

/// Write COM_STMT_CLOSE command
pub fn write_close_statement(out: &mut Vec<u8>, statement_id: u32) {
    write_int_1(out, CommandByte::StmtClose as u8);
    write_int_4(out, statement_id);
}

/// Write COM_STMT_RESET command
pub fn write_reset_statement(out: &mut Vec<u8>, statement_id: u32) {
    write_int_1(out, CommandByte::StmtReset as u8);
    write_int_4(out, statement_id);
}

// ============================================================================
// State Machine API for COM_STMT_PREPARE
// ============================================================================

/// Events produced while reading a COM_STMT_PREPARE response
#[derive(Debug)]
pub enum PrepareEvent<'a> {
    /// The statement was prepared
    Prepared(PrepareOk),
    /// Definition of one `?` placeholder
    Param(ColumnDefinitionBytes<'a>),
    /// Definition of one result set column
    Column(ColumnDefinitionBytes<'a>),
    /// The EOF packet that closes a definition block
    BlockEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrepareState {
    Start,
    ReadingParams { remaining: usize },
    ReadingParamsEof,
    ReadingColumns { remaining: usize },
    ReadingColumnsEof,
    Finished,
}

/// State machine for the response to COM_STMT_PREPARE
#[derive(Debug)]
pub struct Prepare {
    state: PrepareState,
    deprecate_eof: bool,
    num_columns: usize,
}

impl Prepare {
    pub fn new(capabilities: CapabilityFlags) -> Self {
        Self {
            state: PrepareState::Start,
            deprecate_eof: capabilities.contains(CapabilityFlags::CLIENT_DEPRECATE_EOF),
            num_columns: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == PrepareState::Finished
    }

    /// The state after the parameter block
    fn after_params(&self) -> PrepareState {
        if self.num_columns > 0 {
            PrepareState::ReadingColumns {
                remaining: self.num_columns,
            }
        } else {
            PrepareState::Finished
        }
    }

    /// Drive the state machine with the next payload
    pub fn drive<'a>(&mut self, payload: &'a [u8]) -> Result<PrepareEvent<'a>> {
        match self.state {
            PrepareState::Start => {
                let ok = *read_prepare_ok(payload)?;
                self.num_columns = usize::from(ok.num_columns());
                let num_params = usize::from(ok.num_params());
                self.state = if num_params > 0 {
                    PrepareState::ReadingParams {
                        remaining: num_params,
                    }
                } else {
                    self.after_params()
                };
                Ok(PrepareEvent::Prepared(ok))
            }

            PrepareState::ReadingParams { remaining } => {
                self.state = match (remaining - 1, self.deprecate_eof) {
                    (0, true) => self.after_params(),
                    (0, false) => PrepareState::ReadingParamsEof,
                    (remaining, _) => PrepareState::ReadingParams { remaining },
                };
                Ok(PrepareEvent::Param(ColumnDefinitionBytes(payload)))
            }

            PrepareState::ReadingColumns { remaining } => {
                self.state = match (remaining - 1, self.deprecate_eof) {
                    (0, true) => PrepareState::Finished,
                    (0, false) => PrepareState::ReadingColumnsEof,
                    (remaining, _) => PrepareState::ReadingColumns { remaining },
                };
                Ok(PrepareEvent::Column(ColumnDefinitionBytes(payload)))
            }

            PrepareState::ReadingParamsEof | PrepareState::ReadingColumnsEof => {
                if !is_eof_packet(payload) {
                    return Err(Error::InvalidPacket);
                }
                self.state = if self.state == PrepareState::ReadingParamsEof {
                    self.after_params()
                } else {
                    PrepareState::Finished
                };
                Ok(PrepareEvent::BlockEnd)
            }

            PrepareState::Finished => Err(Error::SequenceError(
                "the prepare response has already been read",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::{ColumnFlags, ColumnType, ServerStatusFlags, er};
    use crate::protocol::mock;

    fn definition(name: &str) -> Vec<u8> {
        mock::column_definition_packet(
            "",
            name,
            ColumnType::MYSQL_TYPE_VAR_STRING,
            ColumnFlags::empty(),
            45,
        )
    }

    #[test]
    fn test_prepare_with_legacy_eof() {
        let mut prepare = Prepare::new(CapabilityFlags::empty());
        let PrepareEvent::Prepared(ok) = prepare.drive(&mock::prepare_ok(7, 1, 2)).unwrap() else {
            panic!("expected the prepare header");
        };
        assert_eq!(ok.statement_id(), 7);
        assert_eq!(ok.num_columns(), 1);
        assert_eq!(ok.num_params(), 2);

        let param = definition("?");
        assert!(matches!(prepare.drive(&param).unwrap(), PrepareEvent::Param(_)));
        assert!(matches!(prepare.drive(&param).unwrap(), PrepareEvent::Param(_)));
        let eof = mock::eof_packet(ServerStatusFlags::empty());
        assert!(matches!(prepare.drive(&eof).unwrap(), PrepareEvent::BlockEnd));
        let column = definition("a");
        assert!(matches!(prepare.drive(&column).unwrap(), PrepareEvent::Column(_)));
        assert!(!prepare.is_finished());
        assert!(matches!(prepare.drive(&eof).unwrap(), PrepareEvent::BlockEnd));
        assert!(prepare.is_finished());
    }

    #[test]
    fn test_prepare_with_deprecate_eof() {
        let mut prepare = Prepare::new(CapabilityFlags::CLIENT_DEPRECATE_EOF);
        prepare.drive(&mock::prepare_ok(1, 1, 1)).unwrap();
        prepare.drive(&definition("?")).unwrap();
        assert!(!prepare.is_finished());
        prepare.drive(&definition("a")).unwrap();
        assert!(prepare.is_finished());
    }

    #[test]
    fn test_prepare_without_params_or_columns() {
        let mut prepare = Prepare::new(CapabilityFlags::empty());
        prepare.drive(&mock::prepare_ok(3, 0, 0)).unwrap();
        assert!(prepare.is_finished());
    }

    #[test]
    fn test_prepare_error() {
        let mut prepare = Prepare::new(CapabilityFlags::empty());
        let err = mock::err_packet(er::PARSE_ERROR, "42000", "You have an error in your SQL syntax");
        let err = prepare.drive(&err).unwrap_err();
        assert_eq!(err.server_code(), Some(er::PARSE_ERROR));
    }

    #[test]
    fn test_write_execute() {
        let mut out = Vec::new();
        write_execute(&mut out, 5, (1i32, None::<i32>)).unwrap();
        let mut expected = vec![CommandByte::StmtExecute as u8, 5, 0, 0, 0, 0, 1, 0, 0, 0];
        // NULL bitmap, new-params-bound, types
        expected.extend_from_slice(&[0b10, 1]);
        expected.extend_from_slice(&[ColumnType::MYSQL_TYPE_LONG as u8, 0]);
        expected.extend_from_slice(&[ColumnType::MYSQL_TYPE_NULL as u8, 0]);
        expected.extend_from_slice(&1i32.to_le_bytes());
        assert_eq!(out, expected);
    }

    #[test]
    fn test_write_execute_without_params() {
        let mut out = Vec::new();
        write_execute(&mut out, 9, ()).unwrap();
        assert_eq!(out, [CommandByte::StmtExecute as u8, 9, 0, 0, 0, 0, 1, 0, 0, 0]);
    }
}
