use crate::constant::{CapabilityFlags, CommandByte};
use crate::error::{Error, Result};
use crate::protocol::command::ColumnDefinitionBytes;
use crate::protocol::packet::{ErrPayloadBytes, MAX_PAYLOAD_LENGTH, OkPayloadBytes};
use crate::protocol::primitive::*;
use crate::protocol::response::{OkPayload, is_eof_packet, read_eof_packet};

/// Write COM_QUERY command
pub fn write_query(out: &mut Vec<u8>, sql: &str) {
    write_int_1(out, CommandByte::Query as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// Events produced while reading the response to COM_QUERY or COM_STMT_EXECUTE
#[derive(Debug)]
pub enum QueryEvent<'a> {
    /// The server asked for a LOCAL INFILE upload. The caller must send one empty packet and
    /// keep feeding the reply.
    LocalInfile(&'a [u8]),
    /// The statement did not produce a result set
    NoResultSet(OkPayload),
    /// A result set with `num_columns` columns begins
    ResultSetStart { num_columns: usize },
    /// One column definition. `last` is set when no further metadata packet follows.
    Column {
        definition: ColumnDefinitionBytes<'a>,
        last: bool,
    },
    /// The EOF packet that closes the column definitions (servers without DEPRECATE_EOF)
    ColumnsEnd,
    /// One row, in the text or binary encoding of the command
    Row(&'a [u8]),
    /// The result set is exhausted
    ResultSetEnd(OkPayload),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryState {
    /// Waiting for the first packet of a response
    Start,
    /// Reading column definitions
    ReadingColumns { remaining: usize },
    /// Waiting for the EOF after the column definitions
    ReadingColumnsEof,
    /// Reading rows
    ReadingRows,
    /// Waiting for the server's reply to the empty LOCAL INFILE upload
    LocalInfileReply,
    Finished,
}

/// State machine for the response to a text or binary protocol command.
///
/// One machine reads every result of a command: after a result ends with
/// `SERVER_MORE_RESULTS_EXISTS` it returns to the start state and expects the next response.
#[derive(Debug)]
pub struct Query {
    state: QueryState,
    deprecate_eof: bool,
}

impl Query {
    pub fn new(capabilities: CapabilityFlags) -> Self {
        Self {
            state: QueryState::Start,
            deprecate_eof: capabilities.contains(CapabilityFlags::CLIENT_DEPRECATE_EOF),
        }
    }

    /// Whether every packet of the command has been read
    pub fn is_finished(&self) -> bool {
        self.state == QueryState::Finished
    }

    /// Whether the next packet is a row or the end of a result set
    pub fn is_reading_rows(&self) -> bool {
        self.state == QueryState::ReadingRows
    }

    /// Whether the next packet starts another response
    pub fn is_awaiting_response(&self) -> bool {
        self.state == QueryState::Start
    }

    /// Whether the column block of the current result set is still being read
    pub fn is_reading_columns(&self) -> bool {
        matches!(
            self.state,
            QueryState::ReadingColumns { .. } | QueryState::ReadingColumnsEof
        )
    }

    fn finish_with(&mut self, ok: &OkPayload) {
        self.state = if ok.more_results_exist() {
            QueryState::Start
        } else {
            QueryState::Finished
        };
    }

    fn fail(&mut self, payload: &[u8]) -> Error {
        self.state = QueryState::Finished;
        Error::from(ErrPayloadBytes(payload))
    }

    /// Drive the state machine with the next payload
    pub fn drive<'a>(&mut self, payload: &'a [u8]) -> Result<QueryEvent<'a>> {
        match self.state {
            QueryState::Start => match payload.first() {
                None => Err(Error::InvalidPacket),
                Some(0xFF) => Err(self.fail(payload)),
                Some(0x00) => {
                    let ok = OkPayload::try_from(OkPayloadBytes(payload))?;
                    self.finish_with(&ok);
                    Ok(QueryEvent::NoResultSet(ok))
                }
                Some(0xFB) => {
                    self.state = QueryState::LocalInfileReply;
                    Ok(QueryEvent::LocalInfile(&payload[1..]))
                }
                Some(_) => {
                    let (column_count, _rest) = read_int_lenenc(payload)?;
                    let num_columns = usize::try_from(column_count)
                        .ok()
                        .filter(|&n| n > 0)
                        .ok_or(Error::InvalidPacket)?;
                    self.state = QueryState::ReadingColumns {
                        remaining: num_columns,
                    };
                    Ok(QueryEvent::ResultSetStart { num_columns })
                }
            },

            QueryState::ReadingColumns { remaining } => {
                if payload.first() == Some(&0xFF) {
                    return Err(self.fail(payload));
                }
                let remaining = remaining.checked_sub(1).ok_or(Error::InvalidPacket)?;
                let last = remaining == 0 && self.deprecate_eof;
                self.state = match (remaining, self.deprecate_eof) {
                    (0, true) => QueryState::ReadingRows,
                    (0, false) => QueryState::ReadingColumnsEof,
                    _ => QueryState::ReadingColumns { remaining },
                };
                Ok(QueryEvent::Column {
                    definition: ColumnDefinitionBytes(payload),
                    last,
                })
            }

            QueryState::ReadingColumnsEof => {
                if !is_eof_packet(payload) {
                    return Err(Error::InvalidPacket);
                }
                self.state = QueryState::ReadingRows;
                Ok(QueryEvent::ColumnsEnd)
            }

            // A text row's first cell is NULL (0xFB) or a lenenc string, which never starts with
            // 0xFF. A lenenc string starting with 0xFE is at least 2^24 bytes long, so a short
            // 0xFE packet always terminates the result set. Binary rows start with 0x00.
            QueryState::ReadingRows => match payload.first() {
                Some(0xFF) => Err(self.fail(payload)),
                Some(0xFE) if self.deprecate_eof && payload.len() < MAX_PAYLOAD_LENGTH => {
                    let ok = OkPayload::try_from(OkPayloadBytes(payload))?;
                    self.finish_with(&ok);
                    Ok(QueryEvent::ResultSetEnd(ok))
                }
                Some(0xFE) if !self.deprecate_eof && is_eof_packet(payload) => {
                    let ok = OkPayload::from_eof(read_eof_packet(payload)?);
                    self.finish_with(&ok);
                    Ok(QueryEvent::ResultSetEnd(ok))
                }
                Some(_) => Ok(QueryEvent::Row(payload)),
                None => Err(Error::InvalidPacket),
            },

            QueryState::LocalInfileReply => match payload.first() {
                Some(0xFF) => Err(self.fail(payload)),
                Some(0x00) => {
                    let ok = OkPayload::try_from(OkPayloadBytes(payload))?;
                    self.finish_with(&ok);
                    Err(Error::Unsupported(
                        "LOCAL INFILE requests are not supported".to_string(),
                    ))
                }
                _ => Err(Error::InvalidPacket),
            },

            QueryState::Finished => Err(Error::SequenceError(
                "the command response has already been read",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::{ColumnFlags, ColumnType, ServerStatusFlags, er};
    use crate::protocol::mock;

    fn col() -> Vec<u8> {
        mock::column_definition_packet(
            "t",
            "c",
            ColumnType::MYSQL_TYPE_LONG,
            ColumnFlags::empty(),
            33,
        )
    }

    #[test]
    fn test_ok_response() {
        let mut query = Query::new(CapabilityFlags::CLIENT_DEPRECATE_EOF);
        let ok = mock::ok_packet(3, 7, ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT);
        let event = query.drive(&ok).unwrap();
        let QueryEvent::NoResultSet(ok) = event else {
            panic!("unexpected event {event:?}");
        };
        assert_eq!(ok.affected_rows, 3);
        assert_eq!(ok.last_insert_id, 7);
        assert!(query.is_finished());
        assert!(matches!(query.drive(&[0x00]), Err(Error::SequenceError(_))));
    }

    #[test]
    fn test_result_set_with_deprecate_eof() {
        let mut query = Query::new(CapabilityFlags::CLIENT_DEPRECATE_EOF);
        assert!(matches!(
            query.drive(&[1]).unwrap(),
            QueryEvent::ResultSetStart { num_columns: 1 }
        ));
        let col = col();
        assert!(matches!(
            query.drive(&col).unwrap(),
            QueryEvent::Column { last: true, .. }
        ));
        assert!(query.is_reading_rows());
        assert!(matches!(query.drive(b"\x013").unwrap(), QueryEvent::Row(b"\x013")));
        let end = mock::ok_packet_with_header(0xFE, 0, 0, ServerStatusFlags::empty());
        assert!(matches!(
            query.drive(&end).unwrap(),
            QueryEvent::ResultSetEnd(_)
        ));
        assert!(query.is_finished());
    }

    #[test]
    fn test_result_set_with_legacy_eof() {
        let mut query = Query::new(CapabilityFlags::empty());
        query.drive(&[1]).unwrap();
        let col = col();
        assert!(matches!(
            query.drive(&col).unwrap(),
            QueryEvent::Column { last: false, .. }
        ));
        let eof = mock::eof_packet(ServerStatusFlags::empty());
        assert!(matches!(query.drive(&eof).unwrap(), QueryEvent::ColumnsEnd));
        assert!(matches!(query.drive(b"\xFB").unwrap(), QueryEvent::Row(_)));
        let more = mock::eof_packet(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS);
        let QueryEvent::ResultSetEnd(ok) = query.drive(&more).unwrap() else {
            panic!("expected the end of the result set");
        };
        assert!(ok.more_results_exist());
        assert!(query.is_awaiting_response());

        let ok = mock::ok_packet(0, 0, ServerStatusFlags::empty());
        assert!(matches!(
            query.drive(&ok).unwrap(),
            QueryEvent::NoResultSet(_)
        ));
        assert!(query.is_finished());
    }

    #[test]
    fn test_error_response_keeps_code() {
        let mut query = Query::new(CapabilityFlags::CLIENT_DEPRECATE_EOF);
        let err = mock::err_packet(er::NO_SUCH_TABLE, "42S02", "Table 'x' doesn't exist");
        let err = query.drive(&err).unwrap_err();
        assert_eq!(err.server_code(), Some(er::NO_SUCH_TABLE));
        assert_eq!(err.sql_state(), Some("42S02"));
        assert!(!err.is_fatal());
        assert!(query.is_finished());
    }

    #[test]
    fn test_error_in_row_stream() {
        let mut query = Query::new(CapabilityFlags::CLIENT_DEPRECATE_EOF);
        query.drive(&[1]).unwrap();
        query.drive(&col()).unwrap();
        let err = mock::err_packet(er::QUERY_INTERRUPTED, "70100", "Query execution was interrupted");
        assert_eq!(
            query.drive(&err).unwrap_err().server_code(),
            Some(er::QUERY_INTERRUPTED)
        );
        assert!(query.is_finished());
    }

    #[test]
    fn test_local_infile_is_refused() {
        let mut query = Query::new(CapabilityFlags::CLIENT_DEPRECATE_EOF);
        let QueryEvent::LocalInfile(name) = query.drive(b"\xFB/etc/passwd").unwrap() else {
            panic!("expected a LOCAL INFILE request");
        };
        assert_eq!(name, b"/etc/passwd");
        let ok = mock::ok_packet(0, 0, ServerStatusFlags::empty());
        assert!(matches!(query.drive(&ok), Err(Error::Unsupported(_))));
        assert!(query.is_finished());
    }

    #[test]
    fn test_zero_column_count_is_invalid() {
        let mut query = Query::new(CapabilityFlags::CLIENT_DEPRECATE_EOF);
        assert!(matches!(query.drive(&[0xFC, 0, 0]), Err(Error::InvalidPacket)));
        assert!(!query.is_reading_columns());
    }
}
