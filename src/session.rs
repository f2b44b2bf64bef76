//! Connection state shared by the blocking and async drivers.
//!
//! The drivers only move bytes. Everything that depends on what those bytes mean (the
//! sequence counter, the pending response, column metadata and server status) lives here.

use std::sync::Arc;

use crate::buffer::BufferSet;
use crate::col::Column;
use crate::constant::{CapabilityFlags, ServerStatusFlags};
use crate::error::{Error, Result};
use crate::literal::literal;
use crate::protocol::command::query::{Query, QueryEvent};
use crate::protocol::connection::InitialHandshake;
use crate::protocol::packet::{ErrPayloadBytes, OkPayloadBytes};
use crate::protocol::response::OkPayload;
use crate::protocol::{
    BinaryResultSetHandler, BinaryRowPayload, TextResultSetHandler, TextRowPayload,
};
use crate::row::Row;
use crate::value::Value;

/// The first part of a command's response
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The command succeeded without a result set
    Ok(OkPayload),
    /// A result set follows. Rows are read with `next_row()`.
    ResultSet { columns: Arc<[Column]> },
}

impl Response {
    pub fn columns(&self) -> Option<&[Column]> {
        match self {
            Response::Ok(_) => None,
            Response::ResultSet { columns } => Some(columns),
        }
    }

    pub fn ok(&self) -> Option<&OkPayload> {
        match self {
            Response::Ok(ok) => Some(ok),
            Response::ResultSet { .. } => None,
        }
    }
}

/// Row encoding of the pending command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Protocol {
    Text,
    Binary,
}

/// What the driver must do after feeding one packet to the session
#[derive(Debug)]
pub(crate) enum Step {
    /// Read another packet
    NeedPacket,
    /// Send one empty packet to refuse a LOCAL INFILE request, then read the reply
    WriteEmpty,
    /// The header of a response is complete
    Response(Response),
    /// A row is in the read buffer; decode it with [`Session::decode_row`]
    Row,
    /// The current result set is exhausted
    End(OkPayload),
}

#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) buffer_set: BufferSet,
    pub(crate) sequence_id: u8,
    initial_handshake: InitialHandshake,
    capability_flags: CapabilityFlags,
    status_flags: ServerStatusFlags,
    query: Option<Query>,
    protocol: Protocol,
    building: Vec<Column>,
    columns: Option<Arc<[Column]>>,
    current: Option<Response>,
    last_ok: Option<OkPayload>,
    broken: bool,
}

impl Session {
    pub(crate) fn new(
        buffer_set: BufferSet,
        initial_handshake: InitialHandshake,
        capability_flags: CapabilityFlags,
        status_flags: ServerStatusFlags,
    ) -> Self {
        Self {
            buffer_set,
            sequence_id: 0,
            initial_handshake,
            capability_flags,
            status_flags,
            query: None,
            protocol: Protocol::Text,
            building: Vec::new(),
            columns: None,
            current: None,
            last_ok: None,
            broken: false,
        }
    }

    pub(crate) fn server_version(&self) -> &str {
        &self.initial_handshake.server_version
    }

    pub(crate) fn connection_id(&self) -> u32 {
        self.initial_handshake.connection_id
    }

    pub(crate) fn capability_flags(&self) -> CapabilityFlags {
        self.capability_flags
    }

    pub(crate) fn status_flags(&self) -> ServerStatusFlags {
        self.status_flags
    }

    pub(crate) fn no_backslash_escapes(&self) -> bool {
        self.status_flags
            .contains(ServerStatusFlags::SERVER_STATUS_NO_BACKSLASH_ESCAPES)
    }

    pub(crate) fn literal(&self, value: &Value) -> Result<String> {
        literal(value, self.no_backslash_escapes())
    }

    pub(crate) fn current(&self) -> Option<&Response> {
        self.current.as_ref()
    }

    pub(crate) fn last_ok(&self) -> Option<&OkPayload> {
        self.last_ok.as_ref()
    }

    pub(crate) fn columns(&self) -> Option<&Arc<[Column]>> {
        self.columns.as_ref()
    }

    pub(crate) fn is_broken(&self) -> bool {
        self.broken
    }

    /// Fail fast once a fatal error has been seen
    pub(crate) fn check(&self) -> Result<()> {
        if self.broken {
            Err(Error::ConnectionBroken)
        } else {
            Ok(())
        }
    }

    /// Mark the session broken if `result` carries a fatal error
    pub(crate) fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result
            && err.is_fatal()
        {
            self.mark_broken(err);
        }
        result
    }

    pub(crate) fn mark_broken(&mut self, reason: &dyn std::fmt::Display) {
        if !self.broken {
            tracing::warn!(connection_id = self.connection_id(), %reason, "connection marked broken");
        }
        self.broken = true;
        self.query = None;
    }

    /// The connection was closed on purpose; later commands fail without a warning
    pub(crate) fn mark_closed(&mut self) {
        self.broken = true;
        self.query = None;
    }

    /// Start a new packet sequence and return the cleared write buffer
    pub(crate) fn begin_command(&mut self) -> &mut Vec<u8> {
        self.sequence_id = 0;
        self.current = None;
        self.buffer_set.new_write_buffer()
    }

    /// Expect a text or binary protocol response to the command just written
    pub(crate) fn expect_result(&mut self, protocol: Protocol) {
        self.query = Some(Query::new(self.capability_flags));
        self.protocol = protocol;
        self.columns = None;
    }

    /// Whether any packet of a command's response is still unread
    pub(crate) fn has_pending(&self) -> bool {
        self.query.is_some()
    }

    /// Whether the next packet is a row or the end of the current result set
    pub(crate) fn in_rows(&self) -> bool {
        self.query.as_ref().is_some_and(Query::is_reading_rows)
    }

    /// Whether another response of the current command follows
    pub(crate) fn awaiting_response(&self) -> bool {
        self.query.as_ref().is_some_and(Query::is_awaiting_response)
    }

    fn record_ok(&mut self, ok: &OkPayload) {
        self.status_flags = ok.status_flags;
        self.last_ok = Some(ok.clone());
    }

    fn finish_columns(&mut self) -> Response {
        let columns: Arc<[Column]> = Arc::from(std::mem::take(&mut self.building));
        self.columns = Some(Arc::clone(&columns));
        let response = Response::ResultSet { columns };
        self.current = Some(response.clone());
        response
    }

    /// Feed the packet in the read buffer to the pending command
    pub(crate) fn step(&mut self) -> Result<Step> {
        let Some(query) = self.query.as_mut() else {
            return Err(Error::SequenceError("no command is waiting for a response"));
        };
        let event = query.drive(&self.buffer_set.read_buffer);
        if query.is_finished() {
            self.query = None;
        }

        let step = match event? {
            QueryEvent::LocalInfile(filename) => {
                tracing::warn!(
                    filename = %String::from_utf8_lossy(filename),
                    "refusing LOCAL INFILE request"
                );
                Step::WriteEmpty
            }
            QueryEvent::NoResultSet(ok) => {
                self.record_ok(&ok);
                let response = Response::Ok(ok);
                self.current = Some(response.clone());
                Step::Response(response)
            }
            QueryEvent::ResultSetStart { num_columns } => {
                self.building.clear();
                self.building.reserve(num_columns);
                Step::NeedPacket
            }
            QueryEvent::Column { definition, last } => {
                self.building.push(Column::try_from(definition)?);
                if last {
                    Step::Response(self.finish_columns())
                } else {
                    Step::NeedPacket
                }
            }
            QueryEvent::ColumnsEnd => Step::Response(self.finish_columns()),
            QueryEvent::Row(_) => Step::Row,
            QueryEvent::ResultSetEnd(ok) => {
                self.record_ok(&ok);
                Step::End(ok)
            }
        };
        Ok(step)
    }

    fn row_columns(&self) -> Result<&Arc<[Column]>> {
        self.columns
            .as_ref()
            .ok_or_else(|| Error::from_debug("row packet before column definitions"))
    }

    /// Decode the row in the read buffer with the columns of the current result set
    pub(crate) fn decode_row(&self) -> Result<Row> {
        let columns = Arc::clone(self.row_columns()?);
        let payload = self.buffer_set.read_buffer.as_slice();
        match self.protocol {
            Protocol::Text => Row::decode_text(columns, TextRowPayload(payload)),
            Protocol::Binary => {
                let row = BinaryRowPayload::parse(payload, columns.len())?;
                Row::decode_binary(columns, row)
            }
        }
    }

    /// Forward a text protocol step to `handler`
    pub(crate) fn dispatch_text<H: TextResultSetHandler>(
        &self,
        step: Step,
        handler: &mut H,
    ) -> Result<()> {
        match step {
            Step::Response(Response::Ok(ok)) => handler.no_result_set(&ok),
            Step::Response(Response::ResultSet { columns }) => handler.resultset_start(&columns),
            Step::Row => handler.row(
                self.row_columns()?,
                TextRowPayload(&self.buffer_set.read_buffer),
            ),
            Step::End(ok) => handler.resultset_end(&ok),
            Step::NeedPacket | Step::WriteEmpty => Ok(()),
        }
    }

    /// Forward a binary protocol step to `handler`
    pub(crate) fn dispatch_binary<H: BinaryResultSetHandler>(
        &self,
        step: Step,
        handler: &mut H,
    ) -> Result<()> {
        match step {
            Step::Response(Response::Ok(ok)) => handler.no_result_set(&ok),
            Step::Response(Response::ResultSet { columns }) => handler.resultset_start(&columns),
            Step::Row => {
                let columns = self.row_columns()?;
                let row = BinaryRowPayload::parse(&self.buffer_set.read_buffer, columns.len())?;
                handler.row(columns, row)
            }
            Step::End(ok) => handler.resultset_end(&ok),
            Step::NeedPacket | Step::WriteEmpty => Ok(()),
        }
    }

    /// Read the OK or ERR that answers COM_PING, COM_INIT_DB and COM_RESET_CONNECTION
    pub(crate) fn read_simple_response(&mut self) -> Result<OkPayload> {
        let payload = self.buffer_set.read_buffer.as_slice();
        match payload.first() {
            Some(0x00) => {
                let ok = OkPayload::try_from(OkPayloadBytes(payload))?;
                self.record_ok(&ok);
                Ok(ok)
            }
            Some(0xFF) => Err(ErrPayloadBytes(payload).into()),
            _ => Err(Error::InvalidPacket),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::{ColumnFlags, ColumnType};
    use crate::protocol::connection::read_initial_handshake;
    use crate::protocol::mock;

    fn session(capability_flags: CapabilityFlags) -> Session {
        let greeting = mock::initial_handshake("8.0.36", "mysql_native_password", &[b'a'; 20]);
        let handshake = read_initial_handshake(&greeting).unwrap();
        Session::new(
            BufferSet::new(),
            handshake,
            capability_flags,
            ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT,
        )
    }

    fn feed(session: &mut Session, payload: &[u8]) -> Result<Step> {
        session.buffer_set.read_buffer.clear();
        session.buffer_set.read_buffer.extend_from_slice(payload);
        session.step()
    }

    #[test]
    fn test_text_result_set() {
        let mut session = session(CapabilityFlags::CLIENT_DEPRECATE_EOF);
        session.begin_command();
        session.expect_result(Protocol::Text);
        assert!(matches!(feed(&mut session, &[1]).unwrap(), Step::NeedPacket));

        let col = mock::column_definition_packet(
            "t",
            "a",
            ColumnType::MYSQL_TYPE_LONG,
            ColumnFlags::empty(),
            63,
        );
        let Step::Response(Response::ResultSet { columns }) = feed(&mut session, &col).unwrap()
        else {
            panic!("expected the column block to end");
        };
        assert_eq!(columns[0].name, "a");
        assert!(session.in_rows());

        assert!(matches!(feed(&mut session, b"\x013").unwrap(), Step::Row));
        assert_eq!(session.decode_row().unwrap()[0], Value::Int(3));

        let end = mock::ok_packet_with_header(0xFE, 0, 0, ServerStatusFlags::empty());
        assert!(matches!(feed(&mut session, &end).unwrap(), Step::End(_)));
        assert!(!session.has_pending());
        assert!(!session.status_flags().contains(ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT));
    }

    #[test]
    fn test_no_backslash_escapes_follows_status() {
        let mut session = session(CapabilityFlags::empty());
        assert_eq!(session.literal(&Value::from("a'b")).unwrap(), "'a\\'b'");

        session.begin_command();
        session.expect_result(Protocol::Text);
        let ok = mock::ok_packet(0, 0, ServerStatusFlags::SERVER_STATUS_NO_BACKSLASH_ESCAPES);
        feed(&mut session, &ok).unwrap();
        assert!(session.no_backslash_escapes());
        assert_eq!(session.literal(&Value::from("a'b")).unwrap(), "'a''b'");
    }

    #[test]
    fn test_step_without_command() {
        let mut session = session(CapabilityFlags::empty());
        assert!(matches!(
            feed(&mut session, &[0]),
            Err(Error::SequenceError(_))
        ));
    }

    #[test]
    fn test_guard_marks_broken() {
        let mut session = session(CapabilityFlags::empty());
        let server_error: Result<()> = Err(Error::ServerError(crate::protocol::response::ErrPayload {
            error_code: 1146,
            sql_state: "42S02".to_string(),
            message: "no such table".to_string(),
        }));
        assert!(session.guard(server_error).is_err());
        assert!(session.check().is_ok());

        let io_error: Result<()> = Err(Error::IoError(std::io::ErrorKind::BrokenPipe.into()));
        assert!(session.guard(io_error).is_err());
        assert!(matches!(session.check(), Err(Error::ConnectionBroken)));
    }

    #[test]
    fn test_library_bug_breaks_connection() {
        let mut session = session(CapabilityFlags::empty());
        let desync: Result<()> = Err(Error::from_debug("row packet before column definitions"));
        assert!(session.guard(desync).is_err());
        assert!(session.is_broken());
        assert!(matches!(session.check(), Err(Error::ConnectionBroken)));
    }
}
