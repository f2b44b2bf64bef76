use std::net::{TcpStream, ToSocketAddrs};

use zerocopy::{FromZeros, IntoBytes};

use crate::buffer::BufferSet;
use crate::constant::{CapabilityFlags, ServerStatusFlags};
use crate::error::{Error, Result};
use crate::handler::{CollectHandler, DropHandler, FirstRowHandler};
use crate::opts::Opts;
use crate::prepared::{PrepareReader, PreparedStatement};
use crate::protocol::command::Command;
use crate::protocol::command::callproc::{callproc_statements, out_params_query};
use crate::protocol::command::prepared::{write_close_statement, write_execute, write_prepare};
use crate::protocol::command::query::write_query;
use crate::protocol::command::utility::{
    write_init_db, write_ping, write_quit, write_reset_connection,
};
use crate::protocol::connection::{Handshake, HandshakeResult};
use crate::protocol::packet::{MAX_PAYLOAD_LENGTH, PacketHeader};
use crate::protocol::response::OkPayload;
use crate::protocol::r#trait::params::Params;
use crate::protocol::{BinaryResultSetHandler, TextResultSetHandler};
use crate::row::Row;
use crate::session::{Protocol, Response, Session, Step};
use crate::sql::expand_many;
use crate::value::Value;

use super::stream::Stream;

/// A blocking MySQL connection
///
/// Every command first drains whatever is left of the previous command's response, so a
/// caller may abandon a result set at any point.
pub struct Conn {
    stream: Stream,
    session: Session,
}

impl Conn {
    /// Create a new MySQL connection from connection options or a URL
    #[tracing::instrument(skip_all)]
    pub fn new<O: TryInto<Opts>>(opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        let opts: Opts = opts.try_into()?;
        let stream = connect(&opts)?;
        Self::new_with_stream(stream, &opts)
    }

    /// Run the handshake over an already connected stream
    pub fn new_with_stream(mut stream: Stream, opts: &Opts) -> Result<Self> {
        let mut handshake = Handshake::new(opts.handshake_config()?);
        let mut buffer_set = BufferSet::new();
        let mut sequence_id = 0;
        let mut initial_handshake = None;

        read_payload(&mut stream, &mut sequence_id, &mut buffer_set.initial_handshake)?;
        let mut result = handshake.drive(&buffer_set.initial_handshake)?;

        let (capability_flags, status_flags) = loop {
            match result {
                HandshakeResult::InitialHandshake {
                    handshake_response,
                    initial_handshake: hs,
                } => {
                    initial_handshake = Some(hs);
                    buffer_set
                        .new_write_buffer()
                        .extend_from_slice(&handshake_response);
                    write_payload(&mut stream, &mut buffer_set, &mut sequence_id)?;
                }
                HandshakeResult::SslRequest {
                    ssl_request,
                    initial_handshake: hs,
                } => {
                    initial_handshake = Some(hs);
                    buffer_set.new_write_buffer().extend_from_slice(&ssl_request);
                    write_payload(&mut stream, &mut buffer_set, &mut sequence_id)?;
                    stream = upgrade_to_tls(stream, &opts.host)?;
                    result = handshake.drive_after_tls()?;
                    continue;
                }
                HandshakeResult::Write(packet) => {
                    buffer_set.new_write_buffer().extend_from_slice(&packet);
                    write_payload(&mut stream, &mut buffer_set, &mut sequence_id)?;
                }
                HandshakeResult::NeedPacket => {}
                HandshakeResult::Connected {
                    capability_flags,
                    status_flags,
                } => break (capability_flags, status_flags),
            }
            read_payload(&mut stream, &mut sequence_id, &mut buffer_set.read_buffer)?;
            result = handshake.drive(&buffer_set.read_buffer)?;
        };

        let initial_handshake = initial_handshake
            .ok_or_else(|| Error::from_debug("connected without an initial handshake"))?;
        tracing::debug!(
            connection_id = initial_handshake.connection_id,
            server_version = %initial_handshake.server_version,
            ?capability_flags,
            "connected"
        );

        let mut conn = Self {
            stream,
            session: Session::new(buffer_set, initial_handshake, capability_flags, status_flags),
        };
        for sql in opts.setup_statements() {
            conn.query_drop(&sql)?;
        }
        Ok(conn)
    }

    pub fn server_version(&self) -> &str {
        self.session.server_version()
    }

    /// Get the connection ID assigned by the server
    pub fn connection_id(&self) -> u32 {
        self.session.connection_id()
    }

    /// Get the negotiated capability flags
    pub fn capability_flags(&self) -> CapabilityFlags {
        self.session.capability_flags()
    }

    /// Server status flags from the most recent OK or EOF packet
    pub fn status_flags(&self) -> ServerStatusFlags {
        self.session.status_flags()
    }

    /// The response whose rows `next_row()` is reading
    pub fn current(&self) -> Option<&Response> {
        self.session.current()
    }

    pub fn affected_rows(&self) -> u64 {
        self.session.last_ok().map_or(0, |ok| ok.affected_rows)
    }

    pub fn last_insert_id(&self) -> u64 {
        self.session.last_ok().map_or(0, |ok| ok.last_insert_id)
    }

    /// Whether a fatal error has made the connection unusable
    pub fn is_broken(&self) -> bool {
        self.session.is_broken()
    }

    /// SQL literal for `value`, escaped for the session's current `NO_BACKSLASH_ESCAPES` mode
    pub fn literal(&self, value: &Value) -> Result<String> {
        self.session.literal(value)
    }

    fn read_packet(&mut self) -> Result<()> {
        read_payload(
            &mut self.stream,
            &mut self.session.sequence_id,
            &mut self.session.buffer_set.read_buffer,
        )
    }

    fn send(&mut self) -> Result<()> {
        write_payload(
            &mut self.stream,
            &mut self.session.buffer_set,
            &mut self.session.sequence_id,
        )
    }

    /// Refuse a LOCAL INFILE request with an empty upload
    fn send_empty(&mut self) -> Result<()> {
        self.session.buffer_set.new_write_buffer();
        self.send()
    }

    /// Run `f` on a healthy connection and mark the connection broken on a fatal error
    fn run<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.session.check()?;
        let result = f(self);
        self.session.guard(result)
    }

    /// Read packets until the header of the next response is complete
    fn read_response(&mut self) -> Result<Response> {
        loop {
            self.read_packet()?;
            match self.session.step()? {
                Step::Response(response) => return Ok(response),
                Step::NeedPacket => {}
                Step::WriteEmpty => self.send_empty()?,
                step @ (Step::Row | Step::End(_)) => {
                    return Err(Error::from_debug(format!(
                        "{step:?} before the response header"
                    )));
                }
            }
        }
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        if !self.session.in_rows() {
            return Ok(None);
        }
        self.read_packet()?;
        match self.session.step()? {
            Step::Row => self.session.decode_row().map(Some),
            Step::End(_) => Ok(None),
            step => Err(Error::from_debug(format!("{step:?} while reading rows"))),
        }
    }

    fn skip_rows(&mut self) -> Result<()> {
        while self.session.in_rows() {
            self.read_packet()?;
            self.session.step()?;
        }
        Ok(())
    }

    fn advance_set(&mut self) -> Result<bool> {
        self.skip_rows()?;
        if self.session.awaiting_response() {
            self.read_response()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Read and discard every pending response of the previous command
    fn drain_all(&mut self) -> Result<()> {
        while self.advance_set()? {}
        if self.session.has_pending() {
            return Err(Error::from_debug("pending response in an unreadable state"));
        }
        Ok(())
    }

    fn start_query(&mut self, sql: &str) -> Result<()> {
        self.drain_all()?;
        write_query(self.session.begin_command(), sql);
        self.send()?;
        self.session.expect_result(Protocol::Text);
        Ok(())
    }

    fn start_execute<P: Params>(&mut self, statement_id: u32, params: P) -> Result<()> {
        self.drain_all()?;
        write_execute(self.session.begin_command(), statement_id, params)?;
        self.send()?;
        self.session.expect_result(Protocol::Binary);
        Ok(())
    }

    fn simple_command(&mut self, write: impl FnOnce(&mut Vec<u8>)) -> Result<Response> {
        self.drain_all()?;
        write(self.session.begin_command());
        self.send()?;
        self.read_packet()?;
        Ok(Response::Ok(self.session.read_simple_response()?))
    }

    fn dispatch(&mut self, command: Command<'_>) -> Result<Response> {
        match command {
            Command::Query(sql) => {
                self.start_query(sql)?;
                self.read_response()
            }
            Command::Ping => self.simple_command(write_ping),
            Command::InitDb(db) => self.simple_command(|out| write_init_db(out, db)),
            Command::ResetConnection => self.simple_command(write_reset_connection),
            Command::Callproc { name, args } => {
                let statements =
                    callproc_statements(name, args, self.session.no_backslash_escapes())?;
                let Some((call, sets)) = statements.split_last() else {
                    return Err(Error::from_debug("procedure call without a CALL statement"));
                };
                for sql in sets {
                    self.start_query(sql)?;
                    self.drain_all()?;
                }
                self.dispatch(Command::Query(call))
            }
            Command::Execute {
                statement_id,
                params,
            } => {
                self.start_execute(statement_id, params)?;
                self.read_response()
            }
            Command::Quit => {
                self.drain_all()?;
                write_quit(self.session.begin_command());
                self.send()?;
                let status_flags = self.session.status_flags();
                self.session.mark_closed();
                Ok(Response::Ok(OkPayload {
                    affected_rows: 0,
                    last_insert_id: 0,
                    status_flags,
                    warnings: 0,
                    info: String::new(),
                }))
            }
        }
    }

    /// Send a command and read the header of its first response
    ///
    /// A result set's rows are read with [`Conn::next_row`]; further results of the same
    /// command with [`Conn::next_set`].
    #[tracing::instrument(skip_all)]
    pub fn execute(&mut self, command: Command<'_>) -> Result<Response> {
        self.run(|conn| conn.dispatch(command))
    }

    /// Next row of the current result set, or `None` once it is exhausted
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        self.run(Self::read_row)
    }

    /// Skip the rest of the current result set and move to the next one.
    ///
    /// Returns `false` when the command has no further results.
    pub fn next_set(&mut self) -> Result<bool> {
        self.run(Self::advance_set)
    }

    /// Execute a text protocol SQL query
    pub fn query(&mut self, sql: &str) -> Result<Response> {
        self.execute(Command::Query(sql))
    }

    /// Execute a text protocol SQL query and push every result to `handler`
    pub fn query_with<H: TextResultSetHandler>(&mut self, sql: &str, handler: &mut H) -> Result<()> {
        self.run(|conn| {
            conn.start_query(sql)?;
            while conn.session.has_pending() {
                conn.read_packet()?;
                match conn.session.step()? {
                    Step::WriteEmpty => conn.send_empty()?,
                    step => conn.session.dispatch_text(step, handler)?,
                }
            }
            Ok(())
        })
    }

    /// Execute a text protocol SQL query and discard the result
    pub fn query_drop(&mut self, sql: &str) -> Result<()> {
        self.query_with(sql, &mut DropHandler::default())
    }

    /// Execute a text protocol SQL query and collect the rows of every result set
    pub fn query_collect(&mut self, sql: &str) -> Result<Vec<Row>> {
        let mut handler = CollectHandler::default();
        self.query_with(sql, &mut handler)?;
        Ok(handler.into_rows())
    }

    /// Execute a text protocol SQL query and return only the first row
    pub fn query_first(&mut self, sql: &str) -> Result<Option<Row>> {
        let mut handler = CollectHandler::default();
        self.query_with(sql, &mut FirstRowHandler::new(&mut handler))?;
        Ok(handler.into_rows().into_iter().next())
    }

    /// Run `template` once per row of arguments, substituting `%s` with literals.
    ///
    /// An `INSERT ... VALUES (...)` template becomes one multi-row INSERT. Returns the total
    /// number of affected rows.
    pub fn query_many(&mut self, template: &str, rows: &[Vec<Value>]) -> Result<u64> {
        let statements = expand_many(template, rows, self.session.no_backslash_escapes())?;
        let mut affected_rows = 0;
        for sql in &statements {
            let mut handler = DropHandler::default();
            self.query_with(sql, &mut handler)?;
            affected_rows += handler.affected_rows();
        }
        Ok(affected_rows)
    }

    /// Call a stored procedure. Arguments are bound to `@_{name}_{i}` session variables.
    pub fn callproc(&mut self, name: &str, args: &[Value]) -> Result<Response> {
        self.execute(Command::Callproc { name, args })
    }

    /// Read back the argument variables of the last `callproc(name, ...)`
    pub fn callproc_out_params(&mut self, name: &str, num_args: usize) -> Result<Vec<Value>> {
        let sql = out_params_query(name, num_args)?;
        self.query_first(&sql)?
            .map(Row::into_values)
            .ok_or_else(|| Error::from_debug("SELECT of session variables returned no row"))
    }

    /// Send a ping to the server to check if the connection is alive
    pub fn ping(&mut self) -> Result<()> {
        self.execute(Command::Ping).map(drop)
    }

    /// Change the default database
    pub fn select_db(&mut self, db: &str) -> Result<()> {
        self.execute(Command::InitDb(db)).map(drop)
    }

    /// Reset the session state on the server without re-authenticating
    pub fn reset(&mut self) -> Result<()> {
        self.execute(Command::ResetConnection).map(drop)
    }

    /// Send COM_QUIT and close the connection
    pub fn close(mut self) -> Result<()> {
        self.execute(Command::Quit).map(drop)
    }

    /// Returns the statement with its parameter and column definitions
    #[tracing::instrument(skip_all)]
    pub fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        self.run(|conn| {
            conn.drain_all()?;
            write_prepare(conn.session.begin_command(), sql);
            conn.send()?;
            let mut reader = PrepareReader::new(conn.session.capability_flags());
            loop {
                conn.read_packet()?;
                if let Some(stmt) = reader.feed(&conn.session.buffer_set.read_buffer)? {
                    return Ok(stmt);
                }
            }
        })
    }

    /// Deallocate a prepared statement. The server does not reply.
    pub fn close_statement(&mut self, stmt: PreparedStatement) -> Result<()> {
        self.run(|conn| {
            conn.drain_all()?;
            write_close_statement(conn.session.begin_command(), stmt.id());
            conn.send()
        })
    }

    /// Execute a prepared statement and read the header of its first response
    pub fn exec<P: Params>(&mut self, stmt: &PreparedStatement, params: P) -> Result<Response> {
        stmt.check_arity(&params)?;
        self.run(|conn| {
            conn.start_execute(stmt.id(), params)?;
            conn.read_response()
        })
    }

    /// Execute a prepared statement and push every result to `handler`
    pub fn exec_with<P, H>(&mut self, stmt: &PreparedStatement, params: P, handler: &mut H) -> Result<()>
    where
        P: Params,
        H: BinaryResultSetHandler,
    {
        stmt.check_arity(&params)?;
        self.run(|conn| {
            conn.start_execute(stmt.id(), params)?;
            while conn.session.has_pending() {
                conn.read_packet()?;
                match conn.session.step()? {
                    Step::WriteEmpty => conn.send_empty()?,
                    step => conn.session.dispatch_binary(step, handler)?,
                }
            }
            Ok(())
        })
    }

    /// Execute a prepared statement and discard all results
    pub fn exec_drop<P: Params>(&mut self, stmt: &PreparedStatement, params: P) -> Result<()> {
        self.exec_with(stmt, params, &mut DropHandler::default())
    }

    /// Execute a prepared statement and collect the rows of every result set
    pub fn exec_collect<P: Params>(&mut self, stmt: &PreparedStatement, params: P) -> Result<Vec<Row>> {
        let mut handler = CollectHandler::default();
        self.exec_with(stmt, params, &mut handler)?;
        Ok(handler.into_rows())
    }

    /// Execute a prepared statement and return only the first row
    pub fn exec_first<P: Params>(&mut self, stmt: &PreparedStatement, params: P) -> Result<Option<Row>> {
        let mut handler = CollectHandler::default();
        self.exec_with(stmt, params, &mut FirstRowHandler::new(&mut handler))?;
        Ok(handler.into_rows().into_iter().next())
    }
}

fn connect(opts: &Opts) -> Result<Stream> {
    if let Some(socket) = &opts.socket {
        return connect_unix(socket, opts);
    }

    let mut last_error = None;
    for addr in (opts.host.as_str(), opts.port).to_socket_addrs()? {
        let connected = match opts.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match connected {
            Ok(stream) => {
                stream.set_nodelay(opts.tcp_nodelay)?;
                stream.set_read_timeout(opts.read_timeout)?;
                stream.set_write_timeout(opts.write_timeout)?;
                return Ok(Stream::tcp(stream));
            }
            Err(err) => last_error = Some(err),
        }
    }
    Err(last_error
        .unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} did not resolve to any address", opts.host),
            )
        })
        .into())
}

#[cfg(unix)]
fn connect_unix(path: &str, opts: &Opts) -> Result<Stream> {
    let stream = std::os::unix::net::UnixStream::connect(path)?;
    stream.set_read_timeout(opts.read_timeout)?;
    stream.set_write_timeout(opts.write_timeout)?;
    Ok(Stream::unix(stream))
}

#[cfg(not(unix))]
fn connect_unix(_path: &str, _opts: &Opts) -> Result<Stream> {
    Err(Error::BadConfigError(
        "Unix sockets are not available on this platform".to_string(),
    ))
}

#[cfg(feature = "sync-tls")]
fn upgrade_to_tls(stream: Stream, host: &str) -> Result<Stream> {
    Ok(stream.upgrade_to_tls(host)?)
}

#[cfg(not(feature = "sync-tls"))]
fn upgrade_to_tls(_stream: Stream, _host: &str) -> Result<Stream> {
    Err(Error::BadConfigError(
        "TLS requires the `sync-tls` feature".to_string(),
    ))
}

/// Read one payload, joining frames of 0xFFFFFF bytes with the frames that follow them.
/// Every frame's sequence id must match `sequence_id`, which is advanced per frame.
#[tracing::instrument(skip_all)]
pub(crate) fn read_payload(
    stream: &mut Stream,
    sequence_id: &mut u8,
    buffer: &mut Vec<u8>,
) -> Result<()> {
    buffer.clear();
    let mut header = PacketHeader::new_zeroed();
    loop {
        stream.read_exact(header.as_mut_bytes())?;
        header.check_sequence(sequence_id)?;
        let length = header.length();
        tracing::trace!(length, sequence_id = header.sequence_id, "read frame");

        let start = buffer.len();
        buffer.resize(start + length, 0);
        stream.read_exact(&mut buffer[start..])?;
        if length < MAX_PAYLOAD_LENGTH {
            return Ok(());
        }
    }
}

/// Write the payload of the write buffer, split into frames
#[tracing::instrument(skip_all)]
pub(crate) fn write_payload(
    stream: &mut Stream,
    buffer_set: &mut BufferSet,
    sequence_id: &mut u8,
) -> Result<()> {
    let first_sequence_id = *sequence_id;
    let wire = buffer_set.frames(sequence_id);
    tracing::trace!(bytes = wire.len(), first_sequence_id, "write payload");
    stream.write_all(wire)?;
    stream.flush()?;
    Ok(())
}
