use std::future::Future;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::instrument;
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

/// An async MySQL connection
///
/// Every command first drains whatever is left of the previous command's response, so a
/// caller may abandon a result set at any point.
pub struct Conn {
    stream: Stream,
    session: Session,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl Conn {
    /// Create a new MySQL connection from connection options or a URL (async)
    #[instrument(skip_all)]
    pub async fn new<O: TryInto<Opts>>(opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        let opts: Opts = opts.try_into()?;
        let stream = with_timeout(opts.connect_timeout, connect(&opts)).await?;
        Self::new_with_stream(stream, &opts).await
    }

    /// Run the handshake over an already connected stream (async)
    pub async fn new_with_stream(mut stream: Stream, opts: &Opts) -> Result<Self> {
        let mut handshake = Handshake::new(opts.handshake_config()?);
        let mut buffer_set = BufferSet::new();
        let mut sequence_id = 0;
        let mut initial_handshake = None;

        let read = read_payload(&mut stream, &mut sequence_id, &mut buffer_set.initial_handshake);
        with_timeout(opts.read_timeout, read).await?;
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
                    let write = write_payload(&mut stream, &mut buffer_set, &mut sequence_id);
                    with_timeout(opts.write_timeout, write).await?;
                }
                HandshakeResult::SslRequest {
                    ssl_request,
                    initial_handshake: hs,
                } => {
                    initial_handshake = Some(hs);
                    buffer_set.new_write_buffer().extend_from_slice(&ssl_request);
                    let write = write_payload(&mut stream, &mut buffer_set, &mut sequence_id);
                    with_timeout(opts.write_timeout, write).await?;
                    stream = upgrade_to_tls(stream, &opts.host).await?;
                    result = handshake.drive_after_tls()?;
                    continue;
                }
                HandshakeResult::Write(packet) => {
                    buffer_set.new_write_buffer().extend_from_slice(&packet);
                    let write = write_payload(&mut stream, &mut buffer_set, &mut sequence_id);
                    with_timeout(opts.write_timeout, write).await?;
                }
                HandshakeResult::NeedPacket => {}
                HandshakeResult::Connected {
                    capability_flags,
                    status_flags,
                } => break (capability_flags, status_flags),
            }
            let read = read_payload(&mut stream, &mut sequence_id, &mut buffer_set.read_buffer);
            with_timeout(opts.read_timeout, read).await?;
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
            read_timeout: opts.read_timeout,
            write_timeout: opts.write_timeout,
        };
        for sql in opts.setup_statements() {
            conn.query_drop(&sql).await?;
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

    pub fn is_broken(&self) -> bool {
        self.session.is_broken()
    }

    /// SQL literal for `value`, escaped for the session's current `NO_BACKSLASH_ESCAPES` mode
    pub fn literal(&self, value: &Value) -> Result<String> {
        self.session.literal(value)
    }

    async fn read_packet(&mut self) -> Result<()> {
        let read = read_payload(
            &mut self.stream,
            &mut self.session.sequence_id,
            &mut self.session.buffer_set.read_buffer,
        );
        with_timeout(self.read_timeout, read).await
    }

    async fn send(&mut self) -> Result<()> {
        let write = write_payload(
            &mut self.stream,
            &mut self.session.buffer_set,
            &mut self.session.sequence_id,
        );
        with_timeout(self.write_timeout, write).await
    }

    async fn send_empty(&mut self) -> Result<()> {
        self.session.buffer_set.new_write_buffer();
        self.send().await
    }

    async fn read_response(&mut self) -> Result<Response> {
        loop {
            self.read_packet().await?;
            match self.session.step()? {
                Step::Response(response) => return Ok(response),
                Step::NeedPacket => {}
                Step::WriteEmpty => self.send_empty().await?,
                step @ (Step::Row | Step::End(_)) => {
                    return Err(Error::from_debug(format!(
                        "{step:?} before the response header"
                    )));
                }
            }
        }
    }

    async fn read_row(&mut self) -> Result<Option<Row>> {
        if !self.session.in_rows() {
            return Ok(None);
        }
        self.read_packet().await?;
        match self.session.step()? {
            Step::Row => self.session.decode_row().map(Some),
            Step::End(_) => Ok(None),
            step => Err(Error::from_debug(format!("{step:?} while reading rows"))),
        }
    }

    async fn advance_set(&mut self) -> Result<bool> {
        while self.session.in_rows() {
            self.read_packet().await?;
            self.session.step()?;
        }
        if self.session.awaiting_response() {
            self.read_response().await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn drain_all(&mut self) -> Result<()> {
        while self.advance_set().await? {}
        if self.session.has_pending() {
            return Err(Error::from_debug("pending response in an unreadable state"));
        }
        Ok(())
    }

    async fn start_query(&mut self, sql: &str) -> Result<()> {
        self.drain_all().await?;
        write_query(self.session.begin_command(), sql);
        self.send().await?;
        self.session.expect_result(Protocol::Text);
        Ok(())
    }

    async fn start_execute<P: Params>(&mut self, statement_id: u32, params: P) -> Result<()> {
        self.drain_all().await?;
        write_execute(self.session.begin_command(), statement_id, params)?;
        self.send().await?;
        self.session.expect_result(Protocol::Binary);
        Ok(())
    }

    async fn simple_command(&mut self, write: impl FnOnce(&mut Vec<u8>)) -> Result<Response> {
        self.drain_all().await?;
        write(self.session.begin_command());
        self.send().await?;
        self.read_packet().await?;
        Ok(Response::Ok(self.session.read_simple_response()?))
    }

    async fn dispatch(&mut self, command: Command<'_>) -> Result<Response> {
        match command {
            Command::Query(sql) => {
                self.start_query(sql).await?;
                self.read_response().await
            }
            Command::Ping => self.simple_command(write_ping).await,
            Command::InitDb(db) => self.simple_command(|out| write_init_db(out, db)).await,
            Command::ResetConnection => self.simple_command(write_reset_connection).await,
            Command::Callproc { name, args } => {
                let statements =
                    callproc_statements(name, args, self.session.no_backslash_escapes())?;
                let Some((call, sets)) = statements.split_last() else {
                    return Err(Error::from_debug("procedure call without a CALL statement"));
                };
                for sql in sets {
                    self.start_query(sql).await?;
                    self.drain_all().await?;
                }
                self.start_query(call).await?;
                self.read_response().await
            }
            Command::Execute {
                statement_id,
                params,
            } => {
                self.start_execute(statement_id, params).await?;
                self.read_response().await
            }
            Command::Quit => {
                self.drain_all().await?;
                write_quit(self.session.begin_command());
                self.send().await?;
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
    #[instrument(skip_all)]
    pub async fn execute(&mut self, command: Command<'_>) -> Result<Response> {
        self.session.check()?;
        let result = self.dispatch(command).await;
        self.session.guard(result)
    }

    /// Next row of the current result set, or `None` once it is exhausted
    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        self.session.check()?;
        let result = self.read_row().await;
        self.session.guard(result)
    }

    /// Skip the rest of the current result set and move to the next one.
    ///
    /// Returns `false` when the command has no further results.
    pub async fn next_set(&mut self) -> Result<bool> {
        self.session.check()?;
        let result = self.advance_set().await;
        self.session.guard(result)
    }

    pub async fn query(&mut self, sql: &str) -> Result<Response> {
        self.execute(Command::Query(sql)).await
    }

    async fn drive_text<H: TextResultSetHandler>(&mut self, sql: &str, handler: &mut H) -> Result<()> {
        self.start_query(sql).await?;
        while self.session.has_pending() {
            self.read_packet().await?;
            match self.session.step()? {
                Step::WriteEmpty => self.send_empty().await?,
                step => self.session.dispatch_text(step, handler)?,
            }
        }
        Ok(())
    }

    /// Execute a text protocol SQL query and push every result to `handler`
    pub async fn query_with<H: TextResultSetHandler>(&mut self, sql: &str, handler: &mut H) -> Result<()> {
        self.session.check()?;
        let result = self.drive_text(sql, handler).await;
        self.session.guard(result)
    }

    pub async fn query_drop(&mut self, sql: &str) -> Result<()> {
        self.query_with(sql, &mut DropHandler::default()).await
    }

    /// Execute a text protocol SQL query and collect the rows of every result set
    pub async fn query_collect(&mut self, sql: &str) -> Result<Vec<Row>> {
        let mut handler = CollectHandler::default();
        self.query_with(sql, &mut handler).await?;
        Ok(handler.into_rows())
    }

    pub async fn query_first(&mut self, sql: &str) -> Result<Option<Row>> {
        let mut handler = CollectHandler::default();
        self.query_with(sql, &mut FirstRowHandler::new(&mut handler)).await?;
        Ok(handler.into_rows().into_iter().next())
    }

    /// Run `template` once per row of arguments, folding INSERTs into one statement.
    /// Returns the total number of affected rows.
    pub async fn query_many(&mut self, template: &str, rows: &[Vec<Value>]) -> Result<u64> {
        let statements = expand_many(template, rows, self.session.no_backslash_escapes())?;
        let mut affected_rows = 0;
        for sql in &statements {
            let mut handler = DropHandler::default();
            self.query_with(sql, &mut handler).await?;
            affected_rows += handler.affected_rows();
        }
        Ok(affected_rows)
    }

    pub async fn callproc(&mut self, name: &str, args: &[Value]) -> Result<Response> {
        self.execute(Command::Callproc { name, args }).await
    }

    pub async fn callproc_out_params(&mut self, name: &str, num_args: usize) -> Result<Vec<Value>> {
        let sql = out_params_query(name, num_args)?;
        self.query_first(&sql)
            .await?
            .map(Row::into_values)
            .ok_or_else(|| Error::from_debug("SELECT of session variables returned no row"))
    }

    pub async fn ping(&mut self) -> Result<()> {
        self.execute(Command::Ping).await.map(drop)
    }

    pub async fn select_db(&mut self, db: &str) -> Result<()> {
        self.execute(Command::InitDb(db)).await.map(drop)
    }

    pub async fn reset(&mut self) -> Result<()> {
        self.execute(Command::ResetConnection).await.map(drop)
    }

    /// Send COM_QUIT and close the connection
    pub async fn close(mut self) -> Result<()> {
        self.execute(Command::Quit).await.map(drop)
    }

    async fn read_prepared(&mut self, sql: &str) -> Result<PreparedStatement> {
        self.drain_all().await?;
        write_prepare(self.session.begin_command(), sql);
        self.send().await?;
        let mut reader = PrepareReader::new(self.session.capability_flags());
        loop {
            self.read_packet().await?;
            if let Some(stmt) = reader.feed(&self.session.buffer_set.read_buffer)? {
                return Ok(stmt);
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        self.session.check()?;
        let result = self.read_prepared(sql).await;
        self.session.guard(result)
    }

    /// Deallocate a prepared statement. The server does not reply.
    pub async fn close_statement(&mut self, stmt: PreparedStatement) -> Result<()> {
        self.session.check()?;
        let result = async {
            self.drain_all().await?;
            write_close_statement(self.session.begin_command(), stmt.id());
            self.send().await
        }
        .await;
        self.session.guard(result)
    }

    pub async fn exec<P: Params>(&mut self, stmt: &PreparedStatement, params: P) -> Result<Response> {
        stmt.check_arity(&params)?;
        self.session.check()?;
        let result = async {
            self.start_execute(stmt.id(), params).await?;
            self.read_response().await
        }
        .await;
        self.session.guard(result)
    }

    async fn drive_binary<P, H>(&mut self, stmt: &PreparedStatement, params: P, handler: &mut H) -> Result<()>
    where
        P: Params,
        H: BinaryResultSetHandler,
    {
        self.start_execute(stmt.id(), params).await?;
        while self.session.has_pending() {
            self.read_packet().await?;
            match self.session.step()? {
                Step::WriteEmpty => self.send_empty().await?,
                step => self.session.dispatch_binary(step, handler)?,
            }
        }
        Ok(())
    }

    /// Execute a prepared statement and push every result to `handler`
    pub async fn exec_with<P, H>(&mut self, stmt: &PreparedStatement, params: P, handler: &mut H) -> Result<()>
    where
        P: Params,
        H: BinaryResultSetHandler,
    {
        stmt.check_arity(&params)?;
        self.session.check()?;
        let result = self.drive_binary(stmt, params, handler).await;
        self.session.guard(result)
    }

    pub async fn exec_drop<P: Params>(&mut self, stmt: &PreparedStatement, params: P) -> Result<()> {
        self.exec_with(stmt, params, &mut DropHandler::default()).await
    }

    pub async fn exec_collect<P: Params>(&mut self, stmt: &PreparedStatement, params: P) -> Result<Vec<Row>> {
        let mut handler = CollectHandler::default();
        self.exec_with(stmt, params, &mut handler).await?;
        Ok(handler.into_rows())
    }

    pub async fn exec_first<P: Params>(&mut self, stmt: &PreparedStatement, params: P) -> Result<Option<Row>> {
        let mut handler = CollectHandler::default();
        self.exec_with(stmt, params, &mut FirstRowHandler::new(&mut handler))
            .await?;
        Ok(handler.into_rows().into_iter().next())
    }
}

/// Await `future`, failing with a `TimedOut` I/O error after `limit`
async fn with_timeout<T>(limit: Option<Duration>, future: impl Future<Output = Result<T>>) -> Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|elapsed| Error::IoError(elapsed.into()))?,
        None => future.await,
    }
}

async fn connect(opts: &Opts) -> Result<Stream> {
    if let Some(socket) = &opts.socket {
        return connect_unix(socket).await;
    }
    let stream = TcpStream::connect((opts.host.as_str(), opts.port)).await?;
    stream.set_nodelay(opts.tcp_nodelay)?;
    Ok(Stream::tcp(stream))
}

#[cfg(unix)]
async fn connect_unix(path: &str) -> Result<Stream> {
    let stream = tokio::net::UnixStream::connect(path).await?;
    Ok(Stream::unix(stream))
}

#[cfg(not(unix))]
async fn connect_unix(_path: &str) -> Result<Stream> {
    Err(Error::BadConfigError(
        "Unix sockets are not available on this platform".to_string(),
    ))
}

#[cfg(feature = "tokio-tls")]
async fn upgrade_to_tls(stream: Stream, host: &str) -> Result<Stream> {
    Ok(stream.upgrade_to_tls(host).await?)
}

#[cfg(not(feature = "tokio-tls"))]
async fn upgrade_to_tls(_stream: Stream, _host: &str) -> Result<Stream> {
    Err(Error::BadConfigError(
        "TLS requires the `tokio-tls` feature".to_string(),
    ))
}

/// Read one payload, joining frames of 0xFFFFFF bytes with the frames that follow them.
/// Every frame's sequence id must match `sequence_id`, which is advanced per frame.
#[instrument(skip_all)]
async fn read_payload(stream: &mut Stream, sequence_id: &mut u8, buffer: &mut Vec<u8>) -> Result<()> {
    buffer.clear();
    let mut header = PacketHeader::new_zeroed();
    loop {
        stream.read_exact(header.as_mut_bytes()).await?;
        header.check_sequence(sequence_id)?;
        let length = header.length();
        tracing::trace!(length, sequence_id = header.sequence_id, "read frame");

        let start = buffer.len();
        buffer.resize(start + length, 0);
        stream.read_exact(&mut buffer[start..]).await?;
        if length < MAX_PAYLOAD_LENGTH {
            return Ok(());
        }
    }
}

/// Write the payload of the write buffer, split into frames
#[instrument(skip_all)]
async fn write_payload(stream: &mut Stream, buffer_set: &mut BufferSet, sequence_id: &mut u8) -> Result<()> {
    let wire = buffer_set.frames(sequence_id);
    tracing::trace!(bytes = wire.len(), "write payload");
    stream.write_all(wire).await?;
    stream.flush().await?;
    Ok(())
}
