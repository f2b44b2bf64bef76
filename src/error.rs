use thiserror::Error;

pub use color_eyre::eyre::eyre;

use crate::protocol::packet::ErrPayloadBytes;
use crate::protocol::response::ErrPayload;

#[derive(Debug, Error)]
pub enum Error {
    /// The server rejected a command. The connection is still usable.
    #[error("Server Error: {0}")]
    ServerError(ErrPayload),

    /// The server rejected the credentials during the handshake
    #[error("Authentication failed: {0}")]
    AuthError(ErrPayload),

    #[error("Unsupported authentication plugin: {0}")]
    UnsupportedAuthPlugin(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Connection is unusable after a previous fatal error")]
    ConnectionBroken,

    #[error("Invalid packet")]
    InvalidPacket,

    #[error("Unexpected end of packet")]
    UnexpectedEof,

    #[error("Packet out of order: expected sequence id {expected}, got {got}")]
    PacketOutOfOrder { expected: u8, got: u8 },

    /// A protocol state machine was driven in a state that cannot accept input
    #[error("Sequence error: {0}")]
    SequenceError(&'static str),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("Bad usage error: {0}")]
    BadUsageError(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Library bug: {0}")]
    LibraryBug(color_eyre::Report),
}

impl Error {
    pub fn from_debug(err: impl std::fmt::Debug) -> Self {
        Self::LibraryBug(eyre!("{:?}", err))
    }

    /// Whether the connection must be discarded after this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::AuthError(_)
                | Error::UnsupportedAuthPlugin(_)
                | Error::IoError(_)
                | Error::ConnectionBroken
                | Error::InvalidPacket
                | Error::UnexpectedEof
                | Error::PacketOutOfOrder { .. }
                | Error::SequenceError(_)
                | Error::LibraryBug(_)
        )
    }

    /// The numeric error code sent by the server, if this error came from the server
    pub fn server_code(&self) -> Option<u16> {
        match self {
            Error::ServerError(err) | Error::AuthError(err) => Some(err.error_code),
            _ => None,
        }
    }

    /// The 5-character SQL state sent by the server, if any
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Error::ServerError(err) | Error::AuthError(err) => Some(err.sql_state.as_str()),
            _ => None,
        }
    }
}

impl<'a> From<ErrPayloadBytes<'a>> for Error {
    fn from(value: ErrPayloadBytes<'a>) -> Self {
        match ErrPayload::try_from(value) {
            Ok(err_payload) => Error::ServerError(err_payload),
            Err(err) => err,
        }
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;
