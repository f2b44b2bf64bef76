pub mod callproc;
mod column_definition;
pub mod prepared;
pub mod query;
pub mod utility;


pub use column_definition::{ColumnDefinition, ColumnDefinitionBytes, ColumnDefinitionTail};

use crate::value::Value;

/// A command sent in the command phase
///
/// Every variant starts a new packet sequence. `Callproc` expands into several `COM_QUERY`
/// commands, see [`callproc::callproc_statements`].
#[derive(Debug, Clone, Copy)]
pub enum Command<'a> {
    /// COM_QUERY
    Query(&'a str),
    /// COM_PING
    Ping,
    /// `SET` of every argument followed by `CALL`
    Callproc { name: &'a str, args: &'a [Value] },
    /// COM_STMT_EXECUTE of a prepared statement
    Execute {
        statement_id: u32,
        params: &'a [Value],
    },
    /// COM_INIT_DB
    InitDb(&'a str),
    /// COM_RESET_CONNECTION
    ResetConnection,
    /// COM_QUIT. The server closes the connection without replying.
    Quit,
}
