mod buffer;
pub mod col;
pub mod constant;
pub mod error;
pub mod handler;
pub mod literal;
mod opts;
pub mod prepared;
pub mod protocol;
pub mod row;
mod session;
pub mod sql;
pub mod value;

#[cfg(feature = "sync")]
pub mod sync;

#[cfg(feature = "tokio")]
pub mod tokio;

pub use col::Column;
pub use error::{Error, Result};
pub use opts::Opts;
pub use prepared::PreparedStatement;
pub use protocol::command::Command;
pub use row::Row;
pub use session::Response;
pub use value::Value;

#[cfg(test)]
mod constant_test;
#[cfg(test)]
mod opts_test;
