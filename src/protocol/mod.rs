pub mod command;
pub mod connection;
#[cfg(test)]
pub(crate) mod mock;
pub mod packet;
pub mod primitive;
pub mod response;
mod row;
pub mod r#trait;
pub mod value;

pub use row::{BinaryRowPayload, TextCells, TextRowPayload};
pub use r#trait::{BinaryResultSetHandler, TextResultSetHandler};
