pub mod param;
pub mod params;


use auto_impl::auto_impl;

use crate::col::Column;
use crate::error::Result;
use crate::protocol::response::OkPayload;
use crate::protocol::{BinaryRowPayload, TextRowPayload};

/// Trait that defines event callbacks for binary protocol result sets
#[auto_impl(&mut, Box)]
pub trait BinaryResultSetHandler {
    fn no_result_set(&mut self, ok: &OkPayload) -> Result<()>;
    fn resultset_start(&mut self, cols: &[Column]) -> Result<()>;
    fn row(&mut self, cols: &[Column], row: BinaryRowPayload<'_>) -> Result<()>;
    fn resultset_end(&mut self, eof: &OkPayload) -> Result<()>;
}

/// Trait that defines event callbacks for text protocol result sets
#[auto_impl(&mut, Box)]
pub trait TextResultSetHandler {
    fn no_result_set(&mut self, ok: &OkPayload) -> Result<()>;
    fn resultset_start(&mut self, cols: &[Column]) -> Result<()>;
    fn row(&mut self, cols: &[Column], row: TextRowPayload<'_>) -> Result<()>;
    fn resultset_end(&mut self, eof: &OkPayload) -> Result<()>;
}
