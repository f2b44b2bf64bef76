use std::sync::Arc;

use crate::col::Column;
use crate::error::Result;
use crate::protocol::r#trait::{BinaryResultSetHandler, TextResultSetHandler};
use crate::protocol::response::OkPayload;
use crate::protocol::{BinaryRowPayload, TextRowPayload};
use crate::row::Row;

/// A handler that ignores all result set data but captures affected_rows and last_insert_id
///
/// Useful for `exec_drop()` and `query_drop()` methods that discard results but need metadata.
#[derive(Debug, Default)]
pub struct DropHandler {
    affected_rows: u64,
    last_insert_id: u64,
}

impl DropHandler {
    /// Get the number of affected rows from the last operation
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// Get the last insert ID from the last operation
    pub fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }

    fn record(&mut self, ok: &OkPayload) {
        self.affected_rows = ok.affected_rows;
        self.last_insert_id = ok.last_insert_id;
    }
}

impl BinaryResultSetHandler for DropHandler {
    fn no_result_set(&mut self, ok: &OkPayload) -> Result<()> {
        self.record(ok);
        Ok(())
    }

    fn resultset_start(&mut self, _: &[Column]) -> Result<()> {
        Ok(())
    }

    fn row(&mut self, _: &[Column], _: BinaryRowPayload<'_>) -> Result<()> {
        Ok(())
    }

    fn resultset_end(&mut self, eof: &OkPayload) -> Result<()> {
        self.record(eof);
        Ok(())
    }
}

impl TextResultSetHandler for DropHandler {
    fn no_result_set(&mut self, ok: &OkPayload) -> Result<()> {
        self.record(ok);
        Ok(())
    }

    fn resultset_start(&mut self, _: &[Column]) -> Result<()> {
        Ok(())
    }

    fn row(&mut self, _: &[Column], _: TextRowPayload<'_>) -> Result<()> {
        Ok(())
    }

    fn resultset_end(&mut self, eof: &OkPayload) -> Result<()> {
        self.record(eof);
        Ok(())
    }
}

/// A handler that decodes every row of every result set into [`Row`]s
#[derive(Debug, Default)]
pub struct CollectHandler {
    columns: Option<Arc<[Column]>>,
    rows: Vec<Row>,
}

impl CollectHandler {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Columns shared by the rows of the current result set
    fn columns(&mut self, cols: &[Column]) -> Arc<[Column]> {
        match &self.columns {
            Some(columns) if **columns == *cols => Arc::clone(columns),
            _ => {
                let columns: Arc<[Column]> = Arc::from(cols);
                self.columns = Some(Arc::clone(&columns));
                columns
            }
        }
    }
}

impl BinaryResultSetHandler for CollectHandler {
    fn no_result_set(&mut self, _: &OkPayload) -> Result<()> {
        Ok(())
    }

    fn resultset_start(&mut self, cols: &[Column]) -> Result<()> {
        self.columns = Some(Arc::from(cols));
        Ok(())
    }

    fn row(&mut self, cols: &[Column], row: BinaryRowPayload<'_>) -> Result<()> {
        let columns = self.columns(cols);
        self.rows.push(Row::decode_binary(columns, row)?);
        Ok(())
    }

    fn resultset_end(&mut self, _: &OkPayload) -> Result<()> {
        self.columns = None;
        Ok(())
    }
}

impl TextResultSetHandler for CollectHandler {
    fn no_result_set(&mut self, _: &OkPayload) -> Result<()> {
        Ok(())
    }

    fn resultset_start(&mut self, cols: &[Column]) -> Result<()> {
        self.columns = Some(Arc::from(cols));
        Ok(())
    }

    fn row(&mut self, cols: &[Column], row: TextRowPayload<'_>) -> Result<()> {
        let columns = self.columns(cols);
        self.rows.push(Row::decode_text(columns, row)?);
        Ok(())
    }

    fn resultset_end(&mut self, _: &OkPayload) -> Result<()> {
        self.columns = None;
        Ok(())
    }
}

/// A wrapper handler that forwards calls to an inner handler but stops after the first row
///
/// Useful for `query_first()` and `exec_first()` methods that only process the first row.
pub struct FirstRowHandler<'a, H> {
    pub inner: &'a mut H,
    pub found_row: bool,
}

impl<'a, H> FirstRowHandler<'a, H> {
    pub fn new(inner: &'a mut H) -> Self {
        Self {
            inner,
            found_row: false,
        }
    }
}

impl<H: BinaryResultSetHandler> BinaryResultSetHandler for FirstRowHandler<'_, H> {
    fn no_result_set(&mut self, ok: &OkPayload) -> Result<()> {
        self.inner.no_result_set(ok)
    }

    fn resultset_start(&mut self, cols: &[Column]) -> Result<()> {
        self.inner.resultset_start(cols)
    }

    fn row(&mut self, cols: &[Column], row: BinaryRowPayload<'_>) -> Result<()> {
        if self.found_row {
            return Ok(());
        }
        self.found_row = true;
        self.inner.row(cols, row)
    }

    fn resultset_end(&mut self, eof: &OkPayload) -> Result<()> {
        self.inner.resultset_end(eof)
    }
}

impl<H: TextResultSetHandler> TextResultSetHandler for FirstRowHandler<'_, H> {
    fn no_result_set(&mut self, ok: &OkPayload) -> Result<()> {
        self.inner.no_result_set(ok)
    }

    fn resultset_start(&mut self, cols: &[Column]) -> Result<()> {
        self.inner.resultset_start(cols)
    }

    fn row(&mut self, cols: &[Column], row: TextRowPayload<'_>) -> Result<()> {
        if self.found_row {
            return Ok(());
        }
        self.found_row = true;
        self.inner.row(cols, row)
    }

    fn resultset_end(&mut self, eof: &OkPayload) -> Result<()> {
        self.inner.resultset_end(eof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::{ColumnFlags, ColumnType, ServerStatusFlags};
    use crate::value::Value;

    fn ok(affected_rows: u64, last_insert_id: u64) -> OkPayload {
        OkPayload {
            affected_rows,
            last_insert_id,
            status_flags: ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT,
            warnings: 0,
            info: String::new(),
        }
    }

    fn columns() -> Vec<Column> {
        vec![Column::new("n", ColumnType::MYSQL_TYPE_LONGLONG, ColumnFlags::empty())]
    }

    #[test]
    fn test_drop_handler_keeps_last_ok() {
        let mut handler = DropHandler::default();
        TextResultSetHandler::no_result_set(&mut handler, &ok(3, 7)).unwrap();
        assert_eq!(handler.affected_rows(), 3);
        assert_eq!(handler.last_insert_id(), 7);

        BinaryResultSetHandler::resultset_end(&mut handler, &ok(0, 0)).unwrap();
        assert_eq!(handler.affected_rows(), 0);
    }

    #[test]
    fn test_collect_text_rows() {
        let cols = columns();
        let mut handler = CollectHandler::default();
        TextResultSetHandler::resultset_start(&mut handler, &cols).unwrap();
        TextResultSetHandler::row(&mut handler, &cols, TextRowPayload(b"\x011")).unwrap();
        TextResultSetHandler::row(&mut handler, &cols, TextRowPayload(b"\xFB")).unwrap();
        TextResultSetHandler::resultset_end(&mut handler, &ok(0, 0)).unwrap();

        let rows = handler.into_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Value::Int(1));
        assert_eq!(rows[1][0], Value::Null);
        assert_eq!(rows[1].columns()[0].name, "n");
    }

    #[test]
    fn test_collect_binary_rows() {
        let cols = columns();
        let mut handler = CollectHandler::default();
        BinaryResultSetHandler::resultset_start(&mut handler, &cols).unwrap();
        let payload = [0x00, 0x00, 5, 0, 0, 0, 0, 0, 0, 0];
        let row = BinaryRowPayload::parse(&payload, 1).unwrap();
        BinaryResultSetHandler::row(&mut handler, &cols, row).unwrap();
        assert_eq!(handler.rows()[0].values(), [Value::Int(5)]);
    }

    #[test]
    fn test_first_row_handler() {
        let cols = columns();
        let mut inner = CollectHandler::default();
        let mut handler = FirstRowHandler::new(&mut inner);
        TextResultSetHandler::resultset_start(&mut handler, &cols).unwrap();
        TextResultSetHandler::row(&mut handler, &cols, TextRowPayload(b"\x011")).unwrap();
        TextResultSetHandler::row(&mut handler, &cols, TextRowPayload(b"\x012")).unwrap();
        assert!(handler.found_row);
        assert_eq!(inner.rows().len(), 1);
    }
}
