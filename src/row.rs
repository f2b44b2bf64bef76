use std::sync::Arc;

use crate::col::Column;
use crate::error::{Error, Result};
use crate::protocol::{BinaryRowPayload, TextRowPayload};
use crate::value::{Value, decode_binary, decode_text};

/// A decoded row together with the columns of its result set
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[Column]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Decode a text protocol row. `NULL` cells (0xFB) become [`Value::Null`].
    pub fn decode_text(columns: Arc<[Column]>, row: TextRowPayload<'_>) -> Result<Self> {
        let mut values = Vec::with_capacity(columns.len());
        let mut cells = row.cells();
        for col in columns.iter() {
            let value = match cells.next().ok_or(Error::UnexpectedEof)?? {
                Some(bytes) => decode_text(bytes, col)?,
                None => Value::Null,
            };
            values.push(value);
        }
        if cells.next().is_some() {
            return Err(Error::InvalidPacket);
        }
        Ok(Self { columns, values })
    }

    /// Decode a binary protocol row
    pub fn decode_binary(columns: Arc<[Column]>, row: BinaryRowPayload<'_>) -> Result<Self> {
        if row.num_columns() != columns.len() {
            return Err(Error::from_debug(format!(
                "row has {} columns but the result set has {}",
                row.num_columns(),
                columns.len()
            )));
        }
        let null_bitmap = row.null_bitmap();
        let mut data = row.values();
        let mut values = Vec::with_capacity(columns.len());
        for (idx, col) in columns.iter().enumerate() {
            if null_bitmap.is_null(idx) {
                values.push(Value::Null);
                continue;
            }
            let (value, rest) = decode_binary(data, col)?;
            values.push(value);
            data = rest;
        }
        if !data.is_empty() {
            return Err(Error::InvalidPacket);
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Value of the first column whose alias is `name`
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|col| col.name == name)?;
        self.values.get(idx)
    }
}

impl std::ops::Index<usize> for Row {
    type Output = Value;

    fn index(&self, idx: usize) -> &Value {
        &self.values[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::{ColumnFlags, ColumnType};
    use crate::value::Duration;

    fn columns() -> Arc<[Column]> {
        Arc::from(vec![
            Column::new("id", ColumnType::MYSQL_TYPE_LONG, ColumnFlags::NOT_NULL_FLAG),
            Column::new("name", ColumnType::MYSQL_TYPE_VAR_STRING, ColumnFlags::empty()),
            Column::new("t", ColumnType::MYSQL_TYPE_TIME, ColumnFlags::empty()),
        ])
    }

    #[test]
    fn test_decode_text_row() {
        let row = Row::decode_text(columns(), TextRowPayload(b"\x0242\xFB\x0802:13:20")).unwrap();
        assert_eq!(row.len(), 3);
        assert_eq!(row[0], Value::Int(42));
        assert_eq!(row.get_by_name("name"), Some(&Value::Null));
        assert_eq!(row.get(2), Some(&Value::Time(Duration::from_secs(8000))));
        assert_eq!(row.get(3), None);
    }

    #[test]
    fn test_decode_text_row_with_missing_cell() {
        assert!(matches!(
            Row::decode_text(columns(), TextRowPayload(b"\x0242\xFB")),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn test_decode_binary_row() {
        // header, bitmap with column 1 NULL (bit 3), LONG 42, TIME 0 bytes
        let payload = [0x00, 0b0000_1000, 42, 0, 0, 0, 0];
        let row = Row::decode_binary(columns(), BinaryRowPayload::parse(&payload, 3).unwrap())
            .unwrap();
        assert_eq!(
            row.into_values(),
            vec![Value::Int(42), Value::Null, Value::Time(Duration::ZERO)]
        );
    }

    #[test]
    fn test_decode_binary_row_with_trailing_bytes() {
        let payload = [0x00, 0b0000_1000, 42, 0, 0, 0, 0, 9];
        assert!(matches!(
            Row::decode_binary(columns(), BinaryRowPayload::parse(&payload, 3).unwrap()),
            Err(Error::InvalidPacket)
        ));
    }
}
