use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::value::NullBitmap;

/// The payload part of a binary protocol row packet.
#[derive(Debug, Clone, Copy)]
pub struct BinaryRowPayload<'a> {
    null_bitmap: NullBitmap<'a>,
    values: &'a [u8],
    num_columns: usize,
}

impl<'a> BinaryRowPayload<'a> {
    /// Split a row packet into its null bitmap and value bytes
    pub fn parse(payload: &'a [u8], num_columns: usize) -> Result<Self> {
        let (header, data) = read_int_1(payload)?;
        if header != 0x00 {
            return Err(Error::InvalidPacket);
        }
        let (null_bitmap, values) =
            read_string_fix(data, NullBitmap::result_set_len(num_columns))?;
        Ok(Self {
            null_bitmap: NullBitmap::for_result_set(null_bitmap),
            values,
            num_columns,
        })
    }

    pub fn null_bitmap(&self) -> NullBitmap<'a> {
        self.null_bitmap
    }

    pub fn values(&self) -> &'a [u8] {
        self.values
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }
}

/// The payload part of a text protocol row packet.
#[derive(Debug, Clone, Copy)]
pub struct TextRowPayload<'a>(pub &'a [u8]);

impl<'a> TextRowPayload<'a> {
    /// Iterate over the cells of the row; `None` is SQL NULL
    pub fn cells(&self) -> TextCells<'a> {
        TextCells { rest: self.0 }
    }
}

pub struct TextCells<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for TextCells<'a> {
    type Item = Result<Option<&'a [u8]>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        Some(read_nullable_string_lenenc(self.rest).map(|(cell, rest)| {
            self.rest = rest;
            cell
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_cells() {
        // "", NULL, "NULL", "a"
        let payload = b"\x00\xFB\x04NULL\x01a";
        let cells: Vec<_> = TextRowPayload(payload)
            .cells()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            cells,
            vec![Some(&b""[..]), None, Some(&b"NULL"[..]), Some(&b"a"[..])]
        );
    }

    #[test]
    fn test_binary_row_parse() {
        // 3 columns: bitmap is 1 byte, column 1 is NULL (bit 3)
        let payload = [0x00, 0b0000_1000, 7, 9];
        let row = BinaryRowPayload::parse(&payload, 3).unwrap();
        assert!(!row.null_bitmap().is_null(0));
        assert!(row.null_bitmap().is_null(1));
        assert_eq!(row.values(), &[7, 9]);

        assert!(matches!(
            BinaryRowPayload::parse(&[0x01, 0x00], 3),
            Err(Error::InvalidPacket)
        ));
    }
}
