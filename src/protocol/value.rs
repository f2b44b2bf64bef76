//! Binary protocol cell layouts

use crate::constant::ColumnType;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// A single cell of a binary protocol row, borrowing from the row packet
#[derive(Debug, Clone, Copy)]
pub enum BinaryValue<'a> {
    /// NULL value
    Null,
    /// Signed integer (TINYINT, SMALLINT, INT, BIGINT)
    SignedInt(i64),
    /// Unsigned integer (TINYINT UNSIGNED, SMALLINT UNSIGNED, INT UNSIGNED, BIGINT UNSIGNED)
    UnsignedInt(u64),
    /// FLOAT - 4-byte floating point
    Float(f32),
    /// DOUBLE - 8-byte floating point
    Double(f64),
    /// DATE/DATETIME/TIMESTAMP - 0 bytes (0000-00-00 00:00:00)
    Timestamp0,
    /// DATE/DATETIME/TIMESTAMP - 4 bytes (ymd)
    Timestamp4(&'a Timestamp4),
    /// DATE/DATETIME/TIMESTAMP - 7 bytes (ymd + hms)
    Timestamp7(&'a Timestamp7),
    /// DATE/DATETIME/TIMESTAMP - 11 bytes (ymd + hms + microseconds)
    Timestamp11(&'a Timestamp11),
    /// TIME - 0 bytes (00:00:00)
    Time0,
    /// TIME - 8 bytes (without microseconds)
    Time8(&'a Time8),
    /// TIME - 12 bytes (with microseconds)
    Time12(&'a Time12),
    /// BLOB, GEOMETRY, STRING, VARCHAR, VAR_STRING, DECIMAL, ..
    Bytes(&'a [u8]),
}

fn read_layout<T: FromBytes + KnownLayout + Immutable>(data: &[u8]) -> Result<(&T, &[u8])> {
    T::ref_from_prefix(data).map_err(|_e| Error::UnexpectedEof)
}

impl<'a> BinaryValue<'a> {
    /// Parse a single binary protocol value based on column type and signedness
    ///
    /// Returns the parsed value and the remaining bytes
    pub fn parse(
        column_type: ColumnType,
        is_unsigned: bool,
        data: &'a [u8],
    ) -> Result<(Self, &'a [u8])> {
        match column_type {
            ColumnType::MYSQL_TYPE_NULL => Ok((BinaryValue::Null, data)),

            ColumnType::MYSQL_TYPE_TINY => {
                let (val, rest) = read_int_1(data)?;
                let value = if is_unsigned {
                    BinaryValue::UnsignedInt(val as u64)
                } else {
                    BinaryValue::SignedInt(val as i8 as i64)
                };
                Ok((value, rest))
            }

            ColumnType::MYSQL_TYPE_SHORT | ColumnType::MYSQL_TYPE_YEAR => {
                let (val, rest) = read_int_2(data)?;
                let value = if is_unsigned || column_type == ColumnType::MYSQL_TYPE_YEAR {
                    BinaryValue::UnsignedInt(val as u64)
                } else {
                    BinaryValue::SignedInt(val as i16 as i64)
                };
                Ok((value, rest))
            }

            ColumnType::MYSQL_TYPE_INT24 | ColumnType::MYSQL_TYPE_LONG => {
                let (val, rest) = read_int_4(data)?;
                let value = if is_unsigned {
                    BinaryValue::UnsignedInt(val as u64)
                } else {
                    BinaryValue::SignedInt(val as i32 as i64)
                };
                Ok((value, rest))
            }

            ColumnType::MYSQL_TYPE_LONGLONG => {
                let (val, rest) = read_int_8(data)?;
                let value = if is_unsigned {
                    BinaryValue::UnsignedInt(val)
                } else {
                    BinaryValue::SignedInt(val as i64)
                };
                Ok((value, rest))
            }

            ColumnType::MYSQL_TYPE_FLOAT => {
                let (val, rest) = read_int_4(data)?;
                Ok((BinaryValue::Float(f32::from_bits(val)), rest))
            }

            ColumnType::MYSQL_TYPE_DOUBLE => {
                let (val, rest) = read_int_8(data)?;
                Ok((BinaryValue::Double(f64::from_bits(val)), rest))
            }

            ColumnType::MYSQL_TYPE_DATE
            | ColumnType::MYSQL_TYPE_DATETIME
            | ColumnType::MYSQL_TYPE_TIMESTAMP
            | ColumnType::MYSQL_TYPE_TIMESTAMP2
            | ColumnType::MYSQL_TYPE_DATETIME2
            | ColumnType::MYSQL_TYPE_NEWDATE => {
                let (len, rest) = read_int_1(data)?;
                match len {
                    0 => Ok((BinaryValue::Timestamp0, rest)),
                    4 => {
                        let (ts, rest) = read_layout(rest)?;
                        Ok((BinaryValue::Timestamp4(ts), rest))
                    }
                    7 => {
                        let (ts, rest) = read_layout(rest)?;
                        Ok((BinaryValue::Timestamp7(ts), rest))
                    }
                    11 => {
                        let (ts, rest) = read_layout(rest)?;
                        Ok((BinaryValue::Timestamp11(ts), rest))
                    }
                    _ => Err(Error::InvalidPacket),
                }
            }

            ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => {
                let (len, rest) = read_int_1(data)?;
                match len {
                    0 => Ok((BinaryValue::Time0, rest)),
                    8 => {
                        let (time, rest) = read_layout(rest)?;
                        Ok((BinaryValue::Time8(time), rest))
                    }
                    12 => {
                        let (time, rest) = read_layout(rest)?;
                        Ok((BinaryValue::Time12(time), rest))
                    }
                    _ => Err(Error::InvalidPacket),
                }
            }

            ColumnType::MYSQL_TYPE_VARCHAR
            | ColumnType::MYSQL_TYPE_VAR_STRING
            | ColumnType::MYSQL_TYPE_STRING
            | ColumnType::MYSQL_TYPE_BLOB
            | ColumnType::MYSQL_TYPE_TINY_BLOB
            | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
            | ColumnType::MYSQL_TYPE_LONG_BLOB
            | ColumnType::MYSQL_TYPE_GEOMETRY
            | ColumnType::MYSQL_TYPE_JSON
            | ColumnType::MYSQL_TYPE_DECIMAL
            | ColumnType::MYSQL_TYPE_NEWDECIMAL
            | ColumnType::MYSQL_TYPE_ENUM
            | ColumnType::MYSQL_TYPE_SET
            | ColumnType::MYSQL_TYPE_BIT
            | ColumnType::MYSQL_TYPE_TYPED_ARRAY => {
                let (bytes, rest) = read_string_lenenc(data)?;
                Ok((BinaryValue::Bytes(bytes), rest))
            }
        }
    }
}

// ============================================================================
// Temporal Types
// ============================================================================

/// TIMESTAMP - 4 bytes (DATE/DATETIME/TIMESTAMP with date only)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct Timestamp4 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
}

/// TIMESTAMP - 7 bytes (DATE/DATETIME/TIMESTAMP without microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct Timestamp7 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// TIMESTAMP - 11 bytes (DATE/DATETIME/TIMESTAMP with microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct Timestamp11 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: U32LE,
}

/// TIME - 8 bytes: is_negative (1), days (4 LE), hour (1), minute (1), second (1)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct Time8 {
    pub is_negative: u8,
    pub days: U32LE,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// TIME - 12 bytes: the 8-byte layout followed by microsecond (4 LE)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct Time12 {
    pub is_negative: u8,
    pub days: U32LE,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: U32LE,
}

// ============================================================================
// NULL Bitmap
// ============================================================================

/// NULL bitmap for binary protocol
///
/// Each bit represents whether a column is NULL (1 = NULL, 0 = not NULL).
/// For result set rows the bitmap has an offset of 2 bits; for statement parameters the offset
/// is 0.
#[derive(Debug, Clone, Copy)]
pub struct NullBitmap<'a> {
    bitmap: &'a [u8],
    offset: usize,
}

impl<'a> NullBitmap<'a> {
    /// Number of bitmap bytes in a result set row with `num_columns` columns
    pub fn result_set_len(num_columns: usize) -> usize {
        (num_columns + 7 + 2) / 8
    }

    /// Number of bitmap bytes for `num_params` statement parameters
    pub fn parameters_len(num_params: usize) -> usize {
        num_params.div_ceil(8)
    }

    /// Create a NULL bitmap for result sets (offset = 2)
    pub fn for_result_set(bitmap: &'a [u8]) -> Self {
        Self { bitmap, offset: 2 }
    }

    /// Create a NULL bitmap for parameters (offset = 0)
    pub fn for_parameters(bitmap: &'a [u8]) -> Self {
        Self { bitmap, offset: 0 }
    }

    /// Check if the column at the given index is NULL
    pub fn is_null(&self, idx: usize) -> bool {
        let bit_pos = idx + self.offset;
        match self.bitmap.get(bit_pos >> 3) {
            Some(byte) => byte & (1 << (bit_pos & 7)) != 0,
            None => false,
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bitmap
    }
}

/// Set the NULL bit of parameter `idx` in a parameter bitmap (offset 0)
pub fn set_parameter_null(bitmap: &mut [u8], idx: usize) {
    if let Some(byte) = bitmap.get_mut(idx >> 3) {
        *byte |= 1 << (idx & 7);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signed_integers() {
        let (value, rest) = BinaryValue::parse(ColumnType::MYSQL_TYPE_TINY, false, &[214]).unwrap();
        assert!(matches!(value, BinaryValue::SignedInt(-42)));
        assert!(rest.is_empty());

        let (value, _) =
            BinaryValue::parse(ColumnType::MYSQL_TYPE_SHORT, false, &[0x18, 0xFC]).unwrap();
        assert!(matches!(value, BinaryValue::SignedInt(-1000)));

        let (value, _) =
            BinaryValue::parse(ColumnType::MYSQL_TYPE_LONG, false, &[0x60, 0x79, 0xFE, 0xFF])
                .unwrap();
        assert!(matches!(value, BinaryValue::SignedInt(-100000)));
    }

    #[test]
    fn test_parse_unsigned_integers() {
        let (value, _) = BinaryValue::parse(ColumnType::MYSQL_TYPE_TINY, true, &[200]).unwrap();
        assert!(matches!(value, BinaryValue::UnsignedInt(200)));

        let (value, _) =
            BinaryValue::parse(ColumnType::MYSQL_TYPE_LONGLONG, true, &[0xFF; 8]).unwrap();
        assert!(matches!(value, BinaryValue::UnsignedInt(u64::MAX)));
    }

    #[test]
    fn test_parse_time_with_days() {
        // negative, 1 day 12:30:45
        let mut data = vec![8u8, 1];
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&[12, 30, 45]);
        let (value, rest) = BinaryValue::parse(ColumnType::MYSQL_TYPE_TIME, false, &data).unwrap();
        let BinaryValue::Time8(time) = value else {
            panic!("expected Time8, got {value:?}");
        };
        assert_eq!(time.is_negative, 1);
        assert_eq!(time.days.get(), 1);
        assert_eq!((time.hour, time.minute, time.second), (12, 30, 45));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_truncated_timestamp() {
        // Declares 7 bytes but only carries 3
        let data = [7u8, 0xE8, 0x07, 12];
        assert!(matches!(
            BinaryValue::parse(ColumnType::MYSQL_TYPE_DATETIME, false, &data),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn test_parse_bad_time_length() {
        assert!(matches!(
            BinaryValue::parse(ColumnType::MYSQL_TYPE_TIME, false, &[5, 0, 0, 0, 0, 0]),
            Err(Error::InvalidPacket)
        ));
    }

    #[test]
    fn test_parse_with_remaining_data() {
        let data = [42u8, 0xFF, 0xFF];
        let (value, rest) = BinaryValue::parse(ColumnType::MYSQL_TYPE_TINY, true, &data).unwrap();
        assert!(matches!(value, BinaryValue::UnsignedInt(42)));
        assert_eq!(rest, &[0xFF, 0xFF]);
    }

    #[test]
    fn test_null_bitmap_result_set() {
        // With offset=2, bit 2 is column 0 and bit 12 is column 10
        let bitmap = [0b00000100, 0b00010000];
        let null_bitmap = NullBitmap::for_result_set(&bitmap);

        assert!(null_bitmap.is_null(0));
        assert!(!null_bitmap.is_null(1));
        assert!(!null_bitmap.is_null(2));
        assert!(null_bitmap.is_null(10));
        assert!(!null_bitmap.is_null(40));
    }

    #[test]
    fn test_null_bitmap_lengths() {
        assert_eq!(NullBitmap::result_set_len(1), 1);
        assert_eq!(NullBitmap::result_set_len(6), 1);
        assert_eq!(NullBitmap::result_set_len(7), 2);
        assert_eq!(NullBitmap::parameters_len(0), 0);
        assert_eq!(NullBitmap::parameters_len(8), 1);
        assert_eq!(NullBitmap::parameters_len(9), 2);
    }

    #[test]
    fn test_parameter_bitmap() {
        let mut bitmap = vec![0u8; NullBitmap::parameters_len(3)];
        set_parameter_null(&mut bitmap, 0);
        set_parameter_null(&mut bitmap, 2);
        assert_eq!(bitmap, [0b00000101]);
        let null_bitmap = NullBitmap::for_parameters(&bitmap);
        assert!(null_bitmap.is_null(2));
        assert!(!null_bitmap.is_null(1));
    }
}
