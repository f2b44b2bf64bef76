//! Owned cell values and the conversions between them and the text and binary row encodings

use std::fmt;

use crate::col::Column;
use crate::constant::{ColumnType, TextEncoding, collation_encoding};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::value::{BinaryValue, Time8, Time12, Timestamp4, Timestamp7, Timestamp11};
use zerocopy::IntoBytes;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// A decoded cell, or a statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    /// DECIMAL/NEWDECIMAL, kept as the server's exact text
    Decimal(String),
    Bytes(Vec<u8>),
    Text(String),
    Date(Date),
    DateTime(DateTime),
    Time(Duration),
}

/// DATE. `0000-00-00` is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// DATETIME and TIMESTAMP
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DateTime {
    pub date: Date,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
}

/// TIME as a signed offset in microseconds.
///
/// MySQL TIME ranges over ±838:59:59.999999, so hours are not bounded by a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration {
    micros: i64,
}

impl Date {
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    pub fn is_zero(&self) -> bool {
        self.year == 0 && self.month == 0 && self.day == 0
    }
}

impl DateTime {
    pub fn new(date: Date, hour: u8, minute: u8, second: u8, microsecond: u32) -> Self {
        Self {
            date,
            hour,
            minute,
            second,
            microsecond,
        }
    }

    fn has_time(&self) -> bool {
        self.hour != 0 || self.minute != 0 || self.second != 0 || self.microsecond != 0
    }
}

impl Duration {
    pub const ZERO: Duration = Duration { micros: 0 };

    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    pub fn from_secs(secs: i64) -> Self {
        Self {
            micros: secs * MICROS_PER_SECOND,
        }
    }

    /// Build from a sign and unsigned components; `hours` may exceed 24.
    /// Offsets beyond the `i64` microsecond range saturate.
    pub fn from_parts(negative: bool, hours: u32, minutes: u8, seconds: u8, micros: u32) -> Self {
        Self::checked_from_parts(negative, u64::from(hours), minutes, seconds, micros).unwrap_or(
            Self {
                micros: if negative { i64::MIN } else { i64::MAX },
            },
        )
    }

    /// Like [`Duration::from_parts`], but `None` when the offset does not fit
    pub fn checked_from_parts(
        negative: bool,
        hours: u64,
        minutes: u8,
        seconds: u8,
        micros: u32,
    ) -> Option<Self> {
        let secs = hours
            .checked_mul(3600)?
            .checked_add(u64::from(minutes) * 60 + u64::from(seconds))?;
        let magnitude = i64::try_from(secs)
            .ok()?
            .checked_mul(MICROS_PER_SECOND)?
            .checked_add(i64::from(micros))?;
        Some(Self {
            micros: if negative { -magnitude } else { magnitude },
        })
    }

    pub fn as_micros(&self) -> i64 {
        self.micros
    }

    /// Whole seconds, truncated toward zero
    pub fn as_secs(&self) -> i64 {
        self.micros / MICROS_PER_SECOND
    }

    pub fn is_negative(&self) -> bool {
        self.micros < 0
    }

    /// (negative, total hours, minutes, seconds, microseconds)
    pub fn parts(&self) -> (bool, u64, u8, u8, u32) {
        let magnitude = self.micros.unsigned_abs();
        let micros = (magnitude % MICROS_PER_SECOND as u64) as u32;
        let total_secs = magnitude / MICROS_PER_SECOND as u64;
        let seconds = (total_secs % 60) as u8;
        let minutes = (total_secs / 60 % 60) as u8;
        let hours = total_secs / 3600;
        (self.is_negative(), hours, minutes, seconds, micros)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}:{:02}:{:02}",
            self.date, self.hour, self.minute, self.second
        )?;
        if self.microsecond != 0 {
            write!(f, ".{:06}", self.microsecond)?;
        }
        Ok(())
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (negative, hours, minutes, seconds, micros) = self.parts();
        if negative {
            f.write_str("-")?;
        }
        write!(f, "{:02}:{:02}:{:02}", hours, minutes, seconds)?;
        if micros != 0 {
            write!(f, ".{:06}", micros)?;
        }
        Ok(())
    }
}

// ============================================================================
// Text parsing
// ============================================================================

fn bad_text(kind: &str, text: &str) -> Error {
    Error::BadUsageError(format!("invalid {} value: {:?}", kind, text))
}

fn parse_num<T: std::str::FromStr>(kind: &str, text: &str) -> Result<T> {
    text.parse().map_err(|_e| bad_text(kind, text))
}

/// Parse `.ffffff` with 1 to 6 digits into microseconds
fn parse_fraction(text: &str) -> Result<u32> {
    if text.is_empty() || text.len() > 6 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_text("fraction", text));
    }
    let digits: u32 = parse_num("fraction", text)?;
    Ok(digits * 10u32.pow(6 - text.len() as u32))
}

fn split_fraction(text: &str) -> Result<(&str, u32)> {
    match text.split_once('.') {
        Some((whole, fraction)) => Ok((whole, parse_fraction(fraction)?)),
        None => Ok((text, 0)),
    }
}

impl std::str::FromStr for Date {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut parts = text.splitn(3, '-');
        let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(bad_text("DATE", text));
        };
        Ok(Date {
            year: parse_num("DATE", year)?,
            month: parse_num("DATE", month)?,
            day: parse_num("DATE", day)?,
        })
    }
}

impl std::str::FromStr for DateTime {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let (date, time) = match text.split_once([' ', 'T']) {
            Some((date, time)) => (date, time),
            None => (text, "00:00:00"),
        };
        let date: Date = date.parse()?;
        let (time, microsecond) = split_fraction(time)?;
        let mut hms = time.splitn(3, ':');
        let (Some(hour), Some(minute), Some(second)) = (hms.next(), hms.next(), hms.next()) else {
            return Err(bad_text("DATETIME", text));
        };
        Ok(DateTime {
            date,
            hour: parse_num("DATETIME", hour)?,
            minute: parse_num("DATETIME", minute)?,
            second: parse_num("DATETIME", second)?,
            microsecond,
        })
    }
}

impl std::str::FromStr for Duration {
    type Err = Error;

    /// Accepts `[-]H+:MM:SS[.ffffff]` and `[-]D HH:MM:SS[.ffffff]`
    fn from_str(text: &str) -> Result<Self> {
        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (days, rest) = match rest.split_once(' ') {
            Some((days, rest)) => (parse_num::<u32>("TIME", days)?, rest),
            None => (0, rest),
        };
        let (rest, micros) = split_fraction(rest)?;
        let mut hms = rest.splitn(3, ':');
        let (Some(hours), Some(minutes), Some(seconds)) = (hms.next(), hms.next(), hms.next())
        else {
            return Err(bad_text("TIME", text));
        };
        let hours: u32 = parse_num("TIME", hours)?;
        let minutes: u8 = parse_num("TIME", minutes)?;
        let seconds: u8 = parse_num("TIME", seconds)?;
        if minutes >= 60 || seconds >= 60 {
            return Err(bad_text("TIME", text));
        }
        let hours = u64::from(days) * 24 + u64::from(hours);
        Duration::checked_from_parts(negative, hours, minutes, seconds, micros)
            .ok_or_else(|| bad_text("TIME", text))
    }
}

// ============================================================================
// Decoding
// ============================================================================

fn utf8(bytes: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(bytes)
        .map_err(|_e| Error::BadUsageError("column value is not valid UTF-8".to_string()))
}

/// Bytes of a string-like column, decoded by the column's character set.
/// JSON columns report the binary charset but always carry UTF-8.
fn string_like(bytes: &[u8], col: &Column) -> Result<Value> {
    if col.column_type == ColumnType::MYSQL_TYPE_JSON {
        return Ok(Value::Text(utf8(bytes)?.to_string()));
    }
    Ok(match collation_encoding(col.charset) {
        TextEncoding::Binary => Value::Bytes(bytes.to_vec()),
        TextEncoding::Utf8 => Value::Text(utf8(bytes)?.to_string()),
        TextEncoding::Latin1 => Value::Text(bytes.iter().copied().map(char::from).collect()),
        TextEncoding::Other => match simdutf8::basic::from_utf8(bytes) {
            Ok(text) => Value::Text(text.to_string()),
            Err(_) => Value::Bytes(bytes.to_vec()),
        },
    })
}

/// Decode a non-NULL text protocol cell
pub fn decode_text(bytes: &[u8], col: &Column) -> Result<Value> {
    match col.column_type {
        ColumnType::MYSQL_TYPE_NULL => Ok(Value::Null),

        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_LONGLONG => {
            let text = utf8(bytes)?;
            if col.is_unsigned() {
                Ok(Value::UInt(parse_num("integer", text)?))
            } else {
                Ok(Value::Int(parse_num("integer", text)?))
            }
        }
        ColumnType::MYSQL_TYPE_YEAR => Ok(Value::UInt(parse_num("YEAR", utf8(bytes)?)?)),

        ColumnType::MYSQL_TYPE_FLOAT => Ok(Value::Float(parse_num("FLOAT", utf8(bytes)?)?)),
        ColumnType::MYSQL_TYPE_DOUBLE => Ok(Value::Double(parse_num("DOUBLE", utf8(bytes)?)?)),
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
            Ok(Value::Decimal(utf8(bytes)?.to_string()))
        }

        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => {
            Ok(Value::Date(utf8(bytes)?.parse()?))
        }
        ColumnType::MYSQL_TYPE_DATETIME
        | ColumnType::MYSQL_TYPE_DATETIME2
        | ColumnType::MYSQL_TYPE_TIMESTAMP
        | ColumnType::MYSQL_TYPE_TIMESTAMP2 => Ok(Value::DateTime(utf8(bytes)?.parse()?)),
        ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => {
            Ok(Value::Time(utf8(bytes)?.parse()?))
        }

        ColumnType::MYSQL_TYPE_BIT | ColumnType::MYSQL_TYPE_GEOMETRY => {
            Ok(Value::Bytes(bytes.to_vec()))
        }

        ColumnType::MYSQL_TYPE_VARCHAR
        | ColumnType::MYSQL_TYPE_VAR_STRING
        | ColumnType::MYSQL_TYPE_STRING
        | ColumnType::MYSQL_TYPE_BLOB
        | ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_LONG_BLOB
        | ColumnType::MYSQL_TYPE_JSON
        | ColumnType::MYSQL_TYPE_ENUM
        | ColumnType::MYSQL_TYPE_SET
        | ColumnType::MYSQL_TYPE_TYPED_ARRAY => string_like(bytes, col),
    }
}

fn date_value(col: &Column, datetime: DateTime) -> Value {
    match col.column_type {
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => Value::Date(datetime.date),
        _ => Value::DateTime(datetime),
    }
}

fn binary_time(negative: bool, days: u32, hour: u8, minute: u8, second: u8, micros: u32) -> Result<Value> {
    let hours = u64::from(days) * 24 + u64::from(hour);
    Duration::checked_from_parts(negative, hours, minute, second, micros)
        .map(Value::Time)
        .ok_or(Error::InvalidPacket)
}

/// Decode a non-NULL binary protocol cell, returning the value and the remaining row bytes
pub fn decode_binary<'a>(data: &'a [u8], col: &Column) -> Result<(Value, &'a [u8])> {
    let (raw, rest) = BinaryValue::parse(col.column_type, col.is_unsigned(), data)?;
    let value = match raw {
        BinaryValue::Null => Value::Null,
        BinaryValue::SignedInt(v) => Value::Int(v),
        BinaryValue::UnsignedInt(v) => Value::UInt(v),
        BinaryValue::Float(v) => Value::Float(v),
        BinaryValue::Double(v) => Value::Double(v),
        BinaryValue::Timestamp0 => date_value(col, DateTime::default()),
        BinaryValue::Timestamp4(ts) => date_value(
            col,
            DateTime {
                date: Date::new(ts.year.get(), ts.month, ts.day),
                ..DateTime::default()
            },
        ),
        BinaryValue::Timestamp7(ts) => date_value(
            col,
            DateTime::new(
                Date::new(ts.year.get(), ts.month, ts.day),
                ts.hour,
                ts.minute,
                ts.second,
                0,
            ),
        ),
        BinaryValue::Timestamp11(ts) => date_value(
            col,
            DateTime::new(
                Date::new(ts.year.get(), ts.month, ts.day),
                ts.hour,
                ts.minute,
                ts.second,
                ts.microsecond.get(),
            ),
        ),
        BinaryValue::Time0 => Value::Time(Duration::ZERO),
        BinaryValue::Time8(t) => {
            binary_time(t.is_negative != 0, t.days.get(), t.hour, t.minute, t.second, 0)?
        }
        BinaryValue::Time12(t) => binary_time(
            t.is_negative != 0,
            t.days.get(),
            t.hour,
            t.minute,
            t.second,
            t.microsecond.get(),
        )?,
        BinaryValue::Bytes(bytes) => match col.column_type {
            ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                Value::Decimal(utf8(bytes)?.to_string())
            }
            ColumnType::MYSQL_TYPE_BIT | ColumnType::MYSQL_TYPE_GEOMETRY => {
                Value::Bytes(bytes.to_vec())
            }
            _ => string_like(bytes, col)?,
        },
    };
    Ok((value, rest))
}

// ============================================================================
// Encoding
// ============================================================================

fn mismatch(value: &Value, column_type: ColumnType) -> Error {
    Error::BadUsageError(format!("cannot encode {:?} as {:?}", value, column_type))
}

fn out_of_range(value: &Value, column_type: ColumnType) -> Error {
    Error::BadUsageError(format!("{:?} is out of range for {:?}", value, column_type))
}

fn write_temporal(out: &mut Vec<u8>, datetime: &DateTime) {
    let date = &datetime.date;
    if !datetime.has_time() {
        if date.is_zero() {
            out.push(0);
            return;
        }
        out.push(4);
        out.extend_from_slice(
            Timestamp4 {
                year: date.year.into(),
                month: date.month,
                day: date.day,
            }
            .as_bytes(),
        );
    } else if datetime.microsecond == 0 {
        out.push(7);
        out.extend_from_slice(
            Timestamp7 {
                year: date.year.into(),
                month: date.month,
                day: date.day,
                hour: datetime.hour,
                minute: datetime.minute,
                second: datetime.second,
            }
            .as_bytes(),
        );
    } else {
        out.push(11);
        out.extend_from_slice(
            Timestamp11 {
                year: date.year.into(),
                month: date.month,
                day: date.day,
                hour: datetime.hour,
                minute: datetime.minute,
                second: datetime.second,
                microsecond: datetime.microsecond.into(),
            }
            .as_bytes(),
        );
    }
}

fn write_time(out: &mut Vec<u8>, duration: &Duration) -> Result<()> {
    let (negative, hours, minute, second, micros) = duration.parts();
    if hours == 0 && minute == 0 && second == 0 && micros == 0 {
        out.push(0);
        return Ok(());
    }
    let days = u32::try_from(hours / 24)
        .map_err(|_e| out_of_range(&Value::Time(*duration), ColumnType::MYSQL_TYPE_TIME))?;
    let hour = (hours % 24) as u8;
    if micros == 0 {
        out.push(8);
        out.extend_from_slice(
            Time8 {
                is_negative: negative as u8,
                days: days.into(),
                hour,
                minute,
                second,
            }
            .as_bytes(),
        );
    } else {
        out.push(12);
        out.extend_from_slice(
            Time12 {
                is_negative: negative as u8,
                days: days.into(),
                hour,
                minute,
                second,
                microsecond: micros.into(),
            }
            .as_bytes(),
        );
    }
    Ok(())
}

/// Integer value of `value` checked against `[min, max]`
fn integer_in(value: &Value, column_type: ColumnType, min: i128, max: i128) -> Result<i128> {
    let v = match value {
        Value::Int(v) => *v as i128,
        Value::UInt(v) => *v as i128,
        _ => return Err(mismatch(value, column_type)),
    };
    if v < min || v > max {
        return Err(out_of_range(value, column_type));
    }
    Ok(v)
}

/// Encode a non-NULL value in the binary layout of `column_type`.
///
/// Integers are range-checked against the column width and signedness. NULL writes nothing;
/// its presence is carried by the null bitmap.
pub fn encode_binary(
    value: &Value,
    column_type: ColumnType,
    is_unsigned: bool,
    out: &mut Vec<u8>,
) -> Result<()> {
    if let Value::Null = value {
        return Ok(());
    }
    let bounds = |bits: u32| -> (i128, i128) {
        if is_unsigned {
            (0, (1i128 << bits) - 1)
        } else {
            (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
        }
    };
    match column_type {
        ColumnType::MYSQL_TYPE_NULL => {}
        ColumnType::MYSQL_TYPE_TINY => {
            let (min, max) = bounds(8);
            let v = integer_in(value, column_type, min, max)?;
            write_int_1(out, v as u8);
        }
        ColumnType::MYSQL_TYPE_SHORT | ColumnType::MYSQL_TYPE_YEAR => {
            let (min, max) = bounds(16);
            let v = integer_in(value, column_type, min, max)?;
            write_int_2(out, v as u16);
        }
        ColumnType::MYSQL_TYPE_INT24 => {
            let (min, max) = bounds(24);
            let v = integer_in(value, column_type, min, max)?;
            write_int_4(out, v as u32);
        }
        ColumnType::MYSQL_TYPE_LONG => {
            let (min, max) = bounds(32);
            let v = integer_in(value, column_type, min, max)?;
            write_int_4(out, v as u32);
        }
        ColumnType::MYSQL_TYPE_LONGLONG => {
            let (min, max) = bounds(64);
            let v = integer_in(value, column_type, min, max)?;
            write_int_8(out, v as u64);
        }
        ColumnType::MYSQL_TYPE_FLOAT => match value {
            Value::Float(v) => write_int_4(out, v.to_bits()),
            _ => return Err(mismatch(value, column_type)),
        },
        ColumnType::MYSQL_TYPE_DOUBLE => match value {
            Value::Double(v) => write_int_8(out, v.to_bits()),
            Value::Float(v) => write_int_8(out, (*v as f64).to_bits()),
            _ => return Err(mismatch(value, column_type)),
        },
        ColumnType::MYSQL_TYPE_DATE
        | ColumnType::MYSQL_TYPE_NEWDATE
        | ColumnType::MYSQL_TYPE_DATETIME
        | ColumnType::MYSQL_TYPE_DATETIME2
        | ColumnType::MYSQL_TYPE_TIMESTAMP
        | ColumnType::MYSQL_TYPE_TIMESTAMP2 => match value {
            Value::Date(date) => write_temporal(
                out,
                &DateTime {
                    date: *date,
                    ..DateTime::default()
                },
            ),
            Value::DateTime(datetime) => write_temporal(out, datetime),
            _ => return Err(mismatch(value, column_type)),
        },
        ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => match value {
            Value::Time(duration) => write_time(out, duration)?,
            _ => return Err(mismatch(value, column_type)),
        },
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
            if let Some(bytes) = value.encode_text() {
                write_bytes_lenenc(out, &bytes);
            }
        }
    }
    Ok(())
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The parameter type announced for this value in COM_STMT_EXECUTE, and its unsigned flag
    pub fn binary_type(&self) -> (ColumnType, bool) {
        match self {
            Value::Null => (ColumnType::MYSQL_TYPE_NULL, false),
            Value::Int(_) => (ColumnType::MYSQL_TYPE_LONGLONG, false),
            Value::UInt(_) => (ColumnType::MYSQL_TYPE_LONGLONG, true),
            Value::Float(_) => (ColumnType::MYSQL_TYPE_FLOAT, false),
            Value::Double(_) => (ColumnType::MYSQL_TYPE_DOUBLE, false),
            Value::Decimal(_) => (ColumnType::MYSQL_TYPE_NEWDECIMAL, false),
            Value::Bytes(_) => (ColumnType::MYSQL_TYPE_BLOB, false),
            Value::Text(_) => (ColumnType::MYSQL_TYPE_VAR_STRING, false),
            Value::Date(_) => (ColumnType::MYSQL_TYPE_DATE, false),
            Value::DateTime(_) => (ColumnType::MYSQL_TYPE_DATETIME, false),
            Value::Time(_) => (ColumnType::MYSQL_TYPE_TIME, false),
        }
    }

    /// Encode in the binary layout of [`Value::binary_type`]
    pub fn encode_binary(&self, out: &mut Vec<u8>) -> Result<()> {
        let (column_type, is_unsigned) = self.binary_type();
        encode_binary(self, column_type, is_unsigned, out)
    }

    /// The text protocol form of the value, or `None` for NULL
    pub fn encode_text(&self) -> Option<Vec<u8>> {
        let bytes = match self {
            Value::Null => return None,
            Value::Int(v) => v.to_string().into_bytes(),
            Value::UInt(v) => v.to_string().into_bytes(),
            Value::Float(v) => format!("{:?}", v).into_bytes(),
            Value::Double(v) => format!("{:?}", v).into_bytes(),
            Value::Decimal(v) => v.clone().into_bytes(),
            Value::Bytes(v) => v.clone(),
            Value::Text(v) => v.clone().into_bytes(),
            Value::Date(v) => v.to_string().into_bytes(),
            Value::DateTime(v) => v.to_string().into_bytes(),
            Value::Time(v) => v.to_string().into_bytes(),
        };
        Some(bytes)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            Value::Decimal(v) => v.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) | Value::Decimal(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            Value::Text(v) | Value::Decimal(v) => Some(v.as_bytes()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Value::Date(v) => Some(*v),
            Value::DateTime(v) => Some(v.date),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime> {
        match self {
            Value::DateTime(v) => Some(*v),
            Value::Date(v) => Some(DateTime {
                date: *v,
                ..DateTime::default()
            }),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Time(v) => Some(*v),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v as $target)
                }
            }
        )*
    };
}

impl_from!(Int as i64: i8, i16, i32, i64);
impl_from!(UInt as u64: u8, u16, u32, u64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Date> for Value {
    fn from(v: Date) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime> for Value {
    fn from(v: DateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Time(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
