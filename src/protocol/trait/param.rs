use crate::constant::ColumnType;
use crate::error::Result;
use crate::protocol::primitive::*;
use crate::value::{Date, DateTime, Duration, Value};

/// Trait for encoding a single parameter in prepared statements
///
/// # Examples
/// - (42i32, 100u64)
/// - (1i32, 3.14f64, "hello")
/// - ("test", None::<String>)  // NULL string
/// - [1, 2, 3]
pub trait Param {
    /// Returns true if this parameter is NULL
    fn is_null(&self) -> bool {
        false
    }

    /// Encode parameter type
    ///
    /// Format:
    /// - Byte 0: MySQL type (MYSQL_TYPE_*)
    /// - Byte 1: Unsigned flag (0x80 if unsigned, 0x00 otherwise)
    fn encode_type(&self, out: &mut Vec<u8>);

    /// Encode parameter value (binary encoded)
    ///
    /// Only called if is_null() returns false.
    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()>;
}

fn write_type(out: &mut Vec<u8>, column_type: ColumnType, is_unsigned: bool) {
    out.push(column_type as u8);
    out.push(if is_unsigned { 0x80 } else { 0x00 });
}

impl Param for Value {
    fn is_null(&self) -> bool {
        Value::is_null(self)
    }

    fn encode_type(&self, out: &mut Vec<u8>) {
        let (column_type, is_unsigned) = self.binary_type();
        write_type(out, column_type, is_unsigned);
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        self.encode_binary(out)
    }
}

macro_rules! impl_param_int {
    ($($t:ty => $column_type:ident, $unsigned:expr, $write:ident as $wire:ty;)*) => {
        $(
            impl Param for $t {
                fn encode_type(&self, out: &mut Vec<u8>) {
                    write_type(out, ColumnType::$column_type, $unsigned);
                }

                fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
                    $write(out, *self as $wire);
                    Ok(())
                }
            }
        )*
    };
}

impl_param_int! {
    i8 => MYSQL_TYPE_TINY, false, write_int_1 as u8;
    i16 => MYSQL_TYPE_SHORT, false, write_int_2 as u16;
    i32 => MYSQL_TYPE_LONG, false, write_int_4 as u32;
    i64 => MYSQL_TYPE_LONGLONG, false, write_int_8 as u64;
    u8 => MYSQL_TYPE_TINY, true, write_int_1 as u8;
    u16 => MYSQL_TYPE_SHORT, true, write_int_2 as u16;
    u32 => MYSQL_TYPE_LONG, true, write_int_4 as u32;
    u64 => MYSQL_TYPE_LONGLONG, true, write_int_8 as u64;
}

impl Param for bool {
    fn encode_type(&self, out: &mut Vec<u8>) {
        write_type(out, ColumnType::MYSQL_TYPE_TINY, false);
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_1(out, *self as u8);
        Ok(())
    }
}

impl Param for f32 {
    fn encode_type(&self, out: &mut Vec<u8>) {
        write_type(out, ColumnType::MYSQL_TYPE_FLOAT, false);
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_4(out, self.to_bits());
        Ok(())
    }
}

impl Param for f64 {
    fn encode_type(&self, out: &mut Vec<u8>) {
        write_type(out, ColumnType::MYSQL_TYPE_DOUBLE, false);
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_8(out, self.to_bits());
        Ok(())
    }
}

impl Param for str {
    fn encode_type(&self, out: &mut Vec<u8>) {
        write_type(out, ColumnType::MYSQL_TYPE_VAR_STRING, false);
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_bytes_lenenc(out, self.as_bytes());
        Ok(())
    }
}

impl Param for String {
    fn encode_type(&self, out: &mut Vec<u8>) {
        self.as_str().encode_type(out);
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        self.as_str().encode_value(out)
    }
}

impl Param for [u8] {
    fn encode_type(&self, out: &mut Vec<u8>) {
        write_type(out, ColumnType::MYSQL_TYPE_BLOB, false);
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_bytes_lenenc(out, self);
        Ok(())
    }
}

impl Param for Vec<u8> {
    fn encode_type(&self, out: &mut Vec<u8>) {
        self.as_slice().encode_type(out);
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        self.as_slice().encode_value(out)
    }
}

macro_rules! impl_param_via_value {
    ($($t:ty),*) => {
        $(
            impl Param for $t {
                fn encode_type(&self, out: &mut Vec<u8>) {
                    Value::from(*self).encode_type(out);
                }

                fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
                    Value::from(*self).encode_binary(out)
                }
            }
        )*
    };
}

impl_param_via_value!(Date, DateTime, Duration);

impl<T: Param + ?Sized> Param for &T {
    fn is_null(&self) -> bool {
        (**self).is_null()
    }

    fn encode_type(&self, out: &mut Vec<u8>) {
        (**self).encode_type(out)
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        (**self).encode_value(out)
    }
}

impl<T: Param> Param for Option<T> {
    fn is_null(&self) -> bool {
        match self {
            Some(v) => v.is_null(),
            None => true,
        }
    }

    fn encode_type(&self, out: &mut Vec<u8>) {
        match self {
            Some(v) => v.encode_type(out),
            None => write_type(out, ColumnType::MYSQL_TYPE_NULL, false),
        }
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Some(v) => v.encode_value(out),
            None => Ok(()),
        }
    }
}
