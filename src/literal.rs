//! SQL literal rendering of values, for statements sent over the text protocol

use std::fmt::Write;

use crate::error::{Error, Result};
use crate::value::Value;

/// Render `value` as a SQL literal.
///
/// `no_backslash_escapes` mirrors `SERVER_STATUS_NO_BACKSLASH_ESCAPES`: when set, the server
/// treats backslashes literally and only `'` is escaped (by doubling).
pub fn literal(value: &Value, no_backslash_escapes: bool) -> Result<String> {
    let mut out = String::new();
    write_literal(&mut out, value, no_backslash_escapes)?;
    Ok(out)
}

/// Append the literal of `value` to `out`
pub fn write_literal(out: &mut String, value: &Value, no_backslash_escapes: bool) -> Result<()> {
    match value {
        Value::Null => out.push_str("NULL"),
        Value::Int(v) => write!(out, "{}", v).map_err(Error::from_debug)?,
        Value::UInt(v) => write!(out, "{}", v).map_err(Error::from_debug)?,
        // Debug formatting is the shortest text that parses back to the same float
        Value::Float(v) => {
            if !v.is_finite() {
                return Err(non_finite(*v as f64));
            }
            write!(out, "{:?}", v).map_err(Error::from_debug)?;
        }
        Value::Double(v) => {
            if !v.is_finite() {
                return Err(non_finite(*v));
            }
            write!(out, "{:?}", v).map_err(Error::from_debug)?;
        }
        Value::Decimal(v) => {
            if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit() || b"+-.eE".contains(&b)) {
                return Err(Error::BadUsageError(format!("invalid decimal: {:?}", v)));
            }
            out.push_str(v);
        }
        Value::Text(v) => escape_string(out, v, no_backslash_escapes),
        Value::Bytes(v) => {
            out.push_str("X'");
            for byte in v {
                write!(out, "{:02X}", byte).map_err(Error::from_debug)?;
            }
            out.push('\'');
        }
        Value::Date(v) => quote_display(out, v)?,
        Value::DateTime(v) => quote_display(out, v)?,
        Value::Time(v) => quote_display(out, v)?,
    }
    Ok(())
}

fn non_finite(v: f64) -> Error {
    Error::BadUsageError(format!("{} has no SQL literal", v))
}

fn quote_display(out: &mut String, v: impl std::fmt::Display) -> Result<()> {
    write!(out, "'{}'", v).map_err(Error::from_debug)
}

/// Quote `s`, escaping it the way the server's tokenizer expects
pub fn escape_string(out: &mut String, s: &str, no_backslash_escapes: bool) {
    out.reserve(s.len() + 2);
    out.push('\'');
    if no_backslash_escapes {
        for ch in s.chars() {
            if ch == '\'' {
                out.push_str("''");
            } else {
                out.push(ch);
            }
        }
    } else {
        for ch in s.chars() {
            match ch {
                '\0' => out.push_str("\\0"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\\' => out.push_str("\\\\"),
                '\'' => out.push_str("\\'"),
                '"' => out.push_str("\\\""),
                '\x1a' => out.push_str("\\Z"),
                _ => out.push(ch),
            }
        }
    }
    out.push('\'');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Date, DateTime, Duration};
    use pretty_assertions::assert_eq;

    fn lit(value: impl Into<Value>) -> String {
        literal(&value.into(), false).unwrap()
    }

    #[test]
    fn test_literal_numbers_and_strings() {
        assert_eq!(lit(2), "2");
        assert_eq!(lit(3.1415), "3.1415");
        assert_eq!(lit("foo"), "'foo'");
        assert_eq!(lit(u64::MAX), "18446744073709551615");
        assert_eq!(lit(-7i8), "-7");
        assert_eq!(lit(1.0), "1.0");
        assert_eq!(lit(0.1f32), "0.1");
        assert_eq!(lit(None::<i32>), "NULL");
    }

    #[test]
    fn test_literal_escapes() {
        assert_eq!(lit("it's"), r"'it\'s'");
        assert_eq!(lit("a\\b"), r"'a\\b'");
        assert_eq!(lit("x\0y\n\r\"\x1a"), r#"'x\0y\n\r\"\Z'"#);
        assert_eq!(
            literal(&Value::from("it's a\\b"), true).unwrap(),
            r"'it''s a\b'"
        );
    }

    #[test]
    fn test_literal_rejects_non_finite_floats() {
        assert!(matches!(
            literal(&Value::Double(f64::NAN), false),
            Err(Error::BadUsageError(_))
        ));
        assert!(matches!(
            literal(&Value::Float(f32::INFINITY), false),
            Err(Error::BadUsageError(_))
        ));
    }

    #[test]
    fn test_literal_other_types() {
        assert_eq!(lit(vec![0xDEu8, 0x01]), "X'DE01'");
        assert_eq!(lit(Date::new(2024, 2, 29)), "'2024-02-29'");
        assert_eq!(
            lit(DateTime::new(Date::new(2024, 2, 29), 1, 2, 3, 0)),
            "'2024-02-29 01:02:03'"
        );
        assert_eq!(lit(Duration::from_secs(-8000)), "'-02:13:20'");
        assert_eq!(
            literal(&Value::Decimal("-12.50".to_string()), false).unwrap(),
            "-12.50"
        );
        assert!(literal(&Value::Decimal("1; DROP".to_string()), false).is_err());
    }

    #[test]
    fn test_write_literal_appends() {
        let mut out = String::from("VALUES (");
        for value in [Value::Int(-1), Value::Double(2.5), Value::Bytes(vec![0x0A])] {
            write_literal(&mut out, &value, false).unwrap();
            out.push(',');
        }
        write_literal(&mut out, &Value::Time(Duration::from_secs(90)), false).unwrap();
        out.push(')');
        assert_eq!(out, "VALUES (-1,2.5,X'0A','00:01:30')");
    }
}
