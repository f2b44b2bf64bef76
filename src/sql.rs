//! Statement-shape classification and client-side `%s` interpolation

use crate::error::{Error, Result};
use crate::literal::write_literal;
use crate::value::Value;

/// Split an `INSERT ... VALUES (...)` statement around its row tuple.
///
/// Returns `(head, tuple, tail)` where `tuple` is the parenthesized row following the `VALUES`
/// keyword. The keyword must be preceded by whitespace and is matched case-insensitively.
/// Parentheses inside single-quoted strings do not count.
pub fn split_insert_values(query: &str) -> Option<(&str, &str, &str)> {
    let bytes = query.as_bytes();
    let mut search_from = 0;
    while let Some(found) = find_ascii_case_insensitive(&bytes[search_from..], b"values") {
        let keyword = search_from + found;
        search_from = keyword + 1;
        if keyword == 0 || !bytes[keyword - 1].is_ascii_whitespace() {
            continue;
        }
        let mut open = keyword + b"values".len();
        while open < bytes.len() && bytes[open].is_ascii_whitespace() {
            open += 1;
        }
        if bytes.get(open) != Some(&b'(') {
            continue;
        }
        let close = matching_paren(bytes, open)?;
        return Some((&query[..open], &query[open..=close], &query[close + 1..]));
    }
    None
}

/// The row tuple of an `INSERT ... VALUES (...)` statement, if the statement has that shape
pub fn insert_values(query: &str) -> Option<&str> {
    split_insert_values(query).map(|(_, tuple, _)| tuple)
}

fn find_ascii_case_insensitive(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

/// Index of the `)` closing the `(` at `open`
fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_quote {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'\'' => in_quote = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'\'' => in_quote = true,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Substitute each `%s` in `template` with the literal of the next argument; `%%` is a `%`.
///
/// The number of `%s` placeholders must equal `args.len()`.
pub fn interpolate(template: &str, args: &[Value], no_backslash_escapes: bool) -> Result<String> {
    let mut out = String::with_capacity(template.len() + args.len() * 8);
    let mut args_iter = args.iter();
    let mut rest = template;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        match rest.as_bytes().get(pos + 1) {
            Some(b's') => {
                let arg = args_iter.next().ok_or_else(|| {
                    Error::BadUsageError(format!(
                        "not enough arguments for query template: {} given",
                        args.len()
                    ))
                })?;
                write_literal(&mut out, arg, no_backslash_escapes)?;
            }
            Some(b'%') => out.push('%'),
            _ => {
                return Err(Error::BadUsageError(format!(
                    "unsupported placeholder at byte {} of query template",
                    template.len() - rest.len() + pos
                )));
            }
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);

    if args_iter.next().is_some() {
        return Err(Error::BadUsageError(format!(
            "not all {} arguments were used by the query template",
            args.len()
        )));
    }
    Ok(out)
}

/// Build the statements that run `template` once per row.
///
/// An `INSERT ... VALUES (...)` template is folded into a single multi-row INSERT; any other
/// template yields one statement per row.
pub fn expand_many(
    template: &str,
    rows: &[Vec<Value>],
    no_backslash_escapes: bool,
) -> Result<Vec<String>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    if let Some((head, tuple, tail)) = split_insert_values(template) {
        let mut query = String::from(head);
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                query.push(',');
            }
            query.push_str(&interpolate(tuple, row, no_backslash_escapes)?);
        }
        query.push_str(&interpolate(tail, &[], no_backslash_escapes)?);
        return Ok(vec![query]);
    }
    rows.iter()
        .map(|row| interpolate(template, row, no_backslash_escapes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_values() {
        assert_eq!(
            insert_values("INSERT FOO (a, b, c) VALUES (a, b, c)"),
            Some("(a, b, c)")
        );
        assert_eq!(
            insert_values("insert into t values(%s, ')', %s) on duplicate key update x=1"),
            Some("(%s, ')', %s)")
        );
        assert_eq!(
            insert_values("INSERT INTO t (f) VALUES ((1 + 2), 'a\\'b)')"),
            Some("((1 + 2), 'a\\'b)')")
        );
        assert_eq!(insert_values("SELECT * FROM t"), None);
        assert_eq!(insert_values("INSERT INTO t SELECT myvalues(1)"), None);
        assert_eq!(insert_values("INSERT INTO t VALUES (1"), None);
    }

    #[test]
    fn test_interpolate() {
        let args = [Value::from(1), Value::from("it's"), Value::Null];
        assert_eq!(
            interpolate("SELECT %s, %s, %s, '100%%'", &args, false).unwrap(),
            r"SELECT 1, 'it\'s', NULL, '100%'"
        );
        assert!(matches!(
            interpolate("SELECT %s", &[], false),
            Err(Error::BadUsageError(_))
        ));
        assert!(matches!(
            interpolate("SELECT 1", &[Value::from(1)], false),
            Err(Error::BadUsageError(_))
        ));
        assert!(matches!(
            interpolate("SELECT %d", &[Value::from(1)], false),
            Err(Error::BadUsageError(_))
        ));
    }

    #[test]
    fn test_expand_many_folds_inserts() {
        let rows = vec![
            vec![Value::from(1), Value::from("a")],
            vec![Value::from(2), Value::from("b")],
        ];
        assert_eq!(
            expand_many("INSERT INTO t (id, v) VALUES (%s, %s)", &rows, false).unwrap(),
            vec!["INSERT INTO t (id, v) VALUES (1, 'a'),(2, 'b')".to_string()]
        );
        assert_eq!(
            expand_many("UPDATE t SET v = %s WHERE id = %s", &rows, false).unwrap(),
            vec![
                "UPDATE t SET v = 1 WHERE id = 'a'".to_string(),
                "UPDATE t SET v = 2 WHERE id = 'b'".to_string(),
            ]
        );
        assert!(expand_many("INSERT INTO t VALUES (%s)", &[], false).unwrap().is_empty());
    }
}
