use crate::error::{Error, Result};
use crate::literal::write_literal;
use crate::value::Value;

/// Name of the session variable that carries argument `idx` of procedure `name`
pub fn arg_variable(name: &str, idx: usize) -> String {
    format!("@_{name}_{idx}")
}

/// Statements that run a stored procedure: one `SET` per argument, then the `CALL`.
///
/// Arguments are passed through session variables so that INOUT and OUT parameters can be
/// read back afterwards with [`out_params_query`].
pub fn callproc_statements(
    name: &str,
    args: &[Value],
    no_backslash_escapes: bool,
) -> Result<Vec<String>> {
    check_procedure_name(name)?;

    let mut statements = Vec::with_capacity(args.len() + 1);
    for (idx, arg) in args.iter().enumerate() {
        let mut sql = format!("SET {}=", arg_variable(name, idx));
        write_literal(&mut sql, arg, no_backslash_escapes)?;
        statements.push(sql);
    }

    let vars = (0..args.len())
        .map(|idx| arg_variable(name, idx))
        .collect::<Vec<_>>()
        .join(",");
    statements.push(format!("CALL {name}({vars})"));
    Ok(statements)
}

/// `SELECT` that reads back the argument variables of a procedure call
pub fn out_params_query(name: &str, num_args: usize) -> Result<String> {
    check_procedure_name(name)?;
    if num_args == 0 {
        return Err(Error::BadUsageError(
            "a procedure without arguments has no out parameters".to_string(),
        ));
    }
    let vars = (0..num_args)
        .map(|idx| arg_variable(name, idx))
        .collect::<Vec<_>>()
        .join(",");
    Ok(format!("SELECT {vars}"))
}

/// The name is spliced into SQL and into variable names, so it must be a plain identifier,
/// optionally qualified with a schema.
fn check_procedure_name(name: &str) -> Result<()> {
    let is_identifier = |part: &str| {
        !part.is_empty()
            && part
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$')
    };
    let valid = name.split('.').all(is_identifier);
    if valid {
        Ok(())
    } else {
        Err(Error::BadUsageError(format!(
            "invalid stored procedure name: {name:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callproc_statements() {
        let statements =
            callproc_statements("add_one", &[Value::from(2), Value::from("x'y")], false).unwrap();
        assert_eq!(
            statements,
            [
                "SET @_add_one_0=2",
                "SET @_add_one_1='x\\'y'",
                "CALL add_one(@_add_one_0,@_add_one_1)",
            ]
        );
    }

    #[test]
    fn test_callproc_without_args() {
        let statements = callproc_statements("test_sp", &[], false).unwrap();
        assert_eq!(statements, ["CALL test_sp()"]);
    }

    #[test]
    fn test_out_params_query() {
        assert_eq!(
            out_params_query("p", 3).unwrap(),
            "SELECT @_p_0,@_p_1,@_p_2"
        );
        assert!(matches!(out_params_query("p", 0), Err(Error::BadUsageError(_))));
    }

    #[test]
    fn test_rejects_injected_name() {
        assert!(matches!(
            callproc_statements("p(); DROP TABLE t; --", &[], false),
            Err(Error::BadUsageError(_))
        ));
        assert!(callproc_statements("db.p", &[], false).is_ok());
    }
}
