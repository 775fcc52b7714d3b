//! Placeholder generation and INSERT templating for bulk statements.

use crate::error::SqlFetchError;

/// Placeholder dialect for generated statement fragments.
///
/// Always passed explicitly; there is no ambient default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Repeated positional `?` markers.
    MySql,
    /// Incrementing `$n` markers, numbered across all rows.
    Postgres,
}

/// Produce the `VALUES` placeholder groups for a bulk statement: one
/// parenthesized group per row, groups comma-joined.
///
/// For [`Dialect::Postgres`], numbering starts at `offset + 1` and continues
/// across rows, so fragments can be appended to statements that already
/// bind `offset` arguments.
///
/// ```rust
/// use sql_fetch::prelude::*;
///
/// assert_eq!(placeholders(Dialect::MySql, 3, 2, 0).unwrap(), "( ?,?,? ),( ?,?,? )");
/// assert_eq!(placeholders(Dialect::Postgres, 2, 2, 0).unwrap(), "($1,$2),($3,$4)");
/// ```
///
/// # Errors
///
/// Returns [`SqlFetchError::Precondition`] when `columns` or `rows` is zero;
/// the caller should never pass either.
pub fn placeholders(
    dialect: Dialect,
    columns: usize,
    rows: usize,
    offset: usize,
) -> Result<String, SqlFetchError> {
    if columns == 0 || rows == 0 {
        return Err(SqlFetchError::Precondition(format!(
            "placeholder generation requires nonzero counts, got {columns} columns and {rows} rows"
        )));
    }
    let mut out = String::new();
    match dialect {
        Dialect::MySql => {
            let group = format!("( {} )", vec!["?"; columns].join(","));
            for row in 0..rows {
                if row > 0 {
                    out.push(',');
                }
                out.push_str(&group);
            }
        }
        Dialect::Postgres => {
            let mut ordinal = offset;
            for row in 0..rows {
                if row > 0 {
                    out.push(',');
                }
                out.push('(');
                for column in 0..columns {
                    if column > 0 {
                        out.push(',');
                    }
                    ordinal += 1;
                    out.push('$');
                    out.push_str(&ordinal.to_string());
                }
                out.push(')');
            }
        }
    }
    Ok(out)
}

/// Template a bulk INSERT statement over [`placeholders`].
///
/// # Errors
///
/// Returns [`SqlFetchError::Precondition`] for an empty table name, an empty
/// column list, or a zero row count.
pub fn insert_into(
    dialect: Dialect,
    table: &str,
    columns: &[&str],
    rows: usize,
) -> Result<String, SqlFetchError> {
    if table.trim().is_empty() {
        return Err(SqlFetchError::Precondition(
            "insert_into requires a table name".into(),
        ));
    }
    let values = placeholders(dialect, columns.len(), rows, 0)?;
    Ok(format!(
        "INSERT INTO {table} ({}) VALUES {values}",
        columns.join(",")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_groups_repeat_positional_markers() {
        assert_eq!(placeholders(Dialect::MySql, 3, 1, 0).unwrap(), "( ?,?,? )");
        assert_eq!(
            placeholders(Dialect::MySql, 3, 2, 0).unwrap(),
            "( ?,?,? ),( ?,?,? )"
        );
    }

    #[test]
    fn postgres_groups_number_across_rows() {
        assert_eq!(
            placeholders(Dialect::Postgres, 2, 2, 0).unwrap(),
            "($1,$2),($3,$4)"
        );
        assert_eq!(
            placeholders(Dialect::Postgres, 2, 1, 4).unwrap(),
            "($5,$6)"
        );
    }

    #[test]
    fn zero_counts_are_rejected() {
        assert!(matches!(
            placeholders(Dialect::MySql, 0, 1, 0),
            Err(SqlFetchError::Precondition(_))
        ));
        assert!(matches!(
            placeholders(Dialect::Postgres, 2, 0, 0),
            Err(SqlFetchError::Precondition(_))
        ));
    }

    #[test]
    fn insert_statement_templating() {
        assert_eq!(
            insert_into(Dialect::MySql, "users", &["id", "name"], 2).unwrap(),
            "INSERT INTO users (id,name) VALUES ( ?,? ),( ?,? )"
        );
        assert_eq!(
            insert_into(Dialect::Postgres, "users", &["id", "name"], 1).unwrap(),
            "INSERT INTO users (id,name) VALUES ($1,$2)"
        );
        assert!(matches!(
            insert_into(Dialect::MySql, "  ", &["id"], 1),
            Err(SqlFetchError::Precondition(_))
        ));
    }
}
