//! Argument flattening for bulk statements.
//!
//! Drivers want one flat positional-argument list; callers often hold nested
//! sequences (an `IN (...)` list, one `Vec` per row of a bulk insert) or a
//! record whose fields supply the arguments. [`flatten_args`] and
//! [`record_args`] bridge the two.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::SqlFetchError;
use crate::types::SqlValue;

/// One statement argument: either a scalar or a nested sequence that will
/// be expanded in place.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArg {
    Value(SqlValue),
    List(Vec<SqlArg>),
}

impl From<SqlValue> for SqlArg {
    fn from(value: SqlValue) -> Self {
        SqlArg::Value(value)
    }
}

impl From<Vec<SqlArg>> for SqlArg {
    fn from(items: Vec<SqlArg>) -> Self {
        SqlArg::List(items)
    }
}

impl From<Vec<SqlValue>> for SqlArg {
    fn from(items: Vec<SqlValue>) -> Self {
        SqlArg::List(items.into_iter().map(SqlArg::Value).collect())
    }
}

impl From<i32> for SqlArg {
    fn from(value: i32) -> Self {
        SqlArg::Value(value.into())
    }
}

impl From<i64> for SqlArg {
    fn from(value: i64) -> Self {
        SqlArg::Value(value.into())
    }
}

impl From<f64> for SqlArg {
    fn from(value: f64) -> Self {
        SqlArg::Value(value.into())
    }
}

impl From<bool> for SqlArg {
    fn from(value: bool) -> Self {
        SqlArg::Value(value.into())
    }
}

impl From<&str> for SqlArg {
    fn from(value: &str) -> Self {
        SqlArg::Value(value.into())
    }
}

impl From<String> for SqlArg {
    fn from(value: String) -> Self {
        SqlArg::Value(value.into())
    }
}

/// Expand nested sequences depth-first into one flat argument list.
/// Scalars pass through unchanged; order is preserved.
///
/// ```rust
/// use sql_fetch::prelude::*;
///
/// let args = vec![
///     SqlArg::from(1i64),
///     SqlArg::List(vec![SqlArg::from("a"), SqlArg::from("b")]),
/// ];
/// let flat = flatten_args(args);
/// assert_eq!(
///     flat,
///     vec![
///         SqlValue::Int64(1),
///         SqlValue::Text("a".into()),
///         SqlValue::Text("b".into()),
///     ]
/// );
/// ```
#[must_use]
pub fn flatten_args<I>(args: I) -> Vec<SqlValue>
where
    I: IntoIterator<Item = SqlArg>,
{
    let mut flat = Vec::new();
    for arg in args {
        push_arg(arg, &mut flat);
    }
    flat
}

fn push_arg(arg: SqlArg, out: &mut Vec<SqlValue>) {
    match arg {
        SqlArg::Value(value) => out.push(value),
        SqlArg::List(items) => {
            for item in items {
                push_arg(item, out);
            }
        }
    }
}

/// Derive a flat argument list from a record's fields, in declaration order.
///
/// Field handling follows serde: `#[serde(skip)]` excludes a field and
/// `#[serde(skip_serializing_if = "...")]` expresses omit-when-empty.
/// Sequence-valued fields are flattened recursively; map- and
/// struct-valued fields are skipped entirely.
///
/// # Errors
///
/// Returns [`SqlFetchError::Precondition`] when `record` does not serialize
/// to a struct/map shape, and [`SqlFetchError::Structural`] when
/// serialization itself fails.
pub fn record_args<T: Serialize>(record: &T) -> Result<Vec<SqlValue>, SqlFetchError> {
    let value =
        serde_json::to_value(record).map_err(|e| SqlFetchError::Structural(e.to_string()))?;
    let JsonValue::Object(fields) = value else {
        return Err(SqlFetchError::Precondition(
            "record_args requires a struct or map-shaped record".into(),
        ));
    };
    let mut flat = Vec::new();
    for (_name, field) in fields {
        push_json_value(field, &mut flat);
    }
    Ok(flat)
}

fn push_json_value(value: JsonValue, out: &mut Vec<SqlValue>) {
    match value {
        // Map-shaped fields never contribute positional arguments.
        JsonValue::Object(_) => {}
        JsonValue::Array(items) => {
            for item in items {
                push_json_value(item, out);
            }
        }
        JsonValue::Null => out.push(SqlValue::Null),
        JsonValue::Bool(b) => out.push(SqlValue::Bool(b)),
        JsonValue::Number(n) => out.push(number_to_value(&n)),
        JsonValue::String(s) => out.push(SqlValue::Text(s)),
    }
}

fn number_to_value(number: &serde_json::Number) -> SqlValue {
    if let Some(i) = number.as_i64() {
        SqlValue::Int64(i)
    } else if let Some(u) = number.as_u64() {
        SqlValue::UInt64(u)
    } else {
        SqlValue::Float(number.as_f64().unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[test]
    fn flattening_is_depth_insensitive() {
        let nested = vec![SqlArg::List(vec![
            SqlArg::List(vec![SqlArg::from(1i64), SqlArg::from(2i64)]),
            SqlArg::from(3i64),
        ])];
        let pre_flattened = vec![
            SqlArg::from(1i64),
            SqlArg::from(2i64),
            SqlArg::from(3i64),
        ];
        assert_eq!(flatten_args(nested), flatten_args(pre_flattened));
    }

    #[test]
    fn scalars_pass_through_in_order() {
        let args = vec![SqlArg::from("x"), SqlArg::from(false), SqlArg::from(2.5)];
        assert_eq!(
            flatten_args(args),
            vec![
                SqlValue::Text("x".into()),
                SqlValue::Bool(false),
                SqlValue::Float(2.5),
            ]
        );
    }

    #[derive(Serialize)]
    struct Widget {
        id: i64,
        name: String,
        #[serde(skip)]
        secret: String,
        tags: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        attrs: std::collections::HashMap<String, String>,
    }

    #[test]
    fn record_args_walks_fields_in_declaration_order() {
        let widget = Widget {
            id: 7,
            name: "bolt".into(),
            secret: "hidden".into(),
            tags: vec!["a".into(), "b".into()],
            note: None,
            attrs: std::collections::HashMap::from([("k".into(), "v".into())]),
        };
        let args = record_args(&widget).unwrap();
        assert_eq!(
            args,
            vec![
                SqlValue::Int64(7),
                SqlValue::Text("bolt".into()),
                SqlValue::Text("a".into()),
                SqlValue::Text("b".into()),
            ]
        );
    }

    #[test]
    fn record_args_rejects_scalars() {
        let err = record_args(&42i64).unwrap_err();
        assert!(matches!(err, SqlFetchError::Precondition(_)));
    }
}
