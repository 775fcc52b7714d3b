//! Type-directed decoding of raw column buffers into canonical values.
//!
//! The declared type name picks a decode class, the nullability tri-state
//! decides whether NULL becomes an absent value or the class's zero value,
//! and the driver's scan hint selects the integer width. Numeric and JSON
//! parse failures are swallowed into zero/absent values for compatibility
//! with drivers that report loosely-typed columns; date and time parse
//! failures abort the call.

use chrono::{DateTime, NaiveDateTime, NaiveTime};
use serde_json::Value as JsonValue;

use crate::column::{ColumnDescriptor, IntWidth, TypeClass};
use crate::error::SqlFetchError;
use crate::types::SqlValue;

/// Decode one column of one row.
///
/// # Errors
///
/// Returns [`SqlFetchError::Decode`] when a datetime, date, or time column
/// holds text that neither the fixed pattern nor RFC3339 can parse.
pub(crate) fn decode_column(
    column: &ColumnDescriptor,
    raw: Option<&[u8]>,
) -> Result<SqlValue, SqlFetchError> {
    let class = column.type_class();
    let Some(raw) = raw else {
        return Ok(null_value(column, class));
    };
    let text = String::from_utf8_lossy(raw);
    let value = match class {
        TypeClass::Text => SqlValue::Text(text.into_owned()),
        TypeClass::Float => SqlValue::Float(text.parse().unwrap_or(0.0)),
        TypeClass::Int => decode_int(column.scan_hint, &text),
        TypeClass::Bool => SqlValue::Bool(matches!(text.as_ref(), "true" | "TRUE" | "1")),
        TypeClass::DateTime => {
            SqlValue::Timestamp(parse_datetime(&text).map_err(|message| decode_err(column, message))?)
        }
        TypeClass::Date => {
            SqlValue::Date(parse_date(&text).map_err(|message| decode_err(column, message))?)
        }
        TypeClass::Time => {
            SqlValue::Time(parse_time(&text).map_err(|message| decode_err(column, message))?)
        }
        TypeClass::Json => match serde_json::from_slice::<JsonValue>(raw) {
            Ok(parsed) => SqlValue::Json(parsed),
            Err(_) => SqlValue::Null,
        },
    };
    Ok(value)
}

/// What a NULL buffer decodes to. Only a column the driver explicitly
/// declares NOT NULL yields a bare zero value; JSON columns are always
/// absent on NULL.
fn null_value(column: &ColumnDescriptor, class: TypeClass) -> SqlValue {
    if class == TypeClass::Json || !column.nullability.is_declared_not_null() {
        return SqlValue::Null;
    }
    match class {
        TypeClass::Text => SqlValue::Text(String::new()),
        TypeClass::Float => SqlValue::Float(0.0),
        TypeClass::Int => decode_int(column.scan_hint, ""),
        TypeClass::Bool => SqlValue::Bool(false),
        TypeClass::DateTime => SqlValue::Timestamp(NaiveDateTime::UNIX_EPOCH),
        TypeClass::Date => SqlValue::Date(NaiveDateTime::UNIX_EPOCH.date()),
        TypeClass::Time => SqlValue::Time(NaiveTime::MIN),
        TypeClass::Json => SqlValue::Null,
    }
}

/// Parse an integer at the width and signedness the scan hint reports,
/// defaulting to 64-bit signed. Parse failures yield the width's zero.
fn decode_int(hint: Option<IntWidth>, text: &str) -> SqlValue {
    match hint.unwrap_or(IntWidth::Int64) {
        IntWidth::Int8 => SqlValue::Int8(text.parse().unwrap_or(0)),
        IntWidth::Int16 => SqlValue::Int16(text.parse().unwrap_or(0)),
        IntWidth::Int32 => SqlValue::Int32(text.parse().unwrap_or(0)),
        IntWidth::Int64 => SqlValue::Int64(text.parse().unwrap_or(0)),
        IntWidth::UInt8 => SqlValue::UInt8(text.parse().unwrap_or(0)),
        IntWidth::UInt16 => SqlValue::UInt16(text.parse().unwrap_or(0)),
        IntWidth::UInt32 => SqlValue::UInt32(text.parse().unwrap_or(0)),
        IntWidth::UInt64 => SqlValue::UInt64(text.parse().unwrap_or(0)),
    }
}

fn parse_datetime(text: &str) -> Result<NaiveDateTime, String> {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Ok(parsed);
    }
    DateTime::parse_from_rfc3339(text)
        .map(|parsed| parsed.naive_utc())
        .map_err(|e| format!("invalid datetime '{text}': {e}"))
}

fn parse_date(text: &str) -> Result<chrono::NaiveDate, String> {
    if let Ok(parsed) = chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(parsed);
    }
    DateTime::parse_from_rfc3339(text)
        .map(|parsed| parsed.naive_utc().date())
        .map_err(|e| format!("invalid date '{text}': {e}"))
}

fn parse_time(text: &str) -> Result<NaiveTime, String> {
    if let Ok(parsed) = NaiveTime::parse_from_str(text, "%H:%M:%S") {
        return Ok(parsed);
    }
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .map_err(|e| format!("invalid time '{text}': {e}"))
}

fn decode_err(column: &ColumnDescriptor, message: String) -> SqlFetchError {
    SqlFetchError::Decode {
        column: column.name.clone(),
        message,
    }
}

/// The string-or-null projection used when a target record shape is
/// supplied: declared types are ignored and final coercion belongs to the
/// structural decoder.
pub(crate) fn raw_to_string_value(raw: Option<&[u8]>) -> JsonValue {
    match raw {
        Some(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        None => JsonValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Nullability;
    use chrono::{NaiveDate, Timelike};

    fn col(type_name: &str) -> ColumnDescriptor {
        ColumnDescriptor::new("c", type_name)
    }

    #[test]
    fn null_is_absent_unless_declared_not_null() {
        for type_name in ["VARCHAR", "BIGINT", "DOUBLE", "BOOL", "DATETIME"] {
            assert_eq!(decode_column(&col(type_name), None).unwrap(), SqlValue::Null);
            let nullable = col(type_name).nullability(Nullability::Nullable);
            assert_eq!(decode_column(&nullable, None).unwrap(), SqlValue::Null);
        }
    }

    #[test]
    fn declared_not_null_columns_zero_out_null_buffers() {
        let text = col("TEXT").nullability(Nullability::NotNull);
        assert_eq!(decode_column(&text, None).unwrap(), SqlValue::Text(String::new()));
        let int = col("BIGINT").nullability(Nullability::NotNull);
        assert_eq!(decode_column(&int, None).unwrap(), SqlValue::Int64(0));
        // JSON stays absent even when declared NOT NULL.
        let json = col("JSON").nullability(Nullability::NotNull);
        assert_eq!(decode_column(&json, None).unwrap(), SqlValue::Null);
    }

    #[test]
    fn integers_follow_the_scan_hint() {
        let column = col("TINYINT").scan_hint(IntWidth::Int8);
        assert_eq!(
            decode_column(&column, Some(b"-5")).unwrap(),
            SqlValue::Int8(-5)
        );
        let column = col("INT").scan_hint(IntWidth::UInt32);
        assert_eq!(
            decode_column(&column, Some(b"42")).unwrap(),
            SqlValue::UInt32(42)
        );
        // No hint defaults to 64-bit signed.
        assert_eq!(
            decode_column(&col("BIGINT"), Some(b"9000000000")).unwrap(),
            SqlValue::Int64(9_000_000_000)
        );
    }

    #[test]
    fn numeric_parse_failures_are_swallowed() {
        assert_eq!(
            decode_column(&col("DOUBLE"), Some(b"not-a-number")).unwrap(),
            SqlValue::Float(0.0)
        );
        assert_eq!(
            decode_column(&col("BIGINT"), Some(b"abc")).unwrap(),
            SqlValue::Int64(0)
        );
    }

    #[test]
    fn bool_truth_set_is_exact() {
        for truthy in ["true", "TRUE", "1"] {
            assert_eq!(
                decode_column(&col("BOOL"), Some(truthy.as_bytes())).unwrap(),
                SqlValue::Bool(true)
            );
        }
        for falsy in ["True", "yes", "0", ""] {
            assert_eq!(
                decode_column(&col("BOOL"), Some(falsy.as_bytes())).unwrap(),
                SqlValue::Bool(false)
            );
        }
    }

    #[test]
    fn datetime_falls_back_to_rfc3339() {
        let fixed = decode_column(&col("DATETIME"), Some(b"2024-03-01 10:30:00")).unwrap();
        let rfc = decode_column(&col("TIMESTAMP"), Some(b"2024-03-01T10:30:00Z")).unwrap();
        assert_eq!(fixed, rfc);
        let err = decode_column(&col("DATETIME"), Some(b"yesterday")).unwrap_err();
        assert!(matches!(err, SqlFetchError::Decode { .. }));
    }

    #[test]
    fn date_extracts_the_date_portion_of_rfc3339() {
        let value = decode_column(&col("DATE"), Some(b"2024-03-01T10:30:00Z")).unwrap();
        assert_eq!(
            value,
            SqlValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
    }

    #[test]
    fn time_parses_civil_time_of_day() {
        let value = decode_column(&col("TIME"), Some(b"10:30:05")).unwrap();
        let time = value.as_time().unwrap();
        assert_eq!((time.hour(), time.minute(), time.second()), (10, 30, 5));
    }

    #[test]
    fn json_parse_failures_are_swallowed() {
        let parsed = decode_column(&col("JSON"), Some(br#"{"a":1}"#)).unwrap();
        assert_eq!(
            parsed,
            SqlValue::Json(serde_json::json!({"a": 1}))
        );
        assert_eq!(
            decode_column(&col("JSONB"), Some(b"{broken")).unwrap(),
            SqlValue::Null
        );
    }

    #[test]
    fn unrecognized_types_decode_as_text() {
        assert_eq!(
            decode_column(&col("GEOMETRY"), Some(b"POINT(1 1)")).unwrap(),
            SqlValue::Text("POINT(1 1)".into())
        );
    }
}
