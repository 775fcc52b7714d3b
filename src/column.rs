//! Column metadata as reported by the driver's cursor.

/// Driver-reported nullability for one column.
///
/// Drivers frequently cannot report nullability for computed columns, so
/// `Unknown` is its own state: the decoder only produces a bare
/// (non-optional) value when the driver explicitly guarantees `NotNull`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    /// The driver guarantees the column never holds NULL.
    NotNull,
    /// The column may hold NULL.
    Nullable,
    /// The driver did not report nullability.
    Unknown,
}

impl Nullability {
    #[must_use]
    pub fn is_declared_not_null(self) -> bool {
        matches!(self, Nullability::NotNull)
    }
}

/// Storage width and signedness hint for integer columns, taken from the
/// driver's scan-type report. Absent hints decode as 64-bit signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

/// Metadata for one column of a result set, immutable for the life of the
/// cursor that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name as reported by the driver.
    pub name: String,
    /// Declared database type name, e.g. `VARCHAR` or `BIGINT`.
    pub type_name: String,
    /// Driver-reported nullability.
    pub nullability: Nullability,
    /// Integer scan-width hint, when the driver provides one.
    pub scan_hint: Option<IntWidth>,
}

impl ColumnDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullability: Nullability::Unknown,
            scan_hint: None,
        }
    }

    #[must_use]
    pub fn nullability(mut self, nullability: Nullability) -> Self {
        self.nullability = nullability;
        self
    }

    #[must_use]
    pub fn scan_hint(mut self, hint: IntWidth) -> Self {
        self.scan_hint = Some(hint);
        self
    }

    pub(crate) fn type_class(&self) -> TypeClass {
        classify_type(&self.type_name)
    }
}

/// Coarse decode class derived from the declared type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeClass {
    Text,
    Float,
    Int,
    Bool,
    DateTime,
    Date,
    Time,
    Json,
}

/// Map a declared type name onto a decode class. Length suffixes like
/// `VARCHAR(255)` and modifiers like `INT UNSIGNED` are tolerated; anything
/// unrecognized is treated as text.
pub(crate) fn classify_type(type_name: &str) -> TypeClass {
    let normalized = type_name
        .split(['(', ' '])
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_uppercase();
    match normalized.as_str() {
        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "NCHAR"
        | "NVARCHAR" | "CLOB" | "ENUM" => TypeClass::Text,
        "FLOAT" | "DOUBLE" | "REAL" | "DECIMAL" | "NUMERIC" => TypeClass::Float,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "INT2" | "INT4"
        | "INT8" | "SERIAL" | "BIGSERIAL" => TypeClass::Int,
        "BOOL" | "BOOLEAN" => TypeClass::Bool,
        "DATETIME" | "TIMESTAMP" | "TIMESTAMPTZ" => TypeClass::DateTime,
        "DATE" => TypeClass::Date,
        "TIME" => TypeClass::Time,
        "JSON" | "JSONB" => TypeClass::Json,
        _ => TypeClass::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_type_names() {
        assert_eq!(classify_type("VARCHAR"), TypeClass::Text);
        assert_eq!(classify_type("varchar(255)"), TypeClass::Text);
        assert_eq!(classify_type("BIGINT"), TypeClass::Int);
        assert_eq!(classify_type("int unsigned"), TypeClass::Int);
        assert_eq!(classify_type("DOUBLE"), TypeClass::Float);
        assert_eq!(classify_type("timestamptz"), TypeClass::DateTime);
        assert_eq!(classify_type("JSONB"), TypeClass::Json);
    }

    #[test]
    fn unrecognized_types_fall_back_to_text() {
        assert_eq!(classify_type("GEOMETRY"), TypeClass::Text);
        assert_eq!(classify_type(""), TypeClass::Text);
    }
}
