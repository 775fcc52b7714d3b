//! Decoded row representations.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::SqlValue;

/// One row's canonical value map: column name to decoded value.
///
/// Column names and the name-to-index table are shared across every row of
/// a result set, so cloning a row never duplicates the header.
#[derive(Debug, Clone)]
pub struct SqlRow {
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
    values: Vec<SqlValue>,
}

impl SqlRow {
    pub(crate) fn new(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<SqlValue>,
    ) -> Self {
        Self {
            column_names,
            column_index,
            values,
        }
    }

    /// Column names in cursor order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.column_names
    }

    /// Look up a value by column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.column_index
            .get(column)
            .and_then(|&index| self.values.get(index))
    }

    /// Look up a value by position.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// All values in cursor order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One row's columns as untouched driver buffers, produced by the
/// raw-bytes path that bypasses all decoding.
#[derive(Debug, Clone)]
pub struct RawRow {
    column_names: Arc<Vec<String>>,
    buffers: Vec<Option<Vec<u8>>>,
}

impl RawRow {
    pub(crate) fn new(column_names: Arc<Vec<String>>, buffers: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            column_names,
            buffers,
        }
    }

    /// Column names in cursor order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.column_names
    }

    /// The raw buffer for a named column; `None` for an unknown column or a
    /// NULL cell.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&[u8]> {
        let index = self.column_names.iter().position(|name| name == column)?;
        self.buffers.get(index)?.as_deref()
    }

    /// All buffers in cursor order; `None` marks NULL.
    #[must_use]
    pub fn buffers(&self) -> &[Option<Vec<u8>>] {
        &self.buffers
    }

    /// Consume the row, keeping only the buffers.
    #[must_use]
    pub fn into_buffers(self) -> Vec<Option<Vec<u8>>> {
        self.buffers
    }
}
