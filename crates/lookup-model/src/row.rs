use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a row table does not match the schema a caller requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("column '{column}' not found in the row table")]
    MissingColumn { column: String },
}

/// One input record: field values aligned to the owning table's columns, plus
/// the record's position in the originally uploaded file.
///
/// Rows are immutable once loaded. `source_index` is assigned at import time
/// and is never recomputed by later pipeline passes, so strategies that refer
/// to "row N of the uploaded file" stay meaningful after filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    source_index: usize,
    values: Vec<String>,
}

impl Row {
    pub fn new(source_index: usize, values: Vec<String>) -> Self {
        Self {
            source_index,
            values,
        }
    }

    /// Position of this row in the originally uploaded file (0-based, data
    /// rows only; the header is not counted).
    pub fn source_index(&self) -> usize {
        self.source_index
    }

    /// Field value at `column_index`, or `""` for a short record.
    pub fn value(&self, column_index: usize) -> &str {
        self.values
            .get(column_index)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// An ordered table of [`Row`]s with a named-column header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl RowTable {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Fail-fast schema validation: every column in `required` must exist.
    ///
    /// Callers run this before doing any per-row work so a bad request never
    /// produces partial output.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), SchemaError> {
        for &column in required {
            if self.column_index(column).is_none() {
                return Err(SchemaError::MissingColumn {
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Value of `column` in `row`, or `""` when the record is shorter than
    /// the header. Returns `None` only when the column itself is unknown.
    pub fn value<'a>(&self, row: &'a Row, column: &str) -> Option<&'a str> {
        self.column_index(column).map(|idx| row.value(idx))
    }

    /// Build a table with the same columns but a new row set.
    pub fn with_rows(&self, rows: Vec<Row>) -> RowTable {
        RowTable {
            columns: self.columns.clone(),
            rows,
        }
    }
}
