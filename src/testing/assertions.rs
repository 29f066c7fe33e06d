//! Assertion helpers for flattened tables.

use crate::row::{RowCollection, Table, Value};

/// Look up a table by output kind, panicking with the available kinds if absent.
///
/// # Panics
///
/// Panics if the collection has no table of that kind.
#[must_use]
pub fn table<'a>(rows: &'a RowCollection, kind: &str) -> &'a Table {
    rows.get(kind).unwrap_or_else(|| {
        let kinds: Vec<&str> = rows.tables().iter().map(|t| t.schema.kind).collect();
        panic!("no table {kind:?}; have {kinds:?}")
    })
}

/// Integer cells of a column, `None` for nulls.
#[must_use]
pub fn int_column(table: &Table, column: &str) -> Vec<Option<i64>> {
    table.column(column).map(Value::as_int).collect()
}

/// Text cells of a column, `None` for nulls.
#[must_use]
pub fn text_column(table: &Table, column: &str) -> Vec<Option<String>> {
    table
        .column(column)
        .map(|v| v.as_text().map(str::to_string))
        .collect()
}

/// Assert the row count of each listed table kind.
///
/// # Panics
///
/// Panics on the first kind whose row count differs.
pub fn assert_row_counts(rows: &RowCollection, expected: &[(&str, usize)]) {
    for (kind, count) in expected {
        let actual = table(rows, kind).len();
        assert_eq!(
            actual, *count,
            "row count mismatch for {kind:?}:\n  Expected: {count}\n  Actual: {actual}"
        );
    }
}
