//! Schema-bound rows and per-shard row collections.
//!
//! A [`Row`] is always built through a [`RowBuilder`] tied to one
//! [`OutputSchema`]: values are coerced to the declared column type when they
//! are set, unknown column names are dropped, and unset columns are null. By
//! the time a row reaches the sink it already has exactly the table's shape.

use crate::schema::{ColumnType, OutputSchema};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ordered_float::OrderedFloat;
use serde_json::Value as Json;
use std::collections::HashSet;

/// A single scalar cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Int(i64),
    Float(OrderedFloat<f64>),
    Bool(bool),
    Text(String),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) | Self::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON scalar into a cell. Arrays and objects are encoded as
    /// compact JSON text so they still fit a flat column.
    #[must_use]
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(|f| Self::Float(OrderedFloat(f))))
                .unwrap_or(Self::Null),
            Json::String(s) => Self::Text(s.clone()),
            Json::Array(_) | Json::Object(_) => Self::Text(json.to_string()),
        }
    }

    /// Coerce to a declared column type. Anything that does not fit becomes null.
    #[must_use]
    pub fn coerce(self, ty: ColumnType) -> Self {
        match ty {
            ColumnType::Utf8 => match self {
                Self::Null => Self::Null,
                Self::Text(s) => Self::Text(s),
                Self::Int(v) => Self::Text(v.to_string()),
                Self::Float(f) => Self::Text(f.0.to_string()),
                Self::Bool(b) => Self::Text(b.to_string()),
                Self::Timestamp(ms) => format_timestamp_ms(ms).map_or(Self::Null, Self::Text),
            },
            ColumnType::Float64 => match self {
                Self::Float(f) => Self::Float(f),
                #[allow(clippy::cast_precision_loss)]
                Self::Int(v) => Self::Float(OrderedFloat(v as f64)),
                Self::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_or(Self::Null, |f| Self::Float(OrderedFloat(f))),
                _ => Self::Null,
            },
            ColumnType::Boolean => match self {
                Self::Bool(b) => Self::Bool(b),
                Self::Int(0) => Self::Bool(false),
                Self::Int(1) => Self::Bool(true),
                Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Self::Bool(true),
                    "false" => Self::Bool(false),
                    _ => Self::Null,
                },
                _ => Self::Null,
            },
            ColumnType::TimestampMs => match self {
                Self::Timestamp(ms) => Self::Timestamp(ms),
                Self::Text(s) => parse_timestamp_ms(&s).map_or(Self::Null, Self::Timestamp),
                _ => Self::Null,
            },
            int_ty => {
                let Some((lo, hi)) = int_ty.int_range() else {
                    return Self::Null;
                };
                let v = match self {
                    Self::Int(v) => Some(v),
                    #[allow(clippy::cast_possible_truncation)]
                    Self::Float(f) if f.0.fract() == 0.0 && f.0.is_finite() => Some(f.0 as i64),
                    Self::Text(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                v.filter(|v| (lo..=hi).contains(v))
                    .map_or(Self::Null, Self::Int)
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::Null, Self::Int)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        i64::try_from(v).map_or(Self::Null, Self::Int)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(OrderedFloat(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<&Json> for Value {
    fn from(v: &Json) -> Self {
        Self::from_json(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Parse the date/time spellings seen in snapshots into epoch milliseconds.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.fff…]` and RFC 3339.
#[must_use]
pub fn parse_timestamp_ms(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc().timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Render epoch milliseconds as `YYYY-MM-DDTHH:MM:SS.fffZ`.
#[must_use]
pub fn format_timestamp_ms(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

/// One row of an output table; values are in schema column order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Cell by column name.
    #[must_use]
    pub fn get(&self, schema: &OutputSchema, column: &str) -> Option<&Value> {
        schema.index_of(column).and_then(|i| self.values.get(i))
    }
}

/// Builds a [`Row`] for one schema.
#[must_use]
pub struct RowBuilder {
    schema: &'static OutputSchema,
    values: Vec<Value>,
}

impl RowBuilder {
    pub fn new(schema: &'static OutputSchema) -> Self {
        Self {
            schema,
            values: vec![Value::Null; schema.columns.len()],
        }
    }

    /// Start from a JSON object, copying every key that names a column.
    /// Keys without a matching column are ignored.
    pub fn from_object(schema: &'static OutputSchema, object: &serde_json::Map<String, Json>) -> Self {
        let mut builder = Self::new(schema);
        for (i, col) in schema.columns.iter().enumerate() {
            if let Some(v) = object.get(col.name) {
                builder.values[i] = Value::from_json(v).coerce(col.ty);
            }
        }
        builder
    }

    /// Set a column, coercing to its declared type. Unknown columns are dropped.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        if let Some(i) = self.schema.index_of(column) {
            self.values[i] = value.into().coerce(self.schema.columns[i].ty);
        } else {
            tracing::trace!(table = self.schema.table, column, "dropping undeclared column");
        }
        self
    }

    /// Set a column from a JSON value.
    pub fn set_json(self, column: &str, value: Option<&Json>) -> Self {
        let v = value.map_or(Value::Null, Value::from_json);
        self.set(column, v)
    }

    #[must_use]
    pub const fn schema(&self) -> &'static OutputSchema {
        self.schema
    }

    /// Finish the row. Returns `None` if a non-nullable column is null.
    #[must_use]
    pub fn build(self) -> Option<Row> {
        let complete = self
            .schema
            .columns
            .iter()
            .zip(&self.values)
            .all(|(c, v)| c.nullable || !v.is_null());
        complete.then_some(Row {
            values: self.values,
        })
    }
}

/// All rows of one output kind produced from one shard.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub schema: &'static OutputSchema,
    pub rows: Vec<Row>,
}

impl Table {
    #[must_use]
    pub const fn new(schema: &'static OutputSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with exact duplicates removed, keeping first occurrences in order.
    #[must_use]
    pub fn deduplicated(&self) -> Vec<&Row> {
        let mut seen: HashSet<&Row> = HashSet::with_capacity(self.rows.len());
        self.rows.iter().filter(|r| seen.insert(*r)).collect()
    }

    /// Rows as they should be written: de-duplicated only when the schema asks for it.
    #[must_use]
    pub fn rows_to_write(&self) -> Vec<&Row> {
        if self.schema.dedup_rows {
            self.deduplicated()
        } else {
            self.rows.iter().collect()
        }
    }

    /// Values of one column, in row order.
    pub fn column<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Value> + 'a {
        let idx = self.schema.index_of(name);
        self.rows
            .iter()
            .filter_map(move |r| idx.and_then(|i| r.values.get(i)))
    }
}

/// Every declared table of one entity kind for one shard, in schema order.
#[derive(Clone, Debug, PartialEq)]
pub struct RowCollection {
    tables: Vec<Table>,
}

impl RowCollection {
    /// An empty collection with one table per schema.
    #[must_use]
    pub fn new(schemas: &[&'static OutputSchema]) -> Self {
        Self {
            tables: schemas.iter().map(|s| Table::new(*s)).collect(),
        }
    }

    /// Build and append a row to the table its schema names.
    ///
    /// Rows whose key column ended up null are discarded.
    pub fn emit(&mut self, builder: RowBuilder) {
        let schema = builder.schema();
        let Some(table) = self.tables.iter_mut().find(|t| std::ptr::eq(t.schema, schema)) else {
            tracing::warn!(table = schema.table, "row emitted for undeclared table");
            return;
        };
        if let Some(row) = builder.build() {
            table.rows.push(row);
        }
    }

    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Table by output kind name (e.g. `authorships`).
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.schema.kind == kind)
    }

    /// Row counts by table name.
    #[must_use]
    pub fn row_counts(&self) -> Vec<(&'static str, usize)> {
        self.tables.iter().map(|t| (t.schema.table, t.len())).collect()
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(Table::len).sum()
    }
}
