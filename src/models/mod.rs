pub mod features;
pub mod prediction;

pub use features::{CanonicalFeatureRow, CategoricalFeature, NumericFeature};
pub use prediction::{PredictionResponse, PredictionSummary, ScoredRecord};

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// RawValue
// ---------------------------------------------------------------------------

/// A single caller-supplied cell. Types are not known up front.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
}

impl RawValue {
    /// Infer a value from a CSV cell: empty → Missing, float → Number, else Text.
    pub fn infer(cell: &str) -> Self {
        if cell.is_empty() {
            return RawValue::Missing;
        }
        match cell.trim().parse::<f64>() {
            Ok(n) => RawValue::Number(n),
            Err(_) => RawValue::Text(cell.to_string()),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawValue::Missing,
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(RawValue::Number)
                .unwrap_or_else(|| RawValue::Text(n.to_string())),
            serde_json::Value::String(s) => RawValue::Text(s.clone()),
            serde_json::Value::Bool(true) => RawValue::Text("True".into()),
            serde_json::Value::Bool(false) => RawValue::Text("False".into()),
            other => RawValue::Text(other.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, RawValue::Missing)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            RawValue::Number(n) => write!(f, "{n}"),
            RawValue::Text(s) => f.write_str(s),
            RawValue::Missing => Ok(()),
        }
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawValue::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            RawValue::Number(_) | RawValue::Missing => serializer.serialize_none(),
            RawValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable — ordered columns, row-major cells
// ---------------------------------------------------------------------------

/// In-memory table of caller data with an arbitrary column set.
///
/// Every row has exactly `columns.len()` cells; short rows are padded with
/// `Missing` and long rows truncated on insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from JSON objects. Columns are the union of keys in
    /// first-seen order; absent keys become `Missing`.
    pub fn from_json_records(records: &[serde_json::Map<String, serde_json::Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut table = RawTable::new(columns);
        for record in records {
            let row = table
                .columns
                .iter()
                .map(|c| record.get(c).map(RawValue::from_json).unwrap_or(RawValue::Missing))
                .collect();
            table.rows.push(row);
        }
        table
    }

    pub fn push_row(&mut self, mut row: Vec<RawValue>) {
        row.resize(self.columns.len(), RawValue::Missing);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column with exactly this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn value(&self, row: usize, column: usize) -> &RawValue {
        &self.rows[row][column]
    }

    pub fn records(&self) -> impl Iterator<Item = RawRecord<'_>> {
        self.rows.iter().map(move |cells| RawRecord {
            columns: &self.columns,
            cells,
        })
    }

    /// Lowercase every column name and replace spaces with underscores.
    pub fn with_normalized_columns(&self) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| normalize_column_name(c))
                .collect(),
            rows: self.rows.clone(),
        }
    }

    /// Remove every column whose name is in `names`. Unknown names are ignored.
    pub fn without_columns(&self, names: &[&str]) -> Self {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.contains(&self.columns[i].as_str()))
            .collect();

        Self {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }
}

pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    columns: &'a [String],
    cells: &'a [RawValue],
}

impl<'a> RawRecord<'a> {
    pub fn get(&self, column: &str) -> Option<&'a RawValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.cells[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a RawValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter())
    }
}

impl Serialize for RawRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
