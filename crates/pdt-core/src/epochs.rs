//! Pre-defined analysis windows (`epochs.epochData`)
//!
//! Epoch rows arrive as ordered key/value lists and are stored column-major,
//! one homogeneous value vector per column. The table serializes as an array
//! of row objects in column order and deserializes through the same checks
//! as [`build_epoch_table`].

use crate::error::{PdtError, PdtResult};
use crate::{schema_error, validation_error};
use core::fmt;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use tracing::debug;

pub const EPOCH_NAME: &str = "epochName";
pub const START_TIME: &str = "startTime";
pub const END_TIME: &str = "endTime";

const REQUIRED_COLUMNS: [&str; 3] = [EPOCH_NAME, START_TIME, END_TIME];

/// A single epoch cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpochValue {
    Number(f64),
    Text(String),
}

impl EpochValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            EpochValue::Number(_) => "number",
            EpochValue::Text(_) => "text",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            EpochValue::Number(n) => Some(*n),
            EpochValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EpochValue::Text(s) => Some(s),
            EpochValue::Number(_) => None,
        }
    }
}

impl From<f64> for EpochValue {
    fn from(value: f64) -> Self {
        EpochValue::Number(value)
    }
}

impl From<&str> for EpochValue {
    fn from(value: &str) -> Self {
        EpochValue::Text(value.to_string())
    }
}

impl From<String> for EpochValue {
    fn from(value: String) -> Self {
        EpochValue::Text(value)
    }
}

impl fmt::Display for EpochValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpochValue::Number(n) => write!(f, "{}", n),
            EpochValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One epoch as an ordered key/value list.
///
/// Keys keep insertion order and duplicates are kept as-is, so that
/// [`build_epoch_table`] can report them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EpochRow {
    fields: Vec<(String, EpochValue)>,
}

impl EpochRow {
    /// Row with the three required columns
    pub fn new(epoch_name: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self::default()
            .with(EPOCH_NAME, EpochValue::Text(epoch_name.into()))
            .with(START_TIME, start_time)
            .with(END_TIME, end_time)
    }

    /// Append a column value, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<EpochValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<EpochValue>) {
        self.fields.push((key.into(), value.into()));
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&EpochValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn fields(&self) -> &[(String, EpochValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for EpochRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EpochRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = EpochRow;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an epoch object of text or number values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut row = EpochRow::default();
                while let Some((key, value)) = access.next_entry::<String, EpochValue>()? {
                    row.fields.push((key, value));
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// Values of one epoch column; a single type per column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Number(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnValues {
    fn empty_like(value: &EpochValue) -> Self {
        match value {
            EpochValue::Number(_) => ColumnValues::Number(Vec::new()),
            EpochValue::Text(_) => ColumnValues::Text(Vec::new()),
        }
    }

    fn push(&mut self, value: EpochValue) -> Result<(), EpochValue> {
        match (self, value) {
            (ColumnValues::Number(values), EpochValue::Number(n)) => values.push(n),
            (ColumnValues::Text(values), EpochValue::Text(s)) => values.push(s),
            (_, other) => return Err(other),
        }
        Ok(())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnValues::Number(_) => "number",
            ColumnValues::Text(_) => "text",
        }
    }

    pub fn get(&self, index: usize) -> Option<EpochValue> {
        match self {
            ColumnValues::Number(values) => values.get(index).copied().map(EpochValue::Number),
            ColumnValues::Text(values) => values.get(index).cloned().map(EpochValue::Text),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Number(values) => values.len(),
            ColumnValues::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named epoch column
#[derive(Debug, Clone, PartialEq)]
pub struct EpochColumn {
    pub name: String,
    pub values: ColumnValues,
}

/// Rectangular epoch table; row order is the processing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<EpochRow>", into = "Vec<EpochRow>")]
pub struct EpochTable {
    columns: Vec<EpochColumn>,
    rows: usize,
}

/// Build the epoch table, enforcing a uniform key set, one type per column
/// and `endTime >= startTime` for every row.
pub fn build_epoch_table(rows: Vec<EpochRow>) -> PdtResult<EpochTable> {
    let Some(first) = rows.first() else {
        return Ok(EpochTable::empty());
    };

    check_row_keys(0, first, None)?;
    let mut columns: Vec<EpochColumn> = first
        .fields()
        .iter()
        .map(|(name, value)| EpochColumn {
            name: name.clone(),
            values: ColumnValues::empty_like(value),
        })
        .collect();
    let expected_keys: Vec<String> = first.keys().map(str::to_string).collect();
    let expected: HashSet<&str> = expected_keys.iter().map(String::as_str).collect();

    let row_count = rows.len();
    for (index, row) in rows.into_iter().enumerate() {
        if index > 0 {
            check_row_keys(index, &row, Some(&expected))?;
        }
        check_required_types(index, &row)?;
        check_time_order(index, &row)?;

        let mut fields = row.fields;
        for column in &mut columns {
            let position = fields
                .iter()
                .position(|(k, _)| *k == column.name)
                .ok_or_else(|| schema_error!(index, "missing key '{}'", column.name))?;
            let (_, value) = fields.swap_remove(position);
            let value_type = value.type_name();
            column.values.push(value).map_err(|_| {
                schema_error!(
                    index,
                    "column '{}' holds {} values, got {}",
                    column.name,
                    column.values.type_name(),
                    value_type
                )
            })?;
        }
    }

    let table = EpochTable {
        columns,
        rows: row_count,
    };
    debug!(rows = table.len(), columns = table.columns.len(), "built epoch table");
    Ok(table)
}

fn check_row_keys(index: usize, row: &EpochRow, expected: Option<&HashSet<&str>>) -> PdtResult<()> {
    let mut seen = HashSet::with_capacity(row.len());
    for key in row.keys() {
        if !seen.insert(key) {
            return Err(schema_error!(index, "duplicate key '{}'", key));
        }
    }

    for required in REQUIRED_COLUMNS {
        if !seen.contains(required) {
            return Err(schema_error!(index, "missing required key '{}'", required));
        }
    }

    if let Some(expected) = expected {
        if &seen != expected {
            let mut missing: Vec<&str> = expected.difference(&seen).copied().collect();
            let mut unexpected: Vec<&str> = seen.difference(expected).copied().collect();
            missing.sort_unstable();
            unexpected.sort_unstable();
            return Err(schema_error!(
                index,
                "key set differs from row 0 (missing {:?}, unexpected {:?})",
                missing,
                unexpected
            ));
        }
    }

    Ok(())
}

fn check_required_types(index: usize, row: &EpochRow) -> PdtResult<()> {
    if let Some(value @ EpochValue::Number(_)) = row.get(EPOCH_NAME) {
        return Err(schema_error!(index, "'{}' must be text, got {}", EPOCH_NAME, value.type_name()));
    }
    for key in [START_TIME, END_TIME] {
        if let Some(value @ EpochValue::Text(_)) = row.get(key) {
            return Err(schema_error!(index, "'{}' must be a number, got {}", key, value.type_name()));
        }
    }
    Ok(())
}

fn check_time_order(index: usize, row: &EpochRow) -> PdtResult<()> {
    let start = row.get(START_TIME).and_then(EpochValue::as_number).unwrap_or(f64::NAN);
    let end = row.get(END_TIME).and_then(EpochValue::as_number).unwrap_or(f64::NAN);
    let name = row.get(EPOCH_NAME).and_then(EpochValue::as_text).unwrap_or_default();

    if !start.is_finite() || !end.is_finite() {
        return Err(validation_error!("epoch {} ('{}') has non-finite start or end time", index, name));
    }
    if end < start {
        return Err(validation_error!(
            "epoch {} ('{}') ends at {} before it starts at {}",
            index,
            name,
            end,
            start
        ));
    }
    Ok(())
}

impl EpochTable {
    /// Table with the required columns and no rows
    pub fn empty() -> Self {
        EpochTable {
            columns: vec![
                EpochColumn {
                    name: EPOCH_NAME.to_string(),
                    values: ColumnValues::Text(Vec::new()),
                },
                EpochColumn {
                    name: START_TIME.to_string(),
                    values: ColumnValues::Number(Vec::new()),
                },
                EpochColumn {
                    name: END_TIME.to_string(),
                    values: ColumnValues::Number(Vec::new()),
                },
            ],
            rows: 0,
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[EpochColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnValues> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.values)
    }

    /// Numeric column by name
    pub fn numbers(&self, name: &str) -> Option<&[f64]> {
        match self.column(name)? {
            ColumnValues::Number(values) => Some(values),
            ColumnValues::Text(_) => None,
        }
    }

    /// Text column by name
    pub fn texts(&self, name: &str) -> Option<&[String]> {
        match self.column(name)? {
            ColumnValues::Text(values) => Some(values),
            ColumnValues::Number(_) => None,
        }
    }

    pub fn epoch_names(&self) -> &[String] {
        self.texts(EPOCH_NAME).unwrap_or_default()
    }

    pub fn start_times(&self) -> &[f64] {
        self.numbers(START_TIME).unwrap_or_default()
    }

    pub fn end_times(&self) -> &[f64] {
        self.numbers(END_TIME).unwrap_or_default()
    }

    /// Reassemble row `index` in column order
    pub fn row(&self, index: usize) -> Option<EpochRow> {
        if index >= self.rows {
            return None;
        }
        let mut row = EpochRow::default();
        for column in &self.columns {
            row.push(column.name.clone(), column.values.get(index)?);
        }
        Some(row)
    }

    pub fn rows(&self) -> impl Iterator<Item = EpochRow> + '_ {
        (0..self.rows).filter_map(|i| self.row(i))
    }
}

impl TryFrom<Vec<EpochRow>> for EpochTable {
    type Error = PdtError;

    fn try_from(rows: Vec<EpochRow>) -> Result<Self, Self::Error> {
        build_epoch_table(rows)
    }
}

impl From<EpochTable> for Vec<EpochRow> {
    fn from(table: EpochTable) -> Self {
        table.rows().collect()
    }
}
