//! Headerless delimited sample files

use crate::config::ChannelSpec;
use crate::error::{PdtError, PdtResult};
use crate::signals::SignalColumn;
use csv::{ReaderBuilder, Trim};
use std::path::Path;
use tracing::debug;

/// Numeric columns read from a raw recording, column-major
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    source: String,
    columns: Vec<Vec<f64>>,
}

/// Read a headerless delimited file with exactly `expected_columns` numeric
/// columns per row.
///
/// Blank lines are skipped and one trailing delimiter per row is tolerated.
/// NaN and infinite cells are rejected with their row and column.
pub fn load_raw_samples(path: &Path, delimiter: u8, expected_columns: usize) -> PdtResult<RawTable> {
    let source = path.display().to_string();
    if expected_columns == 0 {
        return Err(PdtError::Format {
            source,
            row: None,
            reason: "at least one raw column must be expected".to_string(),
        });
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let mut columns = vec![Vec::new(); expected_columns];
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        let line = record.position().map(|p| p.line() as usize);

        let mut fields: Vec<&str> = record.iter().collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        if fields.len() == expected_columns + 1 && fields.last() == Some(&"") {
            fields.pop();
        }
        if fields.len() != expected_columns {
            return Err(PdtError::Format {
                source,
                row: line,
                reason: format!("expected {} columns, found {}", expected_columns, fields.len()),
            });
        }

        for (index, (field, column)) in fields.iter().zip(columns.iter_mut()).enumerate() {
            let value = field.parse::<f64>().map_err(|_| PdtError::Format {
                source: source.clone(),
                row: line,
                reason: format!("column {}: cannot parse '{}' as a number", index + 1, field),
            })?;
            if !value.is_finite() {
                return Err(PdtError::Format {
                    source,
                    row: line,
                    reason: format!("column {}: '{}' is not a finite number", index + 1, field),
                });
            }
            column.push(value);
        }
    }

    let table = RawTable { source, columns };
    debug!(
        source = %table.source,
        columns = table.column_count(),
        rows = table.row_count(),
        "loaded raw samples"
    );
    Ok(table)
}

fn csv_error(path: &Path, err: csv::Error) -> PdtError {
    if err.is_io_error() {
        return PdtError::io(path, err);
    }
    PdtError::Format {
        source: path.display().to_string(),
        row: err.position().map(|p| p.line() as usize),
        reason: err.to_string(),
    }
}

impl RawTable {
    /// Path the samples were read from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Vec<f64>> {
        self.columns
    }

    /// Pair each column, in order, with a caller-supplied name, unit and description
    pub fn name_columns(self, specs: &[ChannelSpec]) -> PdtResult<Vec<SignalColumn>> {
        if specs.len() != self.columns.len() {
            return Err(PdtError::Format {
                source: self.source,
                row: None,
                reason: format!(
                    "{} channel names supplied for {} raw columns",
                    specs.len(),
                    self.columns.len()
                ),
            });
        }

        Ok(self
            .columns
            .into_iter()
            .zip(specs)
            .map(|(values, spec)| {
                SignalColumn::new(spec.name.clone(), values, spec.unit.clone(), spec.description.clone())
            })
            .collect())
    }
}
