// crates/ndvi-core/src/schema.rs

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;

use crate::config::{ReconcileConfig, INTERPOLATED_COLUMN, SMOOTHED_COLUMN};
use crate::types::{date_to_day, RawRow, Source, UnitId, UnitRows};

/// Longest calendar span, in days, a single unit may cover.
pub const MAX_SPAN_DAYS: i64 = 100 * 366;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("required column '{column}' is missing")]
    MissingColumn { column: String },
    #[error("column '{column}' has unsupported type {dtype}")]
    UnsupportedType { column: String, dtype: String },
    #[error("column '{column}' contains {count} null values")]
    NullValues { column: String, count: usize },
    #[error("column '{column}' row {row} holds an unparseable date '{value}'")]
    InvalidDate {
        column: String,
        row: usize,
        value: String,
    },
    #[error("input column '{column}' clashes with an output column")]
    ReservedColumn { column: String },
    #[error("unit {unit} spans {days} days, more than the {max} allowed")]
    SpanTooLong { unit: UnitId, days: i64, max: i64 },
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

/// The raw observation table, validated and grouped by unit in first-appearance order.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub units: Vec<UnitRows>,
    pub row_count: usize,
    /// Columns outside the required set, carried to the output by forward fill.
    pub passthrough: Vec<String>,
}

pub fn read_raw_table(df: &DataFrame, config: &ReconcileConfig) -> Result<RawTable, SchemaError> {
    let present: HashSet<&str> = df
        .get_columns()
        .iter()
        .map(|column| column.name().as_str())
        .collect();

    let required = config.required_columns();
    for column in &required {
        if !present.contains(column.as_str()) {
            return Err(SchemaError::MissingColumn {
                column: column.clone(),
            });
        }
    }

    for column in [SMOOTHED_COLUMN, INTERPOLATED_COLUMN] {
        if present.contains(column) {
            return Err(SchemaError::ReservedColumn {
                column: column.to_string(),
            });
        }
    }

    let passthrough: Vec<String> = df
        .get_columns()
        .iter()
        .map(|column| column.name().to_string())
        .filter(|name| !required.contains(name))
        .collect();

    let unit_ids = read_unit_ids(df.column(&config.unit_key)?)?;
    let days = read_days(df.column(&config.time_column)?)?;
    let value_a = read_values(df.column(&config.sources.value_column(Source::A))?)?;
    let value_b = read_values(df.column(&config.sources.value_column(Source::B))?)?;
    let valid_a = read_quality(df.column(&config.sources.quality_column(Source::A))?)?;
    let valid_b = read_quality(df.column(&config.sources.quality_column(Source::B))?)?;

    let mut units: Vec<UnitRows> = Vec::new();
    let mut unit_index: HashMap<UnitId, usize> = HashMap::new();

    for (row, unit) in unit_ids.into_iter().enumerate() {
        let raw = RawRow {
            row,
            day: days[row],
            value_a: value_a[row],
            value_b: value_b[row],
            valid_a: valid_a[row],
            valid_b: valid_b[row],
        };

        match unit_index.get(&unit) {
            Some(&idx) => units[idx].rows.push(raw),
            None => {
                unit_index.insert(unit.clone(), units.len());
                units.push(UnitRows {
                    id: unit,
                    rows: vec![raw],
                });
            }
        }
    }

    for unit in &units {
        check_span(unit)?;
    }

    Ok(RawTable {
        units,
        row_count: df.height(),
        passthrough,
    })
}

fn read_unit_ids(column: &Column) -> Result<Vec<UnitId>, SchemaError> {
    reject_nulls(column)?;
    let series = column.as_materialized_series();

    match series.dtype() {
        dtype if dtype.is_unsigned_integer() => {
            let cast = series.strict_cast(&DataType::UInt64)?;
            Ok(cast
                .u64()?
                .into_no_null_iter()
                .map(UnitId::from)
                .collect())
        }
        dtype if dtype.is_integer() => {
            let cast = series.strict_cast(&DataType::Int64)?;
            Ok(cast
                .i64()?
                .into_no_null_iter()
                .map(UnitId::Int)
                .collect())
        }
        DataType::String => Ok(series
            .str()?
            .into_no_null_iter()
            .map(UnitId::from)
            .collect()),
        dtype => Err(unsupported(column, dtype)),
    }
}

fn read_days(column: &Column) -> Result<Vec<i32>, SchemaError> {
    reject_nulls(column)?;
    let series = column.as_materialized_series();

    match series.dtype() {
        DataType::Date | DataType::Datetime(_, _) => {
            let days = series.cast(&DataType::Date)?.cast(&DataType::Int32)?;
            Ok(days.i32()?.into_no_null_iter().collect())
        }
        DataType::String => series
            .str()?
            .into_no_null_iter()
            .enumerate()
            .map(|(row, value)| {
                parse_day(value).ok_or_else(|| SchemaError::InvalidDate {
                    column: column.name().to_string(),
                    row,
                    value: value.to_string(),
                })
            })
            .collect(),
        dtype => Err(unsupported(column, dtype)),
    }
}

fn check_span(unit: &UnitRows) -> Result<(), SchemaError> {
    let days = unit.rows.iter().map(|row| i64::from(row.day));
    let (Some(first), Some(last)) = (days.clone().min(), days.max()) else {
        return Ok(());
    };
    let span = last - first + 1;
    if span > MAX_SPAN_DAYS {
        return Err(SchemaError::SpanTooLong {
            unit: unit.id.clone(),
            days: span,
            max: MAX_SPAN_DAYS,
        });
    }
    Ok(())
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part which is discarded.
fn parse_day(value: &str) -> Option<i32> {
    let date_part = value.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .map(date_to_day)
}

fn read_values(column: &Column) -> Result<Vec<Option<f64>>, SchemaError> {
    let series = column.as_materialized_series();
    if !is_numeric(series.dtype()) {
        return Err(unsupported(column, series.dtype()));
    }

    let cast = series.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|value| value.filter(|v| v.is_finite()))
        .collect())
}

/// Quality flags: 1 (or `true`) marks a usable value; null counts as unusable.
fn read_quality(column: &Column) -> Result<Vec<bool>, SchemaError> {
    let series = column.as_materialized_series();

    match series.dtype() {
        DataType::Boolean => Ok(series
            .bool()?
            .into_iter()
            .map(|flag| flag.unwrap_or(false))
            .collect()),
        dtype if is_numeric(dtype) => {
            let cast = series.cast(&DataType::Int64)?;
            Ok(cast
                .i64()?
                .into_iter()
                .map(|flag| flag == Some(1))
                .collect())
        }
        dtype => Err(unsupported(column, dtype)),
    }
}

fn is_numeric(dtype: &DataType) -> bool {
    dtype.is_integer() || dtype.is_float()
}

fn reject_nulls(column: &Column) -> Result<(), SchemaError> {
    let count = column.null_count();
    if count > 0 {
        return Err(SchemaError::NullValues {
            column: column.name().to_string(),
            count,
        });
    }
    Ok(())
}

fn unsupported(column: &Column, dtype: &DataType) -> SchemaError {
    SchemaError::UnsupportedType {
        column: column.name().to_string(),
        dtype: dtype.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_day_accepts_dates_and_datetimes() {
        assert_eq!(parse_day("1970-01-02"), Some(1));
        assert_eq!(parse_day("1970-01-02T12:30:00"), Some(1));
        assert_eq!(parse_day("1970-01-02 23:59:59"), Some(1));
        assert_eq!(parse_day("02/01/1970"), None);
        assert_eq!(parse_day("1970"), None);
    }
}
