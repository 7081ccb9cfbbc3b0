// crates/ndvi-core/src/types.rs

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// `NaiveDate::num_days_from_ce` of 1970-01-01; polars stores `Date` as days since then.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Identifier of a spatial unit (a point or a polygon).
///
/// Unit ids are arbitrary labels: integers are not assumed to start at zero or be dense.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitId {
    Int(i64),
    /// Unsigned label too large for `Int`.
    UInt(u64),
    Text(String),
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitId::Int(value) => write!(f, "{value}"),
            UnitId::UInt(value) => write!(f, "{value}"),
            UnitId::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for UnitId {
    fn from(value: i64) -> Self {
        UnitId::Int(value)
    }
}

impl From<u64> for UnitId {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(UnitId::UInt(value), UnitId::Int)
    }
}

impl From<&str> for UnitId {
    fn from(value: &str) -> Self {
        UnitId::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    A,
    B,
}

/// One raw-table row, already narrowed to the fields the pipeline reads.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Position of the row in the input table.
    pub row: usize,
    pub day: i32,
    pub value_a: Option<f64>,
    pub value_b: Option<f64>,
    pub valid_a: bool,
    pub valid_b: bool,
}

/// All raw rows of one unit, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitRows {
    pub id: UnitId,
    pub rows: Vec<RawRow>,
}

/// A single NDVI observation on a given day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Days since 1970-01-01.
    pub day: i32,
    pub value: f64,
    pub source: Source,
    /// Input-table row the observation was read from.
    pub row: usize,
}

impl Observation {
    pub fn new(day: i32, value: f64, source: Source, row: usize) -> Self {
        Self {
            day,
            value,
            source,
            row,
        }
    }
}

pub fn date_to_day(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}
