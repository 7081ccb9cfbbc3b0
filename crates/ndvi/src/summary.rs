// crates/ndvi/src/summary.rs

use comfy_table::Table;
use ndvi_core::{ReconcileOutput, SkippedUnit, UnitReport};
use serde::Serialize;

/// What the `--summary` file contains.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub output_rows: usize,
    pub units: &'a [UnitReport],
    pub skipped_units: &'a [SkippedUnit],
}

impl<'a> RunSummary<'a> {
    pub fn new(output: &'a ReconcileOutput) -> Self {
        Self {
            output_rows: output.dataframe.height(),
            units: &output.units,
            skipped_units: &output.skipped_units,
        }
    }
}

pub fn render_table(output: &ReconcileOutput) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "unit",
        "status",
        "raw rows",
        "merged",
        "outliers",
        "observed days",
        "daily rows",
    ]);

    for report in &output.units {
        table.add_row(vec![
            report.unit.to_string(),
            "reconciled".to_string(),
            report.raw_rows.to_string(),
            report.merged_rows.to_string(),
            report.outliers_removed.to_string(),
            report.observed_days.to_string(),
            report.dense_rows.to_string(),
        ]);
    }
    for skipped in &output.skipped_units {
        table.add_row(vec![
            skipped.unit.to_string(),
            format!("skipped ({:?})", skipped.reason),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            skipped.dense_rows.to_string(),
        ]);
    }
    table
}
