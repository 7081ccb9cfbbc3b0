// crates/ndvi-core/src/pipeline.rs

use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{InsufficientDataPolicy, ReconcileConfig, INTERPOLATED_COLUMN, SMOOTHED_COLUMN};
use crate::duplicates::resolve_duplicate_days;
use crate::error::{ReconcileError, Result};
use crate::gap_fill::{align_to_grid, fill_daily};
use crate::outliers::remove_outliers;
use crate::schema::{read_raw_table, RawTable};
use crate::smoothing::{SavitzkyGolay, SmoothingError};
use crate::splitter::split_sources;
use crate::types::{Source, UnitId, UnitRows};

/// Per-unit counts describing what each stage did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    pub unit: UnitId,
    pub raw_rows: usize,
    pub source_a_rows: usize,
    pub source_b_rows: usize,
    pub merged_rows: usize,
    pub outliers_removed: usize,
    pub outlier_passes: usize,
    pub degenerate_windows: usize,
    /// Grid days that carried an observation before interpolation.
    pub observed_days: usize,
    pub dense_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Neither source had a usable observation for the unit.
    NoValidObservations,
    /// The dense daily series was shorter than the smoothing window.
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedUnit {
    pub unit: UnitId,
    pub reason: SkipReason,
    pub dense_rows: usize,
    pub window_length: usize,
}

/// Reconciled table plus the per-run bookkeeping.
#[derive(Debug, Clone)]
pub struct ReconcileOutput {
    pub dataframe: DataFrame,
    pub units: Vec<UnitReport>,
    pub skipped_units: Vec<SkippedUnit>,
}

/// The reconciled daily series of one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSeries {
    pub unit: UnitId,
    pub start_day: i32,
    pub smoothed: Vec<Option<f64>>,
    pub interpolated: Vec<Option<f64>>,
    pub raw_a: Vec<Option<f64>>,
    pub raw_b: Vec<Option<f64>>,
    pub source_rows: Vec<usize>,
    pub report: UnitReport,
}

impl UnitSeries {
    pub fn len(&self) -> usize {
        self.smoothed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.smoothed.is_empty()
    }
}

enum UnitOutcome {
    Reconciled(UnitSeries),
    Skipped(SkippedUnit),
}

/// Reconciles a raw two-source NDVI table into one smoothed daily series per unit.
///
/// Units are processed independently and emitted in the order they first appear in
/// `raw`. Units that cannot be smoothed are skipped and reported, or abort the run,
/// depending on `config.insufficient_data`.
pub fn reconcile(raw: &DataFrame, config: &ReconcileConfig) -> Result<ReconcileOutput> {
    config.validate()?;
    let table = read_raw_table(raw, config)?;
    info!(
        rows = table.row_count,
        units = table.units.len(),
        "reconciling NDVI observations"
    );

    let outcomes = run_units(&table.units, config)?;

    let mut series: Vec<UnitSeries> = Vec::new();
    let mut skipped_units: Vec<SkippedUnit> = Vec::new();
    for outcome in outcomes {
        match outcome? {
            UnitOutcome::Reconciled(unit) => series.push(unit),
            UnitOutcome::Skipped(skip) => {
                warn!(
                    unit = %skip.unit,
                    reason = ?skip.reason,
                    dense_rows = skip.dense_rows,
                    "skipping unit"
                );
                skipped_units.push(skip);
            }
        }
    }

    let dataframe = assemble(raw, config, &table, &series)?;
    info!(
        units = series.len(),
        skipped = skipped_units.len(),
        rows = dataframe.height(),
        "reconciliation finished"
    );

    Ok(ReconcileOutput {
        dataframe,
        units: series.into_iter().map(|unit| unit.report).collect(),
        skipped_units,
    })
}

fn run_units(units: &[UnitRows], config: &ReconcileConfig) -> Result<Vec<Result<UnitOutcome>>> {
    if config.concurrency <= 1 {
        return Ok(units.iter().map(|unit| run_unit(unit, config)).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.concurrency)
        .build()?;

    let mut ordered: Vec<(usize, Result<UnitOutcome>)> = pool.install(|| {
        units
            .par_iter()
            .enumerate()
            .map(|(index, unit)| (index, run_unit(unit, config)))
            .collect()
    });
    ordered.sort_by_key(|(index, _)| *index);

    Ok(ordered.into_iter().map(|(_, outcome)| outcome).collect())
}

fn run_unit(unit: &UnitRows, config: &ReconcileConfig) -> Result<UnitOutcome> {
    match reconcile_unit(unit, config) {
        Ok(Some(series)) => Ok(UnitOutcome::Reconciled(series)),
        Ok(None) => Ok(UnitOutcome::Skipped(SkippedUnit {
            unit: unit.id.clone(),
            reason: SkipReason::NoValidObservations,
            dense_rows: 0,
            window_length: config.smoothing.window_length,
        })),
        Err(ReconcileError::InsufficientData {
            unit,
            rows,
            window_length,
        }) if config.insufficient_data == InsufficientDataPolicy::Skip => {
            Ok(UnitOutcome::Skipped(SkippedUnit {
                unit,
                reason: SkipReason::InsufficientData,
                dense_rows: rows,
                window_length,
            }))
        }
        Err(err) => Err(err),
    }
}

/// Runs split, duplicate resolution, outlier removal, gap filling and smoothing for a
/// single unit. Returns `Ok(None)` when the unit has no usable observation.
pub fn reconcile_unit(unit: &UnitRows, config: &ReconcileConfig) -> Result<Option<UnitSeries>> {
    let split = split_sources(&unit.rows);
    if split.is_empty() {
        return Ok(None);
    }

    let merged = resolve_duplicate_days(&split.a, &split.b);
    let removal = remove_outliers(&merged, &config.outlier);
    let Some(dense) = fill_daily(&removal.kept) else {
        return Ok(None);
    };

    let filter = SavitzkyGolay::new(config.smoothing.window_length, config.smoothing.polyorder)
        .map_err(|source| ReconcileError::Smoothing {
            unit: unit.id.clone(),
            source,
        })?;
    let smoothed = filter.apply(&dense.values).map_err(|source| match source {
        SmoothingError::WindowTooLong { window_length, len } => ReconcileError::InsufficientData {
            unit: unit.id.clone(),
            rows: len,
            window_length,
        },
        source => ReconcileError::Smoothing {
            unit: unit.id.clone(),
            source,
        },
    })?;

    if removal.degenerate_windows > 0 {
        debug!(
            unit = %unit.id,
            windows = removal.degenerate_windows,
            "zero-variance outlier windows; rows retained"
        );
    }

    let report = UnitReport {
        unit: unit.id.clone(),
        raw_rows: unit.rows.len(),
        source_a_rows: split.a.len(),
        source_b_rows: split.b.len(),
        merged_rows: merged.len(),
        outliers_removed: removal.removed,
        outlier_passes: removal.passes,
        degenerate_windows: removal.degenerate_windows,
        observed_days: dense.observed_days(),
        dense_rows: dense.len(),
    };
    debug!(
        unit = %unit.id,
        merged = report.merged_rows,
        outliers = report.outliers_removed,
        dense = report.dense_rows,
        "unit reconciled"
    );

    Ok(Some(UnitSeries {
        unit: unit.id.clone(),
        start_day: dense.start_day,
        raw_a: align_to_grid(split.get(Source::A), dense.start_day, dense.len()),
        raw_b: align_to_grid(split.get(Source::B), dense.start_day, dense.len()),
        interpolated: dense.values,
        smoothed,
        source_rows: dense.source_rows,
        report,
    }))
}

/// Column buffers for the concatenated output.
#[derive(Default)]
struct OutputColumns {
    days: Vec<i32>,
    smoothed: Vec<Option<f64>>,
    interpolated: Vec<Option<f64>>,
    raw_a: Vec<Option<f64>>,
    raw_b: Vec<Option<f64>>,
    rows: Vec<IdxSize>,
}

impl OutputColumns {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            days: Vec::with_capacity(capacity),
            smoothed: Vec::with_capacity(capacity),
            interpolated: Vec::with_capacity(capacity),
            raw_a: Vec::with_capacity(capacity),
            raw_b: Vec::with_capacity(capacity),
            rows: Vec::with_capacity(capacity),
        }
    }

    fn append(&mut self, unit: &UnitSeries) {
        self.days
            .extend((0..unit.len() as i32).map(|offset| unit.start_day + offset));
        self.smoothed.extend_from_slice(&unit.smoothed);
        self.interpolated.extend_from_slice(&unit.interpolated);
        self.raw_a.extend_from_slice(&unit.raw_a);
        self.raw_b.extend_from_slice(&unit.raw_b);
        self.rows
            .extend(unit.source_rows.iter().map(|row| *row as IdxSize));
    }
}

fn assemble(
    raw: &DataFrame,
    config: &ReconcileConfig,
    table: &RawTable,
    series: &[UnitSeries],
) -> Result<DataFrame> {
    let total: usize = series.iter().map(UnitSeries::len).sum();

    // Seeded by the first unit processed, whatever its label.
    let mut accumulator: Option<OutputColumns> = None;
    for unit in series {
        match accumulator.as_mut() {
            Some(columns) => columns.append(unit),
            None => {
                let mut columns = OutputColumns::with_capacity(total);
                columns.append(unit);
                accumulator = Some(columns);
            }
        }
    }
    let columns = accumulator.unwrap_or_default();

    let mut identity_names: Vec<&str> = vec![config.unit_key.as_str()];
    identity_names.extend(table.passthrough.iter().map(String::as_str));
    let indices = IdxCa::from_vec("row".into(), columns.rows);
    let identity = raw.select(identity_names)?.take(&indices)?;

    let time = Series::new(config.time_column.as_str().into(), columns.days)
        .cast(&DataType::Date)?;

    let mut output: Vec<Column> = vec![
        identity.column(&config.unit_key)?.clone(),
        time.into(),
        Series::new(SMOOTHED_COLUMN.into(), columns.smoothed).into(),
        Series::new(INTERPOLATED_COLUMN.into(), columns.interpolated).into(),
    ];
    if config.keep_raw_columns {
        output.push(
            Series::new(
                config.sources.value_column(Source::A).into(),
                columns.raw_a,
            )
            .into(),
        );
        output.push(
            Series::new(
                config.sources.value_column(Source::B).into(),
                columns.raw_b,
            )
            .into(),
        );
    }
    for name in &table.passthrough {
        output.push(identity.column(name)?.clone());
    }

    Ok(DataFrame::new(output)?)
}
