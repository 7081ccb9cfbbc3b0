// crates/ndvi-core/src/gap_fill.rs

use crate::types::Observation;

/// A unit's series on a complete daily calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseSeries {
    /// Days since 1970-01-01 of the first grid row.
    pub start_day: i32,
    /// Observed or interpolated NDVI; `None` where no usable value exists.
    pub values: Vec<Option<f64>>,
    /// Input-table row that identity columns are forward filled from.
    pub source_rows: Vec<usize>,
    /// Whether the grid day carried an observation before interpolation.
    pub observed: Vec<bool>,
}

impl DenseSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn observed_days(&self) -> usize {
        self.observed.iter().filter(|seen| **seen).count()
    }
}

/// Expands a day-ordered, duplicate-free series onto every calendar day between its
/// first and last observation, inclusive.
///
/// Values of exactly 0.0 are NDVI no-data: observed zeros are masked before linear
/// interpolation fills the interior gaps, and interpolation results of exactly 0.0 are
/// masked afterwards. Masked days at either end of the grid stay missing. Identity rows
/// are forward filled from the most recent observation. Returns `None` for an empty
/// or unordered series.
pub fn fill_daily(series: &[Observation]) -> Option<DenseSeries> {
    let first = series.first()?;
    let last = series.last()?;
    let start_day = first.day;
    let len = day_offset(last.day, start_day)? + 1;

    let mut values: Vec<Option<f64>> = vec![None; len];
    let mut observed = vec![false; len];
    let mut joined_rows: Vec<Option<usize>> = vec![None; len];

    for obs in series {
        let offset = day_offset(obs.day, start_day)?;
        values[offset] = Some(obs.value).filter(|value| *value != 0.0);
        observed[offset] = true;
        joined_rows[offset] = Some(obs.row);
    }

    interpolate_linear(&mut values);
    for value in values.iter_mut() {
        if *value == Some(0.0) {
            *value = None;
        }
    }

    let mut source_rows = Vec::with_capacity(len);
    let mut current = first.row;
    for row in joined_rows {
        if let Some(row) = row {
            current = row;
        }
        source_rows.push(current);
    }

    Some(DenseSeries {
        start_day,
        values,
        source_rows,
        observed,
    })
}

/// Grid offset of `day`, `None` when it precedes the grid start.
fn day_offset(day: i32, start_day: i32) -> Option<usize> {
    usize::try_from(i64::from(day) - i64::from(start_day)).ok()
}

/// Fills interior `None` runs by linear interpolation between the nearest known values.
/// Leading and trailing runs are left untouched.
pub fn interpolate_linear(values: &mut [Option<f64>]) {
    let mut previous: Option<(usize, f64)> = None;

    for idx in 0..values.len() {
        let Some(value) = values[idx] else {
            continue;
        };

        if let Some((prev_idx, prev_value)) = previous {
            let span = (idx - prev_idx) as f64;
            for gap in prev_idx + 1..idx {
                let fraction = (gap - prev_idx) as f64 / span;
                values[gap] = Some(prev_value + (value - prev_value) * fraction);
            }
        }
        previous = Some((idx, value));
    }
}

/// Left joins a series onto a daily grid, leaving `None` where it has no observation.
pub fn align_to_grid(series: &[Observation], start_day: i32, len: usize) -> Vec<Option<f64>> {
    let mut aligned = vec![None; len];
    for obs in series {
        let offset = i64::from(obs.day) - i64::from(start_day);
        if offset >= 0 && (offset as usize) < len {
            aligned[offset as usize] = Some(obs.value);
        }
    }
    aligned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_leaves_edges_missing() {
        let mut values = vec![None, Some(1.0), None, None, Some(4.0), None];
        interpolate_linear(&mut values);
        assert_eq!(
            values,
            vec![None, Some(1.0), Some(2.0), Some(3.0), Some(4.0), None]
        );
    }

    #[test]
    fn align_ignores_days_outside_the_grid() {
        use crate::types::Source;
        let series = vec![
            Observation::new(4, 0.1, Source::A, 0),
            Observation::new(5, 0.2, Source::A, 1),
            Observation::new(9, 0.3, Source::A, 2),
        ];
        assert_eq!(align_to_grid(&series, 5, 3), vec![Some(0.2), None, None]);
    }
}
