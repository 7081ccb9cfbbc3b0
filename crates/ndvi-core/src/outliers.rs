// crates/ndvi-core/src/outliers.rs

use crate::config::OutlierConfig;
use crate::types::Observation;

/// Rows in the centered rolling window: three before, the row itself, three after.
pub const WINDOW_SIZE: usize = 7;
pub const ZSCORE_THRESHOLD: f64 = 1.5;

const HALF_WINDOW: usize = WINDOW_SIZE / 2;

/// Rolling statistics for one row. Statistics are `None` when the window holds fewer
/// than `min_periods` rows (or a single row, which has no sample deviation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingScore {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub zscore: Option<f64>,
    pub delta: Option<f64>,
    pub outlier: bool,
    /// The window had zero variance; the row is kept.
    pub degenerate: bool,
}

/// Scores every value against its centered window.
///
/// A row is an outlier only when `|delta| > threshold` and `|zscore| > 1.5`. Missing
/// or non-finite z-scores never flag.
pub fn score(values: &[f64], config: &OutlierConfig) -> Vec<RollingScore> {
    let len = values.len();
    let min_periods = config.min_periods.max(1);

    (0..len)
        .map(|idx| {
            let start = idx.saturating_sub(HALF_WINDOW);
            let end = (idx + HALF_WINDOW + 1).min(len);
            let window = &values[start..end];
            let value = values[idx];

            let Some((mean, std)) = window_stats(window, min_periods) else {
                return RollingScore {
                    mean: None,
                    std: None,
                    zscore: None,
                    delta: None,
                    outlier: false,
                    degenerate: false,
                };
            };

            let delta = value - mean;
            let zscore = std.map(|std| delta / std).filter(|z| z.is_finite());
            let outlier = delta.abs() > config.threshold
                && zscore.is_some_and(|z| z.abs() > ZSCORE_THRESHOLD);

            RollingScore {
                mean: Some(mean),
                std,
                zscore,
                delta: Some(delta),
                outlier,
                degenerate: std == Some(0.0),
            }
        })
        .collect()
}

/// Mean and sample standard deviation of a window, `None` below `min_periods` rows.
fn window_stats(window: &[f64], min_periods: usize) -> Option<(f64, Option<f64>)> {
    let count = window.len();
    if count < min_periods {
        return None;
    }

    let first = window[0];
    if window.iter().all(|value| *value == first) {
        let std = (count > 1).then_some(0.0);
        return Some((first, std));
    }

    let mean = window.iter().sum::<f64>() / count as f64;
    if count < 2 {
        return Some((mean, None));
    }
    let variance = window
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (count - 1) as f64;
    Some((mean, Some(variance.sqrt())))
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlierRemoval {
    pub kept: Vec<Observation>,
    pub removed: usize,
    /// Passes that removed at least one row.
    pub passes: usize,
    /// Zero-variance windows seen on the final, outlier-free series.
    pub degenerate_windows: usize,
}

/// Removes outliers until the series is stable.
///
/// Each pass scores the current series and drops every flagged row; removing rows
/// changes the neighbourhoods, so passes repeat until one flags nothing. The result is
/// therefore a fixed point: scoring it again flags no row.
pub fn remove_outliers(series: &[Observation], config: &OutlierConfig) -> OutlierRemoval {
    let mut kept: Vec<Observation> = series.to_vec();
    let mut passes = 0;

    loop {
        let values: Vec<f64> = kept.iter().map(|obs| obs.value).collect();
        let scores = score(&values, config);

        if !scores.iter().any(|s| s.outlier) {
            let degenerate_windows = scores.iter().filter(|s| s.degenerate).count();
            return OutlierRemoval {
                removed: series.len() - kept.len(),
                kept,
                passes,
                degenerate_windows,
            };
        }

        let mut flags = scores.iter().map(|s| s.outlier);
        kept.retain(|_| !flags.next().unwrap_or(false));
        passes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_stats_use_sample_deviation() {
        let (mean, std) = window_stats(&[1.0, 2.0, 3.0, 4.0], 4).unwrap();
        assert!((mean - 2.5).abs() < 1e-12);
        assert!((std.unwrap() - 1.290_994_448_735_805_6).abs() < 1e-12);
    }

    #[test]
    fn single_row_window_has_no_deviation() {
        assert_eq!(window_stats(&[0.4], 1), Some((0.4, None)));
        assert_eq!(window_stats(&[0.4, 0.5], 3), None);
    }
}
