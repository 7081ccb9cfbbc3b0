use ndvi_core::gap_fill::fill_daily;
use ndvi_core::{Observation, Source};

fn obs(day: i32, value: f64, row: usize) -> Observation {
    Observation::new(day, value, Source::A, row)
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("value present");
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn fills_every_day_between_observations() {
    let series = vec![obs(100, 0.3, 0), obs(104, 0.7, 1)];
    let dense = fill_daily(&series).expect("non-empty");

    assert_eq!(dense.start_day, 100);
    assert_eq!(dense.len(), 5);
    for (value, expected) in dense.values.iter().zip([0.3, 0.4, 0.5, 0.6, 0.7]) {
        assert_close(*value, expected);
    }
    assert_eq!(dense.observed, vec![true, false, false, false, true]);
    assert_eq!(dense.observed_days(), 2);
}

#[test]
fn grid_covers_first_to_last_day_without_gaps() {
    let days = [3, 4, 9, 10, 11, 25, 26, 40];
    let series: Vec<Observation> = days
        .iter()
        .enumerate()
        .map(|(idx, day)| obs(*day, 0.2 + 0.01 * idx as f64, idx))
        .collect();
    let dense = fill_daily(&series).expect("non-empty");

    assert_eq!(dense.start_day, 3);
    assert_eq!(dense.len(), 40 - 3 + 1);
    assert_eq!(dense.observed_days(), days.len());
    for day in days {
        assert!(dense.observed[(day - 3) as usize]);
    }
    assert!(dense.values.iter().all(Option::is_some));
}

#[test]
fn identity_rows_are_forward_filled() {
    let series = vec![obs(0, 0.3, 7), obs(2, 0.5, 9), obs(5, 0.4, 12)];
    let dense = fill_daily(&series).expect("non-empty");
    assert_eq!(dense.source_rows, vec![7, 7, 9, 9, 9, 12]);
}

#[test]
fn observed_zero_is_reinterpolated() {
    let series = vec![obs(0, 0.3, 0), obs(1, 0.0, 1), obs(2, 0.5, 2)];
    let dense = fill_daily(&series).expect("non-empty");

    assert_close(dense.values[1], 0.4);
    assert!(dense.observed[1]);
}

#[test]
fn zero_at_the_boundary_stays_missing() {
    let series = vec![obs(0, 0.0, 0), obs(1, 0.4, 1), obs(3, 0.6, 2)];
    let dense = fill_daily(&series).expect("non-empty");

    assert_eq!(dense.values[0], None);
    assert_close(dense.values[2], 0.5);
    assert_eq!(dense.len(), 4);
}

#[test]
fn interpolated_zero_is_masked() {
    let series = vec![obs(0, -0.2, 0), obs(2, 0.2, 1)];
    let dense = fill_daily(&series).expect("non-empty");

    assert_close(dense.values[0], -0.2);
    assert_eq!(dense.values[1], None);
    assert_close(dense.values[2], 0.2);
}

#[test]
fn single_observation_yields_one_row() {
    let dense = fill_daily(&[obs(42, 0.61, 3)]).expect("non-empty");
    assert_eq!(dense.len(), 1);
    assert_eq!(dense.values, vec![Some(0.61)]);
    assert_eq!(dense.source_rows, vec![3]);
}

#[test]
fn extreme_days_do_not_overflow_the_offset() {
    // MIN - MAX does not fit an i32.
    let unordered = vec![obs(i32::MAX, 0.3, 0), obs(i32::MIN, 0.5, 1)];
    assert!(fill_daily(&unordered).is_none());

    let series = vec![obs(i32::MIN, 0.3, 0), obs(i32::MIN + 2, 0.5, 1)];
    let dense = fill_daily(&series).expect("non-empty");
    assert_eq!(dense.len(), 3);
    assert_close(dense.values[1], 0.4);
}

#[test]
fn empty_series_has_no_grid() {
    assert!(fill_daily(&[]).is_none());
}
