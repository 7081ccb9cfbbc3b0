// crates/ndvi-core/src/splitter.rs

use crate::types::{Observation, RawRow, Source};

/// The two single-source series of one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSplit {
    pub a: Vec<Observation>,
    pub b: Vec<Observation>,
}

impl SourceSplit {
    pub fn get(&self, source: Source) -> &[Observation] {
        match source {
            Source::A => &self.a,
            Source::B => &self.b,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty() && self.b.is_empty()
    }
}

/// Splits one unit's raw rows into a day-ordered series per source.
///
/// Only rows whose quality flag is set and whose value is present are kept, and a
/// value equal to its predecessor in the filtered sequence is dropped as a sensor echo.
/// Callers must pass the rows of a single unit: the echo guard compares neighbours
/// and would otherwise reach across units.
pub fn split_sources(rows: &[RawRow]) -> SourceSplit {
    let mut ordered: Vec<&RawRow> = rows.iter().collect();
    ordered.sort_by_key(|row| row.day);

    SourceSplit {
        a: single_source(&ordered, Source::A),
        b: single_source(&ordered, Source::B),
    }
}

fn single_source(rows: &[&RawRow], source: Source) -> Vec<Observation> {
    let mut series: Vec<Observation> = rows
        .iter()
        .filter_map(|row| {
            let (valid, value) = match source {
                Source::A => (row.valid_a, row.value_a),
                Source::B => (row.valid_b, row.value_b),
            };
            if !valid {
                return None;
            }
            value.map(|value| Observation::new(row.day, value, source, row.row))
        })
        .collect();

    collapse_repeats(&mut series);
    series
}

/// Removes every observation whose value equals the one before it.
pub fn collapse_repeats(series: &mut Vec<Observation>) {
    series.dedup_by(|current, previous| current.value == previous.value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(row: usize, day: i32, a: Option<f64>, b: Option<f64>) -> RawRow {
        RawRow {
            row,
            day,
            value_a: a,
            value_b: b,
            valid_a: a.is_some(),
            valid_b: b.is_some(),
        }
    }

    #[test]
    fn repeats_collapse_to_first_of_run() {
        let rows = vec![
            row(0, 1, Some(0.5), None),
            row(1, 2, Some(0.5), None),
            row(2, 3, Some(0.6), None),
            row(3, 4, Some(0.5), None),
        ];
        let split = split_sources(&rows);
        let days: Vec<i32> = split.a.iter().map(|obs| obs.day).collect();
        assert_eq!(days, vec![1, 3, 4]);
        assert!(split.b.is_empty());
    }

    #[test]
    fn rows_are_sorted_by_day_before_the_echo_guard() {
        let rows = vec![
            row(0, 3, Some(0.4), None),
            row(1, 1, Some(0.4), None),
            row(2, 2, Some(0.7), None),
        ];
        let split = split_sources(&rows);
        let kept: Vec<(i32, usize)> = split.a.iter().map(|obs| (obs.day, obs.row)).collect();
        assert_eq!(kept, vec![(1, 1), (2, 2), (3, 0)]);
    }
}
