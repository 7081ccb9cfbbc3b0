// crates/ndvi-core/src/duplicates.rs

use crate::types::Observation;

/// Merges the two single-source series of a unit into one series with at most one
/// observation per day.
///
/// Source A is placed before source B and the union is stably sorted by day; of two
/// rows sharing a day the later one is kept, so source B wins whenever both sources
/// report on the same day.
pub fn resolve_duplicate_days(a: &[Observation], b: &[Observation]) -> Vec<Observation> {
    let mut combined: Vec<Observation> = Vec::with_capacity(a.len() + b.len());
    combined.extend_from_slice(a);
    combined.extend_from_slice(b);
    combined.sort_by_key(|obs| obs.day);

    let mut merged: Vec<Observation> = Vec::with_capacity(combined.len());
    for obs in combined {
        match merged.last_mut() {
            Some(last) if last.day == obs.day => *last = obs,
            _ => merged.push(obs),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Source;

    #[test]
    fn later_row_of_a_same_day_pair_is_kept() {
        let a = vec![
            Observation::new(1, 0.2, Source::A, 0),
            Observation::new(2, 0.4, Source::A, 1),
        ];
        let b = vec![
            Observation::new(2, 0.55, Source::B, 1),
            Observation::new(3, 0.6, Source::B, 2),
        ];

        let merged = resolve_duplicate_days(&a, &b);
        let days: Vec<i32> = merged.iter().map(|obs| obs.day).collect();
        assert_eq!(days, vec![1, 2, 3]);
        assert_eq!(merged[1].value, 0.55);
        assert_eq!(merged[1].source, Source::B);
    }
}
