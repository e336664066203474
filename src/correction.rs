use serde::Serialize;

use crate::models::{Column, CorrectedRecord, IncrementRecord, NormalizedRecord, Sex};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionSummary {
    pub column: Column,
    /// Negative increments before correction.
    pub negatives: usize,
    /// Negatives whose previous row is the same region's direct predecessor.
    pub candidates: usize,
    /// Candidates pooled into the predecessor.
    pub pooled: usize,
    /// Candidates zeroed because the pooled value was still negative.
    pub absorbed: usize,
    /// Remaining negatives floored to zero (no usable predecessor).
    pub floored: usize,
}

impl CorrectionSummary {
    fn new(column: Column) -> Self {
        Self {
            column,
            negatives: 0,
            candidates: 0,
            pooled: 0,
            absorbed: 0,
            floored: 0,
        }
    }
}

/// `prev` is `current`'s direct predecessor: same year and region, exactly one week earlier.
pub fn is_direct_predecessor(prev: &NormalizedRecord, current: &NormalizedRecord) -> bool {
    prev.year == current.year && prev.region == current.region && current.week == prev.week + 1
}

/// Removes negative increments left behind by downward revisions of the cumulative count.
///
/// Runs once per sex column; the columns never influence each other.
pub fn correct_negatives(
    mut rows: Vec<IncrementRecord>,
) -> (Vec<CorrectedRecord>, Vec<CorrectionSummary>) {
    let summaries: Vec<CorrectionSummary> = Sex::ALL
        .iter()
        .map(|&sex| correct_column(&mut rows, sex))
        .collect();
    (rows, summaries)
}

/// Single pass over one increment column, in normalizer order.
///
/// A negative at row `i` with a direct predecessor is pooled with row `i - 1`
/// using the values as they stood before the pass. A non-negative pool replaces
/// row `i - 1` and row `i` becomes zero; a negative pool is dropped and row `i`
/// becomes zero. Row `i - 1` is never re-examined, so in a run of consecutive
/// negatives only the first one reaches its predecessor. Whatever is still
/// negative afterwards is floored to zero.
pub fn correct_column(rows: &mut [IncrementRecord], sex: Sex) -> CorrectionSummary {
    let column = sex.increment_column();
    let mut summary = CorrectionSummary::new(column);
    let before: Vec<f64> = rows.iter().map(|row| row.increment(sex)).collect();
    summary.negatives = before.iter().filter(|value| **value < 0.0).count();

    for i in 1..rows.len() {
        let negative = before[i] < 0.0;
        if !negative || !is_direct_predecessor(&rows[i - 1].record, &rows[i].record) {
            continue;
        }
        summary.candidates += 1;

        let pooled = before[i - 1] + before[i];
        if pooled >= 0.0 {
            *rows[i - 1].increment_mut(sex) = pooled;
            summary.pooled += 1;
        } else {
            summary.absorbed += 1;
        }
        *rows[i].increment_mut(sex) = 0.0;
    }

    for row in rows.iter_mut() {
        let value = row.increment(sex);
        if value < 0.0 {
            tracing::debug!(
                column = %column,
                region = %row.record.region,
                year = row.record.year,
                week = row.record.week,
                value,
                "negative increment without predecessor floored to zero"
            );
            *row.increment_mut(sex) = 0.0;
            summary.floored += 1;
        }
    }

    tracing::info!(
        column = %column,
        negatives = summary.negatives,
        candidates = summary.candidates,
        pooled = summary.pooled,
        absorbed = summary.absorbed,
        "negative increments corrected"
    );
    if summary.floored > 0 {
        tracing::warn!(
            column = %column,
            floored = summary.floored,
            "negative increments had no consecutive predecessor"
        );
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn row(region: &str, year: i32, week: u32, male: f64, female: f64) -> IncrementRecord {
        IncrementRecord {
            record: NormalizedRecord {
                year,
                week,
                region: region.to_string(),
                cumulative_male: 0.0,
                cumulative_female: 0.0,
                date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
                rollover: week == 52,
            },
            increment_male: male,
            increment_female: female,
        }
    }

    fn series(values: &[f64]) -> Vec<IncrementRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| row("Sonora", 2021, 10 + i as u32, v, 0.0))
            .collect()
    }

    fn males(rows: &[IncrementRecord]) -> Vec<f64> {
        rows.iter().map(|r| r.increment_male).collect()
    }

    #[test]
    fn revision_is_returned_to_previous_week() {
        let (rows, summaries) = correct_negatives(series(&[100.0, 50.0, -10.0, 60.0]));
        assert_eq!(males(&rows), vec![100.0, 40.0, 0.0, 60.0]);
        let male = &summaries[0];
        assert_eq!(male.column, Column::IncrementMale);
        assert_eq!((male.negatives, male.candidates, male.pooled), (1, 1, 1));
        assert_eq!((male.absorbed, male.floored), (0, 0));
    }

    #[test]
    fn drop_then_recover_pools_into_first_week() {
        let (rows, _) = correct_negatives(series(&[100.0, -70.0, 170.0]));
        assert_eq!(males(&rows), vec![30.0, 0.0, 170.0]);
    }

    #[test]
    fn negative_pool_is_absorbed_without_touching_predecessor() {
        let (rows, summaries) = correct_negatives(series(&[5.0, 20.0, -50.0, 8.0]));
        assert_eq!(males(&rows), vec![5.0, 20.0, 0.0, 8.0]);
        assert_eq!(summaries[0].absorbed, 1);
        assert_eq!(summaries[0].pooled, 0);
    }

    #[test]
    fn chained_revisions_are_corrected_in_a_single_pass() {
        // Only the first negative reaches the 100; the rest are pooled with a
        // negative neighbour and dropped.
        let (rows, summaries) = correct_negatives(series(&[100.0, -10.0, -20.0, -5.0, 40.0]));
        assert_eq!(males(&rows), vec![90.0, 0.0, 0.0, 0.0, 40.0]);
        let male = &summaries[0];
        assert_eq!((male.negatives, male.candidates), (3, 3));
        assert_eq!((male.pooled, male.absorbed, male.floored), (1, 2, 0));
    }

    #[test]
    fn week_gap_disqualifies_the_candidate() {
        let rows = vec![
            row("Sonora", 2021, 10, 50.0, 0.0),
            row("Sonora", 2021, 12, -10.0, 0.0),
        ];
        let (rows, summaries) = correct_negatives(rows);
        assert_eq!(males(&rows), vec![50.0, 0.0]);
        assert_eq!(summaries[0].candidates, 0);
        assert_eq!(summaries[0].floored, 1);
    }

    #[test]
    fn other_region_is_not_a_predecessor() {
        let rows = vec![
            row("Sonora", 2021, 10, 50.0, 0.0),
            row("Yucatan", 2021, 11, -10.0, 0.0),
        ];
        let (rows, _) = correct_negatives(rows);
        assert_eq!(males(&rows), vec![50.0, 0.0]);
    }

    #[test]
    fn year_boundary_is_not_a_predecessor() {
        let rows = vec![
            row("Sonora", 2020, 52, 50.0, 0.0),
            row("Sonora", 2021, 1, -10.0, 0.0),
        ];
        let (rows, summaries) = correct_negatives(rows);
        assert_eq!(males(&rows), vec![50.0, 0.0]);
        assert_eq!(summaries[0].floored, 1);
    }

    #[test]
    fn first_row_negative_is_floored() {
        let (rows, summaries) = correct_negatives(series(&[-3.0, 4.0]));
        assert_eq!(males(&rows), vec![0.0, 4.0]);
        assert_eq!(summaries[0].floored, 1);
    }

    #[test]
    fn columns_are_corrected_independently() {
        let rows = vec![
            row("Sonora", 2021, 10, 100.0, 7.0),
            row("Sonora", 2021, 11, -10.0, 3.0),
            row("Sonora", 2021, 12, 5.0, -9.0),
        ];
        let (rows, summaries) = correct_negatives(rows);
        assert_eq!(males(&rows), vec![90.0, 0.0, 5.0]);
        let female: Vec<f64> = rows.iter().map(|r| r.increment_female).collect();
        assert_eq!(female, vec![7.0, 3.0, 0.0]);
        assert_eq!(summaries[1].column, Column::IncrementFemale);
        assert_eq!(summaries[1].absorbed, 1);
    }

    #[test]
    fn missing_values_are_left_alone() {
        let (rows, _) = correct_negatives(series(&[f64::NAN, -4.0, 3.0]));
        assert!(rows[0].increment_male.is_nan());
        assert_eq!(rows[1].increment_male, 0.0);
        assert_eq!(rows[2].increment_male, 3.0);
    }

    proptest! {
        #[test]
        fn corrected_increments_are_never_negative(
            values in prop::collection::vec(-500i32..500, 1..60)
        ) {
            let values: Vec<f64> = values.into_iter().map(f64::from).collect();
            let (rows, _) = correct_negatives(series(&values));
            for row in &rows {
                prop_assert!(row.increment_male >= 0.0);
            }
        }

        #[test]
        fn pooling_never_increases_the_total(
            values in prop::collection::vec(-500i32..500, 1..60)
        ) {
            let values: Vec<f64> = values.into_iter().map(f64::from).collect();
            let positive_total: f64 = values.iter().filter(|v| **v > 0.0).sum();
            let (rows, _) = correct_negatives(series(&values));
            let corrected_total: f64 = rows.iter().map(|r| r.increment_male).sum();
            prop_assert!(corrected_total <= positive_total);
        }
    }
}
