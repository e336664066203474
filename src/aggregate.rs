use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::AggregationMode;
use crate::models::{AggregatedRecord, CorrectedRecord};

/// Sums increments by date, or by date and region, ordered by key.
///
/// Missing values are skipped. An unknown mode logs a warning and yields an
/// empty table; callers must not persist an empty result.
pub fn aggregate(rows: &[CorrectedRecord], mode: &AggregationMode) -> Vec<AggregatedRecord> {
    let by_region = match mode {
        AggregationMode::ByTime => false,
        AggregationMode::ByTimeAndRegion => true,
        AggregationMode::Unknown(value) => {
            tracing::warn!(mode = %value, "unknown aggregation mode, no aggregation produced");
            return Vec::new();
        }
    };

    let mut totals: BTreeMap<(NaiveDate, Option<&str>), (f64, f64)> = BTreeMap::new();
    for row in rows {
        let region = by_region.then_some(row.record.region.as_str());
        let entry = totals.entry((row.record.date, region)).or_insert((0.0, 0.0));
        entry.0 += skip_missing(row.increment_male);
        entry.1 += skip_missing(row.increment_female);
    }

    let aggregated: Vec<AggregatedRecord> = totals
        .into_iter()
        .map(|((date, region), (male, female))| AggregatedRecord {
            date,
            region: region.map(str::to_string),
            increment_male_total: male,
            increment_female_total: female,
        })
        .collect();

    tracing::info!(mode = %mode, rows = aggregated.len(), "increments aggregated");
    aggregated
}

fn skip_missing(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizedRecord;
    use proptest::prelude::*;

    fn row(region: &str, day: u32, male: f64, female: f64) -> CorrectedRecord {
        CorrectedRecord {
            record: NormalizedRecord {
                year: 2023,
                week: 10,
                region: region.to_string(),
                cumulative_male: 0.0,
                cumulative_female: 0.0,
                date: NaiveDate::from_ymd_opt(2023, 3, day).unwrap(),
                rollover: false,
            },
            increment_male: male,
            increment_female: female,
        }
    }

    #[test]
    fn by_time_builds_a_national_series() {
        let rows = vec![
            row("Sonora", 13, 3.0, 1.0),
            row("Yucatan", 6, 2.0, 2.0),
            row("Yucatan", 13, 4.0, 0.0),
            row("Sonora", 6, 1.0, 5.0),
        ];
        let out = aggregate(&rows, &AggregationMode::ByTime);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].date, NaiveDate::from_ymd_opt(2023, 3, 6).unwrap());
        assert_eq!(out[0].region, None);
        assert_eq!((out[0].increment_male_total, out[0].increment_female_total), (3.0, 7.0));
        assert_eq!((out[1].increment_male_total, out[1].increment_female_total), (7.0, 1.0));
    }

    #[test]
    fn by_time_and_region_keeps_regions_apart() {
        let rows = vec![
            row("Yucatan", 6, 2.0, 2.0),
            row("Sonora", 6, 1.0, 5.0),
            row("Sonora", 13, 3.0, 1.0),
        ];
        let out = aggregate(&rows, &AggregationMode::ByTimeAndRegion);
        let keys: Vec<(u32, &str, f64)> = out
            .iter()
            .map(|r| {
                use chrono::Datelike;
                (r.date.day(), r.region.as_deref().unwrap(), r.increment_male_total)
            })
            .collect();
        assert_eq!(keys, vec![(6, "Sonora", 1.0), (6, "Yucatan", 2.0), (13, "Sonora", 3.0)]);
    }

    #[test]
    fn missing_values_are_skipped_in_sums() {
        let rows = vec![row("Sonora", 6, f64::NAN, 1.0), row("Yucatan", 6, 2.0, 1.0)];
        let out = aggregate(&rows, &AggregationMode::ByTime);
        assert_eq!(out[0].increment_male_total, 2.0);
    }

    #[test]
    fn unknown_mode_returns_empty_table() {
        let rows = vec![row("Sonora", 6, 1.0, 1.0)];
        let out = aggregate(&rows, &AggregationMode::parse("Ambos"));
        assert!(out.is_empty());
    }

    proptest! {
        #[test]
        fn regional_totals_add_up_to_national_totals(
            cells in prop::collection::vec((0usize..4, 1u32..28, 0u32..1000, 0u32..1000), 0..60)
        ) {
            let regions = ["Sonora", "Yucatan", "Oaxaca", "Chiapas"];
            let rows: Vec<CorrectedRecord> = cells
                .iter()
                .map(|&(r, day, m, f)| row(regions[r], day, f64::from(m), f64::from(f)))
                .collect();

            let national = aggregate(&rows, &AggregationMode::ByTime);
            let regional = aggregate(&rows, &AggregationMode::ByTimeAndRegion);

            for total in &national {
                let (male, female) = regional
                    .iter()
                    .filter(|r| r.date == total.date)
                    .fold((0.0, 0.0), |acc, r| {
                        (acc.0 + r.increment_male_total, acc.1 + r.increment_female_total)
                    });
                prop_assert_eq!(male, total.increment_male_total);
                prop_assert_eq!(female, total.increment_female_total);
            }
            let dates: std::collections::BTreeSet<NaiveDate> =
                regional.iter().map(|r| r.date).collect();
            prop_assert_eq!(dates.len(), national.len());
        }
    }
}
