use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::models::{NormalizedRecord, Record};

pub const WEEKS_PER_YEAR: i32 = 52;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeSummary {
    pub rows: usize,
    pub regions: usize,
    pub rollover_rows: usize,
    pub pinned_dates: usize,
}

/// Shifts every row one epidemiological week back and sorts by (year, region, week).
///
/// Week 1 of year Y becomes week 52 of Y-1; every other week `w` becomes `w - 1`.
/// The whole table is validated before anything is rewritten, so a bad row
/// leaves no partial result behind.
pub fn normalize(records: Vec<Record>) -> Result<(Vec<NormalizedRecord>, NormalizeSummary)> {
    validate(&records)?;

    let mut summary = NormalizeSummary {
        rows: records.len(),
        ..NormalizeSummary::default()
    };
    let mut regions = HashSet::new();
    let mut normalized = Vec::with_capacity(records.len());

    for record in records {
        let rollover = record.week == 1;
        let (year, week) = if rollover {
            (record.year - 1, WEEKS_PER_YEAR as u32)
        } else {
            (record.year, (record.week - 1) as u32)
        };
        let (date, pinned) = week_start_date(year, week)?;

        summary.rollover_rows += usize::from(rollover);
        summary.pinned_dates += usize::from(pinned);
        if !regions.contains(record.region.as_str()) {
            regions.insert(record.region.clone());
        }

        normalized.push(NormalizedRecord {
            year,
            week,
            region: record.region,
            cumulative_male: record.cumulative_male,
            cumulative_female: record.cumulative_female,
            date,
            rollover,
        });
    }

    normalized.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| a.region.cmp(&b.region))
            .then_with(|| a.week.cmp(&b.week))
    });
    summary.regions = regions.len();

    tracing::info!(
        rows = summary.rows,
        regions = summary.regions,
        rollover_rows = summary.rollover_rows,
        pinned_dates = summary.pinned_dates,
        "weeks normalized"
    );
    Ok((normalized, summary))
}

/// Rejects weeks outside 1..=52 and repeated (region, year, week) keys.
pub fn validate(records: &[Record]) -> Result<()> {
    let mut seen: HashSet<(&str, i32, i32)> = HashSet::with_capacity(records.len());

    for record in records {
        if !(1..=WEEKS_PER_YEAR).contains(&record.week) {
            return Err(PipelineError::OutOfRange {
                region: record.region.clone(),
                year: record.year,
                week: record.week,
            });
        }
        if !seen.insert((record.region.as_str(), record.year, record.week)) {
            return Err(PipelineError::DuplicateKey {
                region: record.region.clone(),
                year: record.year,
                week: record.week,
            });
        }
    }

    Ok(())
}

/// Monday of ISO week `week` of `year`.
///
/// When that Monday falls outside `year` the date is pinned to January 1 of
/// `year`, so the row stays in its own calendar year on the time axis. The
/// second element reports whether the pin was applied.
pub fn week_start_date(year: i32, week: u32) -> Result<(NaiveDate, bool)> {
    let invalid = || PipelineError::InvalidDate { year, week };

    let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(invalid)?;
    if monday.year() == year {
        return Ok((monday, false));
    }

    let new_year = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
    Ok((new_year, true))
}
