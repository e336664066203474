//! Tukey fences and outlier clipping.

use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::models::{Column, CorrectedRecord, IqrStats};

/// Linear interpolation between order statistics. `sorted` must be ascending and non-empty.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * p;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Quartiles and fences of `values`, skipping missing (NaN) entries.
///
/// All fields are NaN when nothing is left after dropping missing values.
pub fn iqr_stats(values: impl IntoIterator<Item = f64>, factor: f64) -> IqrStats {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return IqrStats::empty();
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    IqrStats {
        q1,
        q3,
        iqr,
        lower_fence: q1 - factor * iqr,
        upper_fence: q3 + factor * iqr,
    }
}

/// Resolves `name` to a numeric column of the corrected table.
pub fn numeric_column(name: &str) -> Result<Column> {
    match Column::parse(name) {
        None => Err(PipelineError::missing_column(name)),
        Some(Column::Region | Column::Date) => Err(PipelineError::non_numeric_column(name)),
        Some(column) => Ok(column),
    }
}

pub fn column_stats(rows: &[CorrectedRecord], name: &str, factor: f64) -> Result<(Column, IqrStats)> {
    let column = numeric_column(name)?;
    let stats = iqr_stats(rows.iter().filter_map(|row| row.value(column)), factor);
    Ok((column, stats))
}

/// Row positions whose `column` value lies outside the fences.
pub fn outlier_indices(rows: &[CorrectedRecord], column: Column, stats: &IqrStats) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| row.value(column).is_some_and(|v| stats.is_outlier(v)))
        .map(|(i, _)| i)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipSummary {
    pub column: Column,
    pub stats: IqrStats,
    pub clipped_low: usize,
    pub clipped_high: usize,
}

/// Clamps each listed column into its fences and rounds it to whole cases.
///
/// Columns are processed in order. An invalid name stops the pass with
/// [`PipelineError::InvalidColumn`]; no rows are ever removed.
pub fn clip_outliers(
    mut rows: Vec<CorrectedRecord>,
    columns: &[String],
    factor: f64,
) -> Result<(Vec<CorrectedRecord>, Vec<ClipSummary>)> {
    let mut summaries = Vec::with_capacity(columns.len());
    for name in columns {
        summaries.push(clip_column(&mut rows, name, factor)?);
    }
    Ok((rows, summaries))
}

pub fn clip_column(rows: &mut [CorrectedRecord], name: &str, factor: f64) -> Result<ClipSummary> {
    let (column, stats) = column_stats(rows, name, factor)?;
    if matches!(column, Column::Year | Column::Week) {
        return Err(PipelineError::InvalidColumn {
            column: name.to_string(),
            reason: "key columns cannot be clipped",
        });
    }

    let mut summary = ClipSummary {
        column,
        stats,
        clipped_low: 0,
        clipped_high: 0,
    };

    for row in rows.iter_mut() {
        let Some(value) = row.measure_mut(column) else {
            continue;
        };
        if *value < stats.lower_fence {
            *value = stats.lower_fence;
            summary.clipped_low += 1;
        } else if *value > stats.upper_fence {
            *value = stats.upper_fence;
            summary.clipped_high += 1;
        }
        *value = value.round_ties_even();
    }

    tracing::info!(
        column = %column,
        iqr = stats.iqr,
        q1 = stats.q1,
        q3 = stats.q3,
        "interquartile range computed"
    );
    tracing::info!(
        column = %column,
        lower_fence = stats.lower_fence,
        clipped_low = summary.clipped_low,
        upper_fence = stats.upper_fence,
        clipped_high = summary.clipped_high,
        "outliers clipped"
    );
    Ok(summary)
}
