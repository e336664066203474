use std::fmt::Write;

use crate::models::AggregatedRecord;
use crate::pipeline::PipelineAudit;

#[derive(Debug, Clone, PartialEq)]
pub struct PeakWeek {
    pub label: String,
    pub total: f64,
}

/// Weeks with the most cases (both sexes), largest first.
pub fn peak_weeks(rows: &[AggregatedRecord], limit: usize) -> Vec<PeakWeek> {
    let mut peaks: Vec<PeakWeek> = rows
        .iter()
        .map(|row| PeakWeek {
            label: match &row.region {
                Some(region) => format!("{} {}", row.date, region),
                None => row.date.to_string(),
            },
            total: row.increment_male_total + row.increment_female_total,
        })
        .collect();

    peaks.sort_by(|a, b| b.total.total_cmp(&a.total));
    peaks.truncate(limit);
    peaks
}

pub fn build_report(source: &str, audit: &PipelineAudit, rows: &[AggregatedRecord]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Weekly Series Audit Report");
    let _ = writeln!(
        output,
        "Generated for {} (aggregation {})",
        source, audit.aggregation
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Week Normalization");
    let _ = writeln!(
        output,
        "- {} rows across {} regions",
        audit.normalize.rows, audit.normalize.regions
    );
    let _ = writeln!(
        output,
        "- {} rollover rows moved to week 52 of the prior year",
        audit.normalize.rollover_rows
    );
    let _ = writeln!(
        output,
        "- {} week start dates pinned to January 1",
        audit.normalize.pinned_dates
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Negative Increment Corrections");
    let _ = writeln!(output, "| column | negatives | candidates | pooled | absorbed | floored |");
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    for summary in &audit.corrections {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} |",
            summary.column,
            summary.negatives,
            summary.candidates,
            summary.pooled,
            summary.absorbed,
            summary.floored
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Outlier Clipping");
    if !audit.clipping_enabled {
        let _ = writeln!(output, "IQR clipping disabled for this run.");
    } else {
        let _ = writeln!(output, "| column | Q1 | Q3 | IQR | lower | upper | clipped low | clipped high |");
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");
        for summary in &audit.clipping {
            let stats = &summary.stats;
            let _ = writeln!(
                output,
                "| {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} | {} | {} |",
                summary.column,
                stats.q1,
                stats.q3,
                stats.iqr,
                stats.lower_fence,
                stats.upper_fence,
                summary.clipped_low,
                summary.clipped_high
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Output Series");
    match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => {
            let _ = writeln!(
                output,
                "{} rows from {} to {}",
                rows.len(),
                first.date,
                last.date
            );
            let _ = writeln!(output);
            let _ = writeln!(output, "Highest weekly totals:");
            for peak in peak_weeks(rows, 5) {
                let _ = writeln!(output, "- {}: {:.0} cases", peak.label, peak.total);
            }
        }
        _ => {
            let _ = writeln!(output, "No aggregated rows; the output table was not written.");
        }
    }

    output
}
