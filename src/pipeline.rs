use serde::Serialize;

use crate::aggregate::aggregate;
use crate::config::PipelineConfig;
use crate::correction::{correct_negatives, CorrectionSummary};
use crate::error::Result;
use crate::increments::to_increments;
use crate::iqr::{clip_outliers, ClipSummary};
use crate::models::{AggregatedRecord, CorrectedRecord, Record};
use crate::weeks::{normalize, NormalizeSummary};

/// Counters gathered along one run, for logs and the audit report.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineAudit {
    pub normalize: NormalizeSummary,
    pub corrections: Vec<CorrectionSummary>,
    pub clipping_enabled: bool,
    pub clipping: Vec<ClipSummary>,
    pub aggregation: String,
    pub output_rows: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub rows: Vec<AggregatedRecord>,
    pub audit: PipelineAudit,
}

/// Raw -> Normalized -> Incremented -> Corrected.
pub fn correct(
    records: Vec<Record>,
) -> Result<(Vec<CorrectedRecord>, NormalizeSummary, Vec<CorrectionSummary>)> {
    let (normalized, normalize_summary) = normalize(records)?;
    let incremented = to_increments(normalized);
    let (corrected, corrections) = correct_negatives(incremented);
    Ok((corrected, normalize_summary, corrections))
}

/// Runs every stage in memory. Any error aborts the whole run; nothing is
/// written here, so a failed run never leaves partial output behind.
pub fn run(records: Vec<Record>, config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;
    let span = tracing::info_span!("pipeline", rows = records.len());
    let _guard = span.enter();

    let (mut table, normalize_summary, corrections) = correct(records)?;

    let mut clipping = Vec::new();
    if config.outliers.enabled {
        tracing::info!(
            columns = ?config.outliers.columns,
            factor = config.outliers.factor,
            "IQR clipping enabled"
        );
        let (clipped, summaries) =
            clip_outliers(table, &config.outliers.columns, config.outliers.factor)?;
        table = clipped;
        clipping = summaries;
    }

    let rows = aggregate(&table, &config.aggregation);
    let audit = PipelineAudit {
        normalize: normalize_summary,
        corrections,
        clipping_enabled: config.outliers.enabled,
        clipping,
        aggregation: config.aggregation.label().to_string(),
        output_rows: rows.len(),
    };
    Ok(PipelineOutput { rows, audit })
}
