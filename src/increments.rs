use std::collections::HashMap;

use crate::models::{IncrementRecord, NormalizedRecord};

/// Derives weekly increments from cumulative counts.
///
/// Expects rows in normalizer order, where each region's rows appear
/// chronologically. The lag is keyed by region, never by global row position.
/// The first row of a region and every rollover row take their cumulative
/// value as the increment: a rollover row opens a new yearly cumulative series.
pub fn to_increments(records: Vec<NormalizedRecord>) -> Vec<IncrementRecord> {
    let mut previous: HashMap<String, (f64, f64)> = HashMap::new();
    let mut base_rows = 0usize;
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        let current = (record.cumulative_male, record.cumulative_female);
        let (increment_male, increment_female) = match previous.get(&record.region) {
            Some(&(male, female)) if !record.rollover => (current.0 - male, current.1 - female),
            _ => {
                base_rows += 1;
                current
            }
        };

        match previous.get_mut(&record.region) {
            Some(last) => *last = current,
            None => {
                previous.insert(record.region.clone(), current);
            }
        }

        rows.push(IncrementRecord {
            record,
            increment_male,
            increment_female,
        });
    }

    tracing::info!(
        rows = rows.len(),
        regions = previous.len(),
        base_rows,
        "increments derived"
    );
    rows
}
