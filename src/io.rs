use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::Result;
use crate::models::{AggregatedRecord, Record};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Anio")]
    year: i32,
    #[serde(alias = "Semana")]
    week: i32,
    #[serde(alias = "Entidad")]
    region: String,
    #[serde(alias = "Acumulado_hombres")]
    cumulative_male: Option<f64>,
    #[serde(alias = "Acumulado_mujeres")]
    cumulative_female: Option<f64>,
}

impl From<CsvRow> for Record {
    fn from(row: CsvRow) -> Self {
        Record {
            year: row.year,
            week: row.week,
            region: row.region,
            cumulative_male: row.cumulative_male.unwrap_or(f64::NAN),
            cumulative_female: row.cumulative_female.unwrap_or(f64::NAN),
        }
    }
}

pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path)?;
    let records = read_records(file)?;
    tracing::info!(path = %path.display(), rows = records.len(), "input table loaded");
    Ok(records)
}

/// Reads the weekly table. English and localized headers are both accepted;
/// empty cumulative cells become NaN.
pub fn read_records<R: Read>(source: R) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    let mut records: Vec<Record> = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        records.push(result?.into());
    }

    Ok(records)
}

/// Writes the aggregated table all-or-nothing: rows go to a temporary file in
/// the destination directory, which is renamed over `path` once flushed.
pub fn write_aggregated(path: &Path, rows: &[AggregatedRecord]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    let with_region = rows.iter().any(|row| row.region.is_some());

    {
        let mut writer = csv::Writer::from_writer(staged.as_file_mut());
        if with_region {
            writer.write_record(["date", "region", "increment_male_total", "increment_female_total"])?;
        } else {
            writer.write_record(["date", "increment_male_total", "increment_female_total"])?;
        }

        for row in rows {
            let date = row.date.to_string();
            let male = row.increment_male_total.to_string();
            let female = row.increment_female_total.to_string();
            match &row.region {
                Some(region) if with_region => writer.write_record([
                    date.as_str(),
                    region.as_str(),
                    male.as_str(),
                    female.as_str(),
                ])?,
                _ => writer.write_record([date.as_str(), male.as_str(), female.as_str()])?,
            }
        }
        writer.flush()?;
    }

    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| err.error)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "output table written");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    std::fs::write(path, body)?;
    Ok(())
}
