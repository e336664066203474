//! Error types for the weekly series pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Fatal conditions. Anything here aborts the run before output is written.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source week outside the 1..=52 epidemiological calendar.
    #[error("week {week} out of range 1..=52 (region {region}, year {year})")]
    OutOfRange { region: String, year: i32, week: i32 },

    /// Two input rows share the same region and week.
    #[error("duplicate row for region {region}, year {year}, week {week}")]
    DuplicateKey { region: String, year: i32, week: i32 },

    #[error("no calendar date for year {year}, week {week}")]
    InvalidDate { year: i32, week: u32 },

    #[error("invalid column '{column}': {reason}")]
    InvalidColumn { column: String, reason: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PipelineError {
    pub fn missing_column(column: &str) -> Self {
        Self::InvalidColumn {
            column: column.to_string(),
            reason: "column does not exist",
        }
    }

    pub fn non_numeric_column(column: &str) -> Self {
        Self::InvalidColumn {
            column: column.to_string(),
            reason: "column is not numeric",
        }
    }
}
