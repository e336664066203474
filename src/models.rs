use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// One row of the raw weekly table, as loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub year: i32,
    pub week: i32,
    pub region: String,
    pub cumulative_male: f64,
    pub cumulative_female: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub year: i32,
    pub week: u32,
    pub region: String,
    pub cumulative_male: f64,
    pub cumulative_female: f64,
    pub date: NaiveDate,
    /// Set when the source week was 1 and the row was moved to week 52 of the prior year.
    pub rollover: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncrementRecord {
    pub record: NormalizedRecord,
    pub increment_male: f64,
    pub increment_female: f64,
}

/// Same shape as [`IncrementRecord`]; increments are non-negative or missing.
pub type CorrectedRecord = IncrementRecord;

impl IncrementRecord {
    pub fn increment(&self, sex: Sex) -> f64 {
        match sex {
            Sex::Male => self.increment_male,
            Sex::Female => self.increment_female,
        }
    }

    pub fn increment_mut(&mut self, sex: Sex) -> &mut f64 {
        match sex {
            Sex::Male => &mut self.increment_male,
            Sex::Female => &mut self.increment_female,
        }
    }

    /// Numeric value of `column`, or `None` when the column is not numeric.
    pub fn value(&self, column: Column) -> Option<f64> {
        match column {
            Column::Year => Some(self.record.year as f64),
            Column::Week => Some(self.record.week as f64),
            Column::CumulativeMale => Some(self.record.cumulative_male),
            Column::CumulativeFemale => Some(self.record.cumulative_female),
            Column::IncrementMale => Some(self.increment_male),
            Column::IncrementFemale => Some(self.increment_female),
            Column::Region | Column::Date => None,
        }
    }

    /// Mutable access to a measure column. Key columns are not writable.
    pub fn measure_mut(&mut self, column: Column) -> Option<&mut f64> {
        match column {
            Column::CumulativeMale => Some(&mut self.record.cumulative_male),
            Column::CumulativeFemale => Some(&mut self.record.cumulative_female),
            Column::IncrementMale => Some(&mut self.increment_male),
            Column::IncrementFemale => Some(&mut self.increment_female),
            Column::Year | Column::Week | Column::Region | Column::Date => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRecord {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub increment_male_total: f64,
    pub increment_female_total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrStats {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
}

impl IqrStats {
    pub fn empty() -> Self {
        Self {
            q1: f64::NAN,
            q3: f64::NAN,
            iqr: f64::NAN,
            lower_fence: f64::NAN,
            upper_fence: f64::NAN,
        }
    }

    /// NaN values and NaN fences never classify as outliers.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower_fence || value > self.upper_fence
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Male, Sex::Female];

    pub fn increment_column(self) -> Column {
        match self {
            Sex::Male => Column::IncrementMale,
            Sex::Female => Column::IncrementFemale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Year,
    Week,
    Region,
    Date,
    CumulativeMale,
    CumulativeFemale,
    IncrementMale,
    IncrementFemale,
}

impl Column {
    /// Resolves a column name, accepting the localized source headers as well.
    pub fn parse(name: &str) -> Option<Column> {
        let column = match name.trim().to_ascii_lowercase().as_str() {
            "year" | "anio" => Column::Year,
            "week" | "semana" => Column::Week,
            "region" | "entidad" => Column::Region,
            "date" | "fecha" => Column::Date,
            "cumulative_male" | "acumulado_hombres" => Column::CumulativeMale,
            "cumulative_female" | "acumulado_mujeres" => Column::CumulativeFemale,
            "increment_male" | "incremento_hombres" => Column::IncrementMale,
            "increment_female" | "incremento_mujeres" => Column::IncrementFemale,
            _ => return None,
        };
        Some(column)
    }

    pub fn name(self) -> &'static str {
        match self {
            Column::Year => "year",
            Column::Week => "week",
            Column::Region => "region",
            Column::Date => "date",
            Column::CumulativeMale => "cumulative_male",
            Column::CumulativeFemale => "cumulative_female",
            Column::IncrementMale => "increment_male",
            Column::IncrementFemale => "increment_female",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_accept_localized_headers() {
        assert_eq!(Column::parse("Incremento_hombres"), Some(Column::IncrementMale));
        assert_eq!(Column::parse("increment_female"), Some(Column::IncrementFemale));
        assert_eq!(Column::parse(" Entidad "), Some(Column::Region));
        assert_eq!(Column::parse("casos"), None);
    }

    #[test]
    fn nan_fences_classify_nothing() {
        let stats = IqrStats::empty();
        assert!(!stats.is_outlier(1.0e9));
        assert!(!stats.is_outlier(-1.0e9));
    }
}
