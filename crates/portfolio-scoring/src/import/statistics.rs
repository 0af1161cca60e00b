use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::ImportError;
use crate::evaluation::IndicatorStatistics;
use crate::portfolio::{ProviderError, StatisticsProvider};
use crate::rubric::RubricContext;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CohortKey {
    indicator_id: String,
    year: u16,
    education_level: String,
    /// Empty for rows that apply to every subject.
    subject: String,
}

impl CohortKey {
    fn new(indicator_id: &str, year: u16, education_level: &str, subject: &str) -> Self {
        Self {
            indicator_id: indicator_id.to_string(),
            year,
            education_level: education_level.trim().to_lowercase(),
            subject: subject.trim().to_lowercase(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatisticsRow {
    indicator_id: String,
    year: u16,
    education_level: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    subject: Option<String>,
    mean: f64,
    standard_deviation: f64,
    #[serde(default)]
    evaluations: u32,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|text| !text.trim().is_empty()))
}

/// National reference statistics keyed by indicator and cohort.
#[derive(Debug, Clone, Default)]
pub struct StatisticsTable {
    rows: HashMap<CohortKey, IndicatorStatistics>,
}

impl StatisticsTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Reads `indicator_id,year,education_level,subject,mean,standard_deviation,evaluations`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = HashMap::new();
        for record in csv_reader.deserialize::<StatisticsRow>() {
            let row = record?;
            let key = CohortKey::new(
                &row.indicator_id,
                row.year,
                &row.education_level,
                row.subject.as_deref().unwrap_or_default(),
            );
            rows.insert(
                key,
                IndicatorStatistics {
                    indicator_id: row.indicator_id,
                    mean: row.mean,
                    standard_deviation: row.standard_deviation,
                    evaluations: row.evaluations,
                },
            );
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl StatisticsProvider for StatisticsTable {
    /// Subject-specific rows win over rows without a subject.
    fn indicator_statistics(
        &self,
        indicator_id: &str,
        context: &RubricContext,
    ) -> Result<Option<IndicatorStatistics>, ProviderError> {
        let specific = CohortKey::new(
            indicator_id,
            context.year,
            &context.education_level,
            &context.subject,
        );
        let generalist = CohortKey::new(indicator_id, context.year, &context.education_level, "");

        Ok(self
            .rows
            .get(&specific)
            .or_else(|| self.rows.get(&generalist))
            .cloned())
    }
}
