//! File-backed providers: a JSON rubric catalog, a CSV table of national
//! statistics and a JSON submission archive.

mod rubrics;
mod statistics;
mod submissions;

pub use rubrics::RubricCatalog;
pub use statistics::StatisticsTable;
pub use submissions::SubmissionArchive;

use crate::rubric::RubricError;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Rubric {
        indicator_id: String,
        source: RubricError,
    },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read import file: {}", err),
            ImportError::Csv(err) => write!(f, "invalid statistics CSV data: {}", err),
            ImportError::Json(err) => write!(f, "invalid JSON data: {}", err),
            ImportError::Rubric {
                indicator_id,
                source,
            } => write!(f, "rubric {} is invalid: {}", indicator_id, source),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::Json(err) => Some(err),
            ImportError::Rubric { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}
