use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{Submission, SubmissionId};
use crate::evaluation::{IndicatorEvaluation, IndicatorStatistics, ModuleScore, PortfolioScore};
use crate::rubric::{Rubric, RubricContext};

/// Source of the rubrics applicable to a year, level, subject and module.
pub trait RubricProvider: Send + Sync {
    /// Fails with [`ProviderError::NoRubricsFound`] when nothing matches.
    fn load_rubrics(&self, context: &RubricContext) -> Result<Vec<Rubric>, ProviderError>;
}

pub trait SubmissionProvider: Send + Sync {
    fn submission(&self, id: &SubmissionId) -> Result<Option<Submission>, ProviderError>;

    /// Dotted paths of the payload a rubric reviews.
    fn evidence_paths(&self, rubric: &Rubric) -> Vec<String> {
        rubric.evidence_to_review.clone()
    }
}

pub trait StatisticsProvider: Send + Sync {
    fn indicator_statistics(
        &self,
        indicator_id: &str,
        context: &RubricContext,
    ) -> Result<Option<IndicatorStatistics>, ProviderError>;
}

/// Append-only store for finished results. Each call creates a new record.
pub trait EvaluationSink: Send + Sync {
    fn record_indicator(&self, evaluation: &IndicatorEvaluation) -> Result<RecordId, SinkError>;
    fn record_module(&self, score: &ModuleScore) -> Result<RecordId, SinkError>;
    fn record_portfolio(&self, score: &PortfolioScore) -> Result<RecordId, SinkError>;
}

/// Identifier assigned by the sink to a stored result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("no rubrics found for {context}")]
    NoRubricsFound { context: RubricContext },
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SinkError {
    #[error("evaluation sink unavailable: {0}")]
    Unavailable(String),
}
