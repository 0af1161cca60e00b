//! Portfolio evaluation facade: provider seams, the evaluation service and
//! its HTTP router.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    evidence_excerpt, IndicatorRequest, ModuleRequest, ModuleSubmissions, PortfolioRequest,
    Submission, SubmissionId, TaskSubmission, TeacherProfile,
};
pub use repository::{
    EvaluationSink, ProviderError, RecordId, RubricProvider, SinkError, StatisticsProvider,
    SubmissionProvider,
};
pub use router::evaluation_router;
pub use service::{PortfolioEvaluationService, PortfolioServiceError};
