use std::sync::Arc;

use futures::stream::{self, StreamExt};

use super::domain::{
    evidence_excerpt, IndicatorRequest, ModuleRequest, PortfolioRequest, Submission, SubmissionId,
};
use super::repository::{
    EvaluationSink, ProviderError, RubricProvider, SinkError, StatisticsProvider,
    SubmissionProvider,
};
use crate::error::ErrorDisposition;
use crate::evaluation::aggregate::{aggregate_module, aggregate_portfolio, check_module_set};
use crate::evaluation::recommendations::ranked_recommendations;
use crate::evaluation::{
    AggregationError, EvaluationConfig, EvaluationError, IndicatorEvaluation, IndicatorEvaluator,
    IndicatorInput, ModuleScore, PortfolioScore, Recommendation,
};
use crate::oracle::ConditionOracle;
use crate::rubric::{Rubric, RubricContext};

/// Service composing rubric, submission and statistics providers with the
/// indicator evaluator and the evaluation sink.
pub struct PortfolioEvaluationService<R, S, U, K> {
    rubrics: Arc<R>,
    submissions: Arc<S>,
    statistics: Arc<U>,
    sink: Arc<K>,
    evaluator: Arc<IndicatorEvaluator>,
}

/// One indicator scheduled within a module run.
struct IndicatorJob {
    rubric: Rubric,
    submission: Arc<Submission>,
    context: RubricContext,
}

impl<R, S, U, K> PortfolioEvaluationService<R, S, U, K>
where
    R: RubricProvider + 'static,
    S: SubmissionProvider + 'static,
    U: StatisticsProvider + 'static,
    K: EvaluationSink + 'static,
{
    pub fn new(
        rubrics: Arc<R>,
        submissions: Arc<S>,
        statistics: Arc<U>,
        sink: Arc<K>,
        oracle: Arc<dyn ConditionOracle>,
        config: EvaluationConfig,
    ) -> Self {
        Self {
            rubrics,
            submissions,
            statistics,
            sink,
            evaluator: Arc::new(IndicatorEvaluator::new(oracle, config)),
        }
    }

    pub fn config(&self) -> &EvaluationConfig {
        self.evaluator.config()
    }

    fn load_rubrics(&self, context: &RubricContext) -> Result<Vec<Rubric>, PortfolioServiceError> {
        let rubrics = self.rubrics.load_rubrics(context)?;
        if rubrics.is_empty() {
            return Err(PortfolioServiceError::NoRubricsFound {
                context: context.clone(),
            });
        }
        Ok(rubrics)
    }

    fn fetch_submission(&self, id: &SubmissionId) -> Result<Submission, PortfolioServiceError> {
        self.submissions
            .submission(id)?
            .ok_or_else(|| PortfolioServiceError::UnknownSubmission(id.clone()))
    }

    async fn evaluate_job(
        &self,
        job: &IndicatorJob,
    ) -> Result<IndicatorEvaluation, PortfolioServiceError> {
        let rubric = &job.rubric;
        let paths = self.submissions.evidence_paths(rubric);
        let evidence = evidence_excerpt(&job.submission.content, &paths);

        let statistics = match self
            .statistics
            .indicator_statistics(&rubric.indicator_id, &job.context)
        {
            Ok(statistics) => statistics,
            Err(error) => {
                tracing::warn!(
                    indicator_id = %rubric.indicator_id,
                    error = %error,
                    "statistics lookup failed, continuing without national standing"
                );
                None
            }
        };

        let reference = job.submission.reference();
        let evaluation = self
            .evaluator
            .evaluate(IndicatorInput {
                rubric,
                submission: &reference,
                evidence: &evidence,
                statistics: statistics.as_ref(),
            })
            .await?;
        Ok(evaluation)
    }

    /// Evaluate one indicator of one submission and persist the result.
    pub async fn evaluate_indicator(
        &self,
        request: &IndicatorRequest,
    ) -> Result<IndicatorEvaluation, PortfolioServiceError> {
        let rubric = self
            .load_rubrics(&request.context)?
            .into_iter()
            .find(|rubric| rubric.indicator_id == request.indicator_id)
            .ok_or_else(|| PortfolioServiceError::UnknownIndicator {
                indicator_id: request.indicator_id.clone(),
                context: request.context.clone(),
            })?;
        let submission = self.fetch_submission(&request.submission_id)?;

        let job = IndicatorJob {
            rubric,
            submission: Arc::new(submission),
            context: request.context.clone(),
        };
        let evaluation = self.evaluate_job(&job).await?;
        self.sink.record_indicator(&evaluation)?;
        Ok(evaluation)
    }

    fn module_jobs(&self, request: &ModuleRequest) -> Result<Vec<IndicatorJob>, PortfolioServiceError> {
        let mut jobs = Vec::new();
        for task in &request.submissions {
            let context = request.profile.context(request.module, task.task);
            let rubrics = self.load_rubrics(&context)?;
            let submission = Arc::new(self.fetch_submission(&task.submission_id)?);

            for rubric in rubrics {
                if !rubric.mandatory && !request.include_voluntary {
                    continue;
                }
                jobs.push(IndicatorJob {
                    rubric,
                    submission: submission.clone(),
                    context: context.clone(),
                });
            }
        }
        Ok(jobs)
    }

    /// Evaluate every indicator of a module concurrently, then aggregate once
    /// all of them have finished.
    pub async fn evaluate_module(
        &self,
        request: &ModuleRequest,
    ) -> Result<ModuleScore, PortfolioServiceError> {
        check_module(request.module)?;
        let jobs = self.module_jobs(request)?;

        let worker_cap = self.config().worker_cap.max(1);
        let pending: Vec<_> = jobs.iter().map(|job| self.evaluate_job(job)).collect();
        let results: Vec<Result<IndicatorEvaluation, PortfolioServiceError>> =
            stream::iter(pending).buffer_unordered(worker_cap).collect().await;

        let mut evaluations = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(evaluation) => {
                    self.sink.record_indicator(&evaluation)?;
                    evaluations.push(evaluation);
                }
                Err(error) => {
                    tracing::warn!(module = request.module, error = %error, "indicator evaluation failed");
                    first_error.get_or_insert(error);
                }
            }
        }
        if let Some(error) = first_error {
            return Err(error);
        }

        evaluations.sort_by(|a, b| {
            a.task
                .cmp(&b.task)
                .then_with(|| a.indicator_id.cmp(&b.indicator_id))
        });

        let score = aggregate_module(request.module, evaluations)?;
        let recommendations = self.module_recommendations(&score.evaluations).await;
        let score = score.with_recommendations(recommendations);

        self.sink.record_module(&score)?;
        Ok(score)
    }

    async fn module_recommendations(&self, evaluations: &[IndicatorEvaluation]) -> Vec<Recommendation> {
        let target = self.config().target_score;
        if self.config().prioritize {
            match self.evaluator.synthesizer().prioritize(evaluations).await {
                Ok(prioritized) if !prioritized.is_empty() => return prioritized,
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(error = %error, "module prioritization failed, ranking rubric notes");
                }
            }
        }
        ranked_recommendations(evaluations, target)
    }

    /// Evaluate modules 1 to 3 and combine them into the weighted portfolio score.
    pub async fn evaluate_portfolio(
        &self,
        request: &PortfolioRequest,
    ) -> Result<PortfolioScore, PortfolioServiceError> {
        check_module_set(request.modules.iter().map(|module| module.module))?;

        let mut modules = Vec::with_capacity(request.modules.len());
        for module_request in request.module_requests() {
            modules.push(self.evaluate_module(&module_request).await?);
        }

        let score = aggregate_portfolio(modules)?;
        self.sink.record_portfolio(&score)?;
        Ok(score)
    }
}

fn check_module(module: u8) -> Result<(), AggregationError> {
    match module {
        1..=3 => Ok(()),
        other => Err(AggregationError::UnknownModule(other)),
    }
}

/// Error raised by the portfolio evaluation service.
#[derive(Debug, thiserror::Error)]
pub enum PortfolioServiceError {
    #[error("no rubrics found for {context}")]
    NoRubricsFound { context: RubricContext },
    #[error("submission {0} not found")]
    UnknownSubmission(SubmissionId),
    #[error("indicator {indicator_id} has no rubric for {context}")]
    UnknownIndicator {
        indicator_id: String,
        context: RubricContext,
    },
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error(transparent)]
    Provider(ProviderError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl From<ProviderError> for PortfolioServiceError {
    fn from(value: ProviderError) -> Self {
        match value {
            ProviderError::NoRubricsFound { context } => Self::NoRubricsFound { context },
            other => Self::Provider(other),
        }
    }
}

impl PortfolioServiceError {
    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            Self::NoRubricsFound { .. }
            | Self::UnknownSubmission(_)
            | Self::UnknownIndicator { .. } => ErrorDisposition::Resubmit,
            Self::Evaluation(error) => error.disposition(),
            Self::Aggregation(error) => error.disposition(),
            Self::Provider(_) | Self::Sink(_) => ErrorDisposition::Retry,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoRubricsFound { .. } => "no_rubrics_found",
            Self::UnknownSubmission(_) => "unknown_submission",
            Self::UnknownIndicator { .. } => "unknown_indicator",
            Self::Evaluation(error) => error.kind(),
            Self::Aggregation(_) => "aggregation",
            Self::Provider(_) => "provider_unavailable",
            Self::Sink(_) => "sink_unavailable",
        }
    }
}
