use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use super::domain::{IndicatorRequest, ModuleRequest, PortfolioRequest};
use super::repository::{EvaluationSink, RubricProvider, StatisticsProvider, SubmissionProvider};
use super::service::{PortfolioEvaluationService, PortfolioServiceError};
use crate::evaluation::EvaluationError;
use crate::oracle::OracleError;

/// Router builder exposing the indicator, module and portfolio evaluation endpoints.
pub fn evaluation_router<R, S, U, K>(
    service: Arc<PortfolioEvaluationService<R, S, U, K>>,
) -> Router
where
    R: RubricProvider + 'static,
    S: SubmissionProvider + 'static,
    U: StatisticsProvider + 'static,
    K: EvaluationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/evaluations/indicators",
            post(indicator_handler::<R, S, U, K>),
        )
        .route(
            "/api/v1/evaluations/modules",
            post(module_handler::<R, S, U, K>),
        )
        .route(
            "/api/v1/evaluations/portfolio",
            post(portfolio_handler::<R, S, U, K>),
        )
        .with_state(service)
}

pub(crate) fn status_for(error: &PortfolioServiceError) -> StatusCode {
    match error {
        PortfolioServiceError::NoRubricsFound { .. }
        | PortfolioServiceError::UnknownSubmission(_)
        | PortfolioServiceError::UnknownIndicator { .. } => StatusCode::NOT_FOUND,
        PortfolioServiceError::Evaluation(EvaluationError::Oracle { source, .. }) => match source {
            OracleError::Malformed { .. } => StatusCode::BAD_GATEWAY,
            OracleError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            OracleError::Rejected { .. } | OracleError::Configuration { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        PortfolioServiceError::Aggregation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PortfolioServiceError::Evaluation(EvaluationError::InvalidRubric { .. })
        | PortfolioServiceError::Provider(_)
        | PortfolioServiceError::Sink(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(error: PortfolioServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "kind": error.kind(),
        "disposition": error.disposition().label(),
    });
    (status_for(&error), axum::Json(payload)).into_response()
}

pub(crate) async fn indicator_handler<R, S, U, K>(
    State(service): State<Arc<PortfolioEvaluationService<R, S, U, K>>>,
    axum::Json(request): axum::Json<IndicatorRequest>,
) -> Response
where
    R: RubricProvider + 'static,
    S: SubmissionProvider + 'static,
    U: StatisticsProvider + 'static,
    K: EvaluationSink + 'static,
{
    match service.evaluate_indicator(&request).await {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn module_handler<R, S, U, K>(
    State(service): State<Arc<PortfolioEvaluationService<R, S, U, K>>>,
    axum::Json(request): axum::Json<ModuleRequest>,
) -> Response
where
    R: RubricProvider + 'static,
    S: SubmissionProvider + 'static,
    U: StatisticsProvider + 'static,
    K: EvaluationSink + 'static,
{
    match service.evaluate_module(&request).await {
        Ok(score) => (StatusCode::OK, axum::Json(score)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn portfolio_handler<R, S, U, K>(
    State(service): State<Arc<PortfolioEvaluationService<R, S, U, K>>>,
    axum::Json(request): axum::Json<PortfolioRequest>,
) -> Response
where
    R: RubricProvider + 'static,
    S: SubmissionProvider + 'static,
    U: StatisticsProvider + 'static,
    K: EvaluationSink + 'static,
{
    match service.evaluate_portfolio(&request).await {
        Ok(score) => (StatusCode::OK, axum::Json(score)).into_response(),
        Err(error) => error_response(error),
    }
}
