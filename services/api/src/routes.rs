use crate::infra::{ApiService, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use portfolio_scoring::portfolio::evaluation_router;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_evaluation_routes(service: Arc<ApiService>) -> axum::Router {
    evaluation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryEvaluationSink;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use portfolio_scoring::evaluation::EvaluationConfig;
    use portfolio_scoring::import::{RubricCatalog, StatisticsTable, SubmissionArchive};
    use portfolio_scoring::oracle::{CachedOracle, HttpOracleClient, OracleCache};
    use portfolio_scoring::portfolio::PortfolioEvaluationService;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(ready: bool) -> (axum::Router, InMemoryEvaluationSink) {
        let oracle = HttpOracleClient::new(&portfolio_scoring::config::OracleConfig {
            base_url: "http://127.0.0.1:9/v1".to_string(),
            api_key: None,
            model: "gpt-test".to_string(),
            timeout: Duration::from_millis(200),
            temperature: 0.0,
            max_tokens: 100,
            cache_enabled: true,
            cache_capacity: 8,
        })
        .expect("client builds");
        let sink = InMemoryEvaluationSink::default();
        let service = Arc::new(PortfolioEvaluationService::new(
            Arc::new(RubricCatalog::default()),
            Arc::new(SubmissionArchive::default()),
            Arc::new(StatisticsTable::default()),
            Arc::new(sink.clone()),
            Arc::new(CachedOracle::new(oracle, Arc::new(OracleCache::new()))),
            EvaluationConfig::default(),
        ));

        let recorder = PrometheusBuilder::new().build_recorder();
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        };
        (with_evaluation_routes(service).layer(Extension(state)), sink)
    }

    async fn send(router: axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.expect("route executes");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .expect("read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let (router, _) = app(false);
        let (status, body) = send(
            router,
            Request::get("/ready").body(Body::empty()).expect("request builds"),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        let (router, _) = app(true);
        let (status, body) = send(
            router,
            Request::get("/ready").body(Body::empty()).expect("request builds"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn empty_catalog_reports_missing_rubrics_without_storing() {
        let (router, sink) = app(true);
        let payload = json!({
            "profile": { "year": 2025, "education_level": "media", "subject": "Historia" },
            "module": 2,
            "submissions": [{ "task": null, "submission_id": "s-1" }]
        });
        let (status, body) = send(
            router,
            Request::post("/api/v1/evaluations/modules")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
        assert_eq!(sink.len(), 0);
    }
}
