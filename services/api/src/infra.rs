use metrics_exporter_prometheus::PrometheusHandle;
use portfolio_scoring::config::{AppConfig, DataSources, OracleConfig};
use portfolio_scoring::error::AppError;
use portfolio_scoring::evaluation::{IndicatorEvaluation, ModuleScore, PortfolioScore};
use portfolio_scoring::import::{RubricCatalog, StatisticsTable, SubmissionArchive};
use portfolio_scoring::oracle::{CachedOracle, ConditionOracle, HttpOracleClient, OracleCache};
use portfolio_scoring::portfolio::{
    EvaluationSink, PortfolioEvaluationService, RecordId, SinkError,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub(crate) type ApiService = PortfolioEvaluationService<
    RubricCatalog,
    SubmissionArchive,
    StatisticsTable,
    InMemoryEvaluationSink,
>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StoredRecord {
    pub(crate) id: RecordId,
    pub(crate) kind: &'static str,
    pub(crate) payload: Value,
}

/// Append-only result store living for the lifetime of the process.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEvaluationSink {
    records: Arc<Mutex<Vec<StoredRecord>>>,
}

impl InMemoryEvaluationSink {
    fn store<T: Serialize>(&self, kind: &'static str, value: &T) -> Result<RecordId, SinkError> {
        let payload =
            serde_json::to_value(value).map_err(|err| SinkError::Unavailable(err.to_string()))?;
        let mut guard = self
            .records
            .lock()
            .map_err(|_| SinkError::Unavailable("record store lock poisoned".to_string()))?;

        let id = RecordId(format!("{kind}-{:06}", guard.len() + 1));
        guard.push(StoredRecord {
            id: id.clone(),
            kind,
            payload,
        });
        Ok(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().expect("record mutex poisoned").clone()
    }
}

impl EvaluationSink for InMemoryEvaluationSink {
    fn record_indicator(&self, evaluation: &IndicatorEvaluation) -> Result<RecordId, SinkError> {
        self.store("indicator", evaluation)
    }

    fn record_module(&self, score: &ModuleScore) -> Result<RecordId, SinkError> {
        self.store("module", score)
    }

    fn record_portfolio(&self, score: &PortfolioScore) -> Result<RecordId, SinkError> {
        self.store("portfolio", score)
    }
}

/// Loads the configured files. A source without a path starts empty.
pub(crate) fn load_providers(
    data: &DataSources,
) -> Result<(RubricCatalog, SubmissionArchive, StatisticsTable), AppError> {
    let rubrics = match &data.rubrics {
        Some(path) => RubricCatalog::from_path(path)?,
        None => {
            warn!("RUBRICS_PATH is not set; every evaluation will report missing rubrics");
            RubricCatalog::default()
        }
    };
    let submissions = match &data.submissions {
        Some(path) => SubmissionArchive::from_path(path)?,
        None => SubmissionArchive::default(),
    };
    let statistics = match &data.statistics {
        Some(path) => StatisticsTable::from_path(path)?,
        None => StatisticsTable::default(),
    };

    info!(
        rubrics = rubrics.len(),
        submissions = submissions.len(),
        statistics = statistics.len(),
        "data sources loaded"
    );
    Ok((rubrics, submissions, statistics))
}

pub(crate) fn build_oracle(config: &OracleConfig) -> Result<Arc<dyn ConditionOracle>, AppError> {
    if config.api_key.is_none() {
        warn!("ORACLE_API_KEY is not set; the oracle endpoint may reject requests");
    }

    let client = HttpOracleClient::new(config)?;
    if config.cache_enabled {
        Ok(Arc::new(CachedOracle::new(
            client,
            Arc::new(OracleCache::with_capacity(config.cache_capacity)),
        )))
    } else {
        Ok(Arc::new(client))
    }
}

pub(crate) fn build_service(
    config: &AppConfig,
) -> Result<(Arc<ApiService>, InMemoryEvaluationSink), AppError> {
    let (rubrics, submissions, statistics) = load_providers(&config.data)?;
    let oracle = build_oracle(&config.oracle)?;
    let sink = InMemoryEvaluationSink::default();

    let service = PortfolioEvaluationService::new(
        Arc::new(rubrics),
        Arc::new(submissions),
        Arc::new(statistics),
        Arc::new(sink.clone()),
        oracle,
        config.evaluation.clone(),
    );
    Ok((Arc::new(service), sink))
}
