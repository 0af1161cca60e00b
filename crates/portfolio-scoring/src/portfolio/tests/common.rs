use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::evaluation::tests::common::{rubric, verification};
use crate::evaluation::{
    ConditionVerification, EvaluationConfig, EvaluationStrategy, IndicatorEvaluation,
    IndicatorStatistics, ModuleScore, PortfolioScore,
};
use crate::import::{RubricCatalog, StatisticsTable, SubmissionArchive};
use crate::oracle::{
    ConditionOracle, ConditionRequest, JudgmentRequest, LevelJudgment, OracleError,
    PrioritizationRequest, RankedAction,
};
use crate::portfolio::{
    EvaluationSink, PortfolioEvaluationService, ProviderError, RecordId, SinkError,
    StatisticsProvider, Submission, SubmissionId, TaskSubmission, TeacherProfile,
};
use crate::rubric::{AchievementLevel, RubricContext};

pub(super) type TestService =
    PortfolioEvaluationService<RubricCatalog, SubmissionArchive, StatisticsTable, MemorySink>;

pub(super) fn profile() -> TeacherProfile {
    TeacherProfile {
        year: 2025,
        education_level: "media".to_string(),
        subject: "Historia".to_string(),
    }
}

/// Module 1 has two tasks; modules 2 and 3 are evaluated as a whole.
pub(super) fn catalog() -> RubricCatalog {
    RubricCatalog::from_rubrics(vec![
        rubric("M1T1-I1", 1, Some(1), true),
        rubric("M1T1-I2", 1, Some(1), true),
        rubric("M1T2-I1", 1, Some(2), true),
        rubric("M1T2-V1", 1, Some(2), false),
        rubric("M2-I1", 2, None, true),
        rubric("M2-I2", 2, None, true),
        rubric("M3-I1", 3, None, true),
        rubric("M3-V1", 3, None, false),
    ])
    .expect("fixture rubrics are valid")
}

pub(super) fn archive() -> SubmissionArchive {
    let submission = |id: &str, content: Value| Submission {
        id: SubmissionId(id.to_string()),
        version: 1,
        submitted_at: None,
        content,
    };
    SubmissionArchive::from_submissions(vec![
        submission("m1-t1", json!({ "planificacion": "Unidad de historia local" })),
        submission("m1-t2", json!({ "planificacion": "Evaluación formativa" })),
        submission("m2", json!({ "planificacion": "Clase grabada" })),
        submission("m3", json!({ "planificacion": "Trabajo colaborativo" })),
    ])
}

pub(super) fn statistics() -> StatisticsTable {
    let csv = "\
indicator_id,year,education_level,subject,mean,standard_deviation,evaluations
M1T1-I1,2025,media,,2.5,0.5,800
";
    StatisticsTable::from_reader(std::io::Cursor::new(csv)).expect("statistics parse")
}

pub(super) fn task(task: Option<u8>, id: &str) -> TaskSubmission {
    TaskSubmission {
        task,
        submission_id: SubmissionId(id.to_string()),
    }
}

pub(super) fn module_one() -> Vec<TaskSubmission> {
    vec![task(Some(1), "m1-t1"), task(Some(2), "m1-t2")]
}

pub(super) fn engine_config() -> EvaluationConfig {
    EvaluationConfig {
        strategy: EvaluationStrategy::PerLevel,
        worker_cap: 2,
        ..EvaluationConfig::default()
    }
}

pub(super) fn build_service(oracle: LevelOracle) -> (TestService, Arc<MemorySink>, Arc<LevelOracle>) {
    build_service_with(oracle, engine_config())
}

pub(super) fn build_service_with(
    oracle: LevelOracle,
    config: EvaluationConfig,
) -> (TestService, Arc<MemorySink>, Arc<LevelOracle>) {
    let sink = Arc::new(MemorySink::default());
    let oracle = Arc::new(oracle);
    let service = PortfolioEvaluationService::new(
        Arc::new(catalog()),
        Arc::new(archive()),
        Arc::new(statistics()),
        sink.clone(),
        oracle.clone(),
        config,
    );
    (service, sink, oracle)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Satisfies exactly the conditions of each indicator's target level.
#[derive(Default)]
pub(super) struct LevelOracle {
    targets: HashMap<String, AchievementLevel>,
    failures: HashMap<String, OracleError>,
    calls: Mutex<Vec<String>>,
}

impl LevelOracle {
    pub(super) fn targeting(targets: &[(&str, AchievementLevel)]) -> Self {
        Self {
            targets: targets
                .iter()
                .map(|(id, level)| (id.to_string(), *level))
                .collect(),
            ..Self::default()
        }
    }

    pub(super) fn failing(mut self, indicator_id: &str, error: OracleError) -> Self {
        self.failures.insert(indicator_id.to_string(), error);
        self
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(super) fn indicators_called(&self) -> Vec<String> {
        let mut indicators: Vec<String> = self
            .calls()
            .into_iter()
            .filter_map(|call| call.split_once(':').map(|(id, _)| id.to_string()))
            .collect();
        indicators.sort();
        indicators.dedup();
        indicators
    }
}

#[async_trait]
impl ConditionOracle for LevelOracle {
    async fn verify_condition(
        &self,
        request: &ConditionRequest,
    ) -> Result<ConditionVerification, OracleError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(format!("{}:{}", request.indicator_id, request.condition_id));

        if let Some(error) = self.failures.get(&request.indicator_id) {
            return Err(error.clone());
        }
        let target = self
            .targets
            .get(&request.indicator_id)
            .copied()
            .unwrap_or(AchievementLevel::Insatisfactorio);
        Ok(verification(&request.condition_id, request.level == target))
    }

    async fn judge_indicator(
        &self,
        _request: &JudgmentRequest,
    ) -> Result<LevelJudgment, OracleError> {
        Err(OracleError::malformed("judgments are not scripted"))
    }

    async fn prioritize(
        &self,
        _request: &PrioritizationRequest,
    ) -> Result<Vec<RankedAction>, OracleError> {
        Ok(Vec::new())
    }
}

/// Append-only sink numbering records in arrival order.
#[derive(Default)]
pub(super) struct MemorySink {
    next: AtomicU64,
    records: Mutex<Vec<(&'static str, String)>>,
}

impl MemorySink {
    fn push(&self, kind: &'static str, subject: String) -> RecordId {
        let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.records
            .lock()
            .expect("sink mutex poisoned")
            .push((kind, subject));
        RecordId(format!("rec-{id}"))
    }

    pub(super) fn count(&self, kind: &str) -> usize {
        self.records
            .lock()
            .expect("sink mutex poisoned")
            .iter()
            .filter(|(recorded, _)| *recorded == kind)
            .count()
    }

    pub(super) fn subjects(&self, kind: &str) -> Vec<String> {
        self.records
            .lock()
            .expect("sink mutex poisoned")
            .iter()
            .filter(|(recorded, _)| *recorded == kind)
            .map(|(_, subject)| subject.clone())
            .collect()
    }
}

impl EvaluationSink for MemorySink {
    fn record_indicator(&self, evaluation: &IndicatorEvaluation) -> Result<RecordId, SinkError> {
        Ok(self.push("indicator", evaluation.indicator_id.clone()))
    }

    fn record_module(&self, score: &ModuleScore) -> Result<RecordId, SinkError> {
        Ok(self.push("module", score.module.to_string()))
    }

    fn record_portfolio(&self, score: &PortfolioScore) -> Result<RecordId, SinkError> {
        Ok(self.push("portfolio", format!("{:.2}", score.final_score)))
    }
}

pub(super) struct UnavailableSink;

impl EvaluationSink for UnavailableSink {
    fn record_indicator(&self, _evaluation: &IndicatorEvaluation) -> Result<RecordId, SinkError> {
        Err(SinkError::Unavailable("store offline".to_string()))
    }

    fn record_module(&self, _score: &ModuleScore) -> Result<RecordId, SinkError> {
        Err(SinkError::Unavailable("store offline".to_string()))
    }

    fn record_portfolio(&self, _score: &PortfolioScore) -> Result<RecordId, SinkError> {
        Err(SinkError::Unavailable("store offline".to_string()))
    }
}

pub(super) struct UnavailableStatistics;

impl StatisticsProvider for UnavailableStatistics {
    fn indicator_statistics(
        &self,
        _indicator_id: &str,
        _context: &RubricContext,
    ) -> Result<Option<IndicatorStatistics>, ProviderError> {
        Err(ProviderError::Unavailable("statistics warehouse offline".to_string()))
    }
}
