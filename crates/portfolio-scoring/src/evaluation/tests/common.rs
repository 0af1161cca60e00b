use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::evaluation::{
    ConditionVerification, EvaluationConfig, EvaluationStrategy, IndicatorEvaluation,
    Recommendation, SubmissionRef,
};
use crate::evaluation::recommendations::next_level_gain;
use crate::evaluation::Priority;
use crate::oracle::{
    ConditionOracle, ConditionRequest, JudgmentRequest, LevelJudgment, OracleError,
    PrioritizationRequest, RankedAction,
};
use crate::portfolio::SubmissionId;
use crate::rubric::{
    AchievementLevel, Condition, EvidenceCriteria, Level, LevelLadder, LogicOperator, Rubric,
};

pub(crate) const DESTACADO: [&str; 3] = ["D_1", "D_2", "D_3"];
pub(crate) const COMPETENTE: [&str; 2] = ["C_1", "C_2"];
pub(crate) const BASICO: [&str; 2] = ["B_1", "B_2"];

pub(crate) fn condition(id: &str) -> Condition {
    Condition {
        id: id.to_string(),
        description: format!("Evidencia la condición {id}"),
        criteria: EvidenceCriteria::default(),
        quantifier: None,
    }
}

pub(crate) fn level(name: AchievementLevel, operator: LogicOperator, ids: &[&str]) -> Level {
    Level {
        name,
        score: name.score(),
        operator,
        conditions: ids.iter().map(|id| condition(id)).collect(),
        description: format!("Descripción del nivel {name}"),
        notes: None,
    }
}

/// Destacado AND {D_1, D_2, D_3}, Competente OR {C_1, C_2}, Básico OR {B_1, B_2}.
pub(crate) fn ladder() -> LevelLadder {
    LevelLadder {
        destacado: level(AchievementLevel::Destacado, LogicOperator::And, &DESTACADO),
        competente: level(AchievementLevel::Competente, LogicOperator::Or, &COMPETENTE),
        basico: level(AchievementLevel::Basico, LogicOperator::Or, &BASICO),
        insatisfactorio: level(AchievementLevel::Insatisfactorio, LogicOperator::And, &[]),
    }
}

pub(crate) fn rubric(indicator_id: &str, module: u8, task: Option<u8>, mandatory: bool) -> Rubric {
    Rubric {
        indicator_id: indicator_id.to_string(),
        indicator_name: format!("Indicador {indicator_id}"),
        description: "Planifica experiencias de aprendizaje coherentes".to_string(),
        year: 2025,
        education_level: "media".to_string(),
        subject: None,
        module,
        task,
        mandatory,
        evidence_to_review: vec!["planificacion".to_string()],
        weight_percentage: 10.0,
        clarifying_notes: Vec::new(),
        levels: ladder(),
    }
}

/// Every level uses the same id, the way extracted rubrics number conditions.
pub(crate) fn shared_id_rubric(indicator_id: &str) -> Rubric {
    let mut rubric = rubric(indicator_id, 1, Some(1), true);
    rubric.levels = LevelLadder {
        destacado: level(AchievementLevel::Destacado, LogicOperator::And, &["condicion_1"]),
        competente: level(AchievementLevel::Competente, LogicOperator::Or, &["condicion_1"]),
        basico: level(AchievementLevel::Basico, LogicOperator::Or, &["condicion_1"]),
        insatisfactorio: level(AchievementLevel::Insatisfactorio, LogicOperator::And, &[]),
    };
    rubric
}

pub(crate) fn verification(id: &str, satisfied: bool) -> ConditionVerification {
    ConditionVerification {
        condition_id: id.to_string(),
        level: None,
        satisfied,
        confidence: 0.8,
        evidence: vec![format!("\"cita para {id}\"")],
        justification: format!("razón para {id}"),
        missing: (!satisfied).then(|| format!("Falta evidencia de {id}")),
    }
}

pub(crate) fn submission_ref() -> SubmissionRef {
    SubmissionRef {
        id: SubmissionId("sub-001".to_string()),
        version: 1,
    }
}

pub(crate) fn config(strategy: EvaluationStrategy) -> EvaluationConfig {
    EvaluationConfig {
        strategy,
        oracle_timeout: Duration::from_secs(5),
        ..EvaluationConfig::default()
    }
}

/// Minimal finished evaluation for aggregation tests.
pub(crate) fn evaluation(
    indicator_id: &str,
    module: u8,
    level: AchievementLevel,
    mandatory: bool,
) -> IndicatorEvaluation {
    IndicatorEvaluation {
        indicator_id: indicator_id.to_string(),
        indicator_name: format!("Indicador {indicator_id}"),
        module,
        task: Some(1),
        mandatory,
        submission: submission_ref(),
        strategy: EvaluationStrategy::PerLevel,
        level,
        score: level.score(),
        verifications: Vec::new(),
        satisfied_conditions: 0,
        total_conditions: 0,
        confidence: None,
        justification: String::new(),
        next_level_gap: String::new(),
        strengths: Vec::new(),
        recommendations: vec![Recommendation {
            indicator_id: indicator_id.to_string(),
            priority: Priority::for_score(level.score(), 3.5),
            action: format!("Mejorar {indicator_id}"),
            impact: String::new(),
            estimated_points: next_level_gain(level),
            estimated_hours: None,
            rationale: None,
        }],
        correction_applied: false,
        correction: None,
        national: None,
        evaluated_at: Utc::now(),
    }
}

pub(crate) fn judgment(
    claimed: AchievementLevel,
    verifications: Vec<ConditionVerification>,
) -> LevelJudgment {
    LevelJudgment {
        claimed_level: claimed,
        claimed_score: Some(claimed.score()),
        verifications,
        justification: "Justificación del evaluador".to_string(),
        next_level_gap: String::new(),
        strengths: vec!["Fortaleza reportada".to_string()],
        recommendations: Vec::new(),
        highlighted_evidence: Vec::new(),
    }
}

/// Deterministic oracle double answering from a fixed table.
#[derive(Default)]
pub(crate) struct ScriptedOracle {
    answers: HashMap<String, bool>,
    level_answers: HashMap<(AchievementLevel, String), bool>,
    judgment: Option<LevelJudgment>,
    ranking: Option<Result<Vec<RankedAction>, OracleError>>,
    failures: HashMap<String, OracleError>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedOracle {
    pub(crate) fn answering(answers: &[(&str, bool)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(id, satisfied)| (id.to_string(), *satisfied))
                .collect(),
            ..Self::default()
        }
    }

    /// Answer for a condition id only when asked about it at `level`.
    pub(crate) fn answering_at(
        mut self,
        level: AchievementLevel,
        condition_id: &str,
        satisfied: bool,
    ) -> Self {
        self.level_answers
            .insert((level, condition_id.to_string()), satisfied);
        self
    }

    pub(crate) fn with_judgment(mut self, judgment: LevelJudgment) -> Self {
        self.judgment = Some(judgment);
        self
    }

    pub(crate) fn with_ranking(mut self, ranking: Result<Vec<RankedAction>, OracleError>) -> Self {
        self.ranking = Some(ranking);
        self
    }

    pub(crate) fn failing_on(mut self, condition_id: &str, error: OracleError) -> Self {
        self.failures.insert(condition_id.to_string(), error);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, call: String) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConditionOracle for ScriptedOracle {
    fn identity(&self) -> &str {
        "scripted"
    }

    async fn verify_condition(
        &self,
        request: &ConditionRequest,
    ) -> Result<ConditionVerification, OracleError> {
        self.enter(format!("{}:{}", request.indicator_id, request.condition_id))
            .await;
        self.leave();

        if let Some(error) = self.failures.get(&request.condition_id) {
            return Err(error.clone());
        }
        let satisfied = self
            .level_answers
            .get(&(request.level, request.condition_id.clone()))
            .or_else(|| self.answers.get(&request.condition_id))
            .copied()
            .unwrap_or(false);
        Ok(verification(&request.condition_id, satisfied))
    }

    async fn judge_indicator(
        &self,
        request: &JudgmentRequest,
    ) -> Result<LevelJudgment, OracleError> {
        self.enter(format!("judge:{}", request.rubric.indicator_id))
            .await;
        self.leave();

        self.judgment
            .clone()
            .ok_or_else(|| OracleError::malformed("no judgment scripted"))
    }

    async fn prioritize(
        &self,
        request: &PrioritizationRequest,
    ) -> Result<Vec<RankedAction>, OracleError> {
        self.enter(format!("prioritize:{}", request.indicators.len()))
            .await;
        self.leave();

        self.ranking.clone().unwrap_or_else(|| Ok(Vec::new()))
    }
}
