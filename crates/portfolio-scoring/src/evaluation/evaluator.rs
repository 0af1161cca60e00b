use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::config::{EvaluationConfig, EvaluationStrategy};
use super::determination::{condition_status, determine_level, level_satisfied, LevelDetermination};
use super::domain::{
    ConditionVerification, IndicatorEvaluation, IndicatorStatistics, LevelCorrection,
    Recommendation, SubmissionRef,
};
use super::recommendations::{condition_notes, next_level_gain, RecommendationSynthesizer};
use super::statistics::national_standing;
use crate::error::ErrorDisposition;
use crate::oracle::{
    ConditionOracle, ConditionRequest, JudgedAction, JudgmentRequest, OracleError,
};
use crate::rubric::{AchievementLevel, LevelLadder, Rubric, RubricError};

/// Runs an oracle call under the configured deadline.
pub(crate) async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, OracleError>
where
    F: Future<Output = Result<T, OracleError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::unavailable(format!(
            "no answer within {}s",
            timeout.as_secs_f64()
        ))),
    }
}

/// One indicator to evaluate against one submission version.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorInput<'a> {
    pub rubric: &'a Rubric,
    pub submission: &'a SubmissionRef,
    /// Excerpt built from the rubric's evidence paths.
    pub evidence: &'a str,
    pub statistics: Option<&'a IndicatorStatistics>,
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("indicator {indicator_id}: {source}")]
    Oracle {
        indicator_id: String,
        #[source]
        source: OracleError,
    },
    #[error("indicator {indicator_id} has an invalid rubric: {source}")]
    InvalidRubric {
        indicator_id: String,
        #[source]
        source: RubricError,
    },
}

impl EvaluationError {
    pub fn indicator_id(&self) -> &str {
        match self {
            Self::Oracle { indicator_id, .. } | Self::InvalidRubric { indicator_id, .. } => {
                indicator_id
            }
        }
    }

    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            Self::Oracle { source, .. } => source.disposition(),
            Self::InvalidRubric { .. } => ErrorDisposition::Alert,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Oracle { source, .. } => source.kind(),
            Self::InvalidRubric { .. } => "invalid_rubric",
        }
    }
}

/// What a strategy hands to the shared post-processing step.
struct Assessment {
    verifications: Vec<ConditionVerification>,
    determination: LevelDetermination,
    correction: Option<LevelCorrection>,
    reported: Option<ReportedJudgment>,
}

/// Narrative parts of a single-shot judgment, trusted only when uncorrected.
struct ReportedJudgment {
    justification: String,
    strengths: Vec<String>,
    actions: Vec<JudgedAction>,
}

/// Determines the achieved level of one indicator through the oracle.
#[derive(Clone)]
pub struct IndicatorEvaluator {
    oracle: Arc<dyn ConditionOracle>,
    config: EvaluationConfig,
    synthesizer: RecommendationSynthesizer,
}

impl IndicatorEvaluator {
    pub fn new(oracle: Arc<dyn ConditionOracle>, config: EvaluationConfig) -> Self {
        let synthesizer = RecommendationSynthesizer::new(oracle.clone(), &config);
        Self {
            oracle,
            config,
            synthesizer,
        }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn synthesizer(&self) -> &RecommendationSynthesizer {
        &self.synthesizer
    }

    pub async fn evaluate(
        &self,
        input: IndicatorInput<'_>,
    ) -> Result<IndicatorEvaluation, EvaluationError> {
        let rubric = input.rubric;
        rubric
            .validate()
            .map_err(|source| EvaluationError::InvalidRubric {
                indicator_id: rubric.indicator_id.clone(),
                source,
            })?;

        let assessment = match self.config.strategy {
            EvaluationStrategy::PerLevel => self.per_level(rubric, input.evidence).await,
            EvaluationStrategy::SingleShot => self.single_shot(rubric, input.evidence).await,
        }
        .map_err(|source| EvaluationError::Oracle {
            indicator_id: rubric.indicator_id.clone(),
            source,
        })?;

        let mut evaluation = self.assemble(input, assessment);

        if self.config.prioritize {
            match self
                .synthesizer
                .prioritize(std::slice::from_ref(&evaluation))
                .await
            {
                Ok(prioritized) if !prioritized.is_empty() => {
                    evaluation.recommendations = prioritized;
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(
                        indicator_id = %evaluation.indicator_id,
                        error = %error,
                        "prioritization failed, keeping rubric notes"
                    );
                }
            }
        }

        tracing::info!(
            indicator_id = %evaluation.indicator_id,
            level = %evaluation.level,
            score = evaluation.score,
            strategy = evaluation.strategy.label(),
            corrected = evaluation.correction_applied,
            "indicator evaluated"
        );

        Ok(evaluation)
    }

    /// Verifies level by level, top down, until one is satisfied.
    async fn per_level(&self, rubric: &Rubric, evidence: &str) -> Result<Assessment, OracleError> {
        let mut verifications = Vec::new();

        for level in rubric.levels.top_down() {
            for condition in &level.conditions {
                let request = ConditionRequest::new(rubric, level, condition, evidence);
                let verification = with_timeout(
                    self.config.oracle_timeout,
                    self.oracle.verify_condition(&request),
                )
                .await?;
                verifications.push(verification.for_level(level.name));
            }

            if level_satisfied(level, &verifications) {
                break;
            }
        }

        let determination = determine_level(&rubric.levels, &verifications);
        Ok(Assessment {
            verifications,
            determination,
            correction: None,
            reported: None,
        })
    }

    /// One judgment call, then the level is recomputed from its own verifications.
    async fn single_shot(
        &self,
        rubric: &Rubric,
        evidence: &str,
    ) -> Result<Assessment, OracleError> {
        let request = JudgmentRequest {
            rubric: rubric.clone(),
            evidence: evidence.to_string(),
        };
        let judgment =
            with_timeout(self.config.oracle_timeout, self.oracle.judge_indicator(&request)).await?;

        let verifications = attribute_levels(rubric, judgment.verifications);
        let determination = determine_level(&rubric.levels, &verifications);
        let correction = (determination.level != judgment.claimed_level).then(|| {
            tracing::warn!(
                indicator_id = %rubric.indicator_id,
                claimed = %judgment.claimed_level,
                recomputed = %determination.level,
                "inconsistent level logic, overriding reported level"
            );
            LevelCorrection {
                claimed: judgment.claimed_level,
                recomputed: determination.level,
                note: format!(
                    "El nivel declarado {} no es consistente con las condiciones verificadas; \
se asigna {} según la lógica de la rúbrica",
                    judgment.claimed_level, determination.level
                ),
            }
        });

        Ok(Assessment {
            verifications,
            determination,
            correction,
            reported: Some(ReportedJudgment {
                justification: judgment.justification,
                strengths: judgment.strengths,
                actions: judgment.recommendations,
            }),
        })
    }

    fn assemble(&self, input: IndicatorInput<'_>, assessment: Assessment) -> IndicatorEvaluation {
        let rubric = input.rubric;
        let Assessment {
            verifications,
            determination,
            correction,
            reported,
        } = assessment;
        let target = self.config.target_score;

        // Narrative from a corrected judgment describes the wrong level.
        let trusted = reported.filter(|_| correction.is_none());

        let mut justification = match &trusted {
            Some(reported) if !reported.justification.trim().is_empty() => {
                reported.justification.clone()
            }
            _ => justification(rubric, &determination, &verifications),
        };
        if let Some(correction) = &correction {
            justification = format!("{justification}\n{}", correction.note);
        }

        let strengths = match &trusted {
            Some(reported) if !reported.strengths.is_empty() => reported.strengths.clone(),
            _ => strengths(rubric, &verifications),
        };

        let recommendations = match &trusted {
            Some(reported) if !reported.actions.is_empty() => {
                judged_recommendations(rubric, determination.level, &reported.actions)
            }
            _ => condition_notes(rubric, &determination, &verifications, target),
        };

        let national = match input.statistics {
            Some(statistics) => Some(national_standing(determination.score, statistics)),
            None => {
                tracing::debug!(
                    indicator_id = %rubric.indicator_id,
                    "no national statistics for indicator"
                );
                None
            }
        };

        IndicatorEvaluation {
            indicator_id: rubric.indicator_id.clone(),
            indicator_name: rubric.indicator_name.clone(),
            module: rubric.module,
            task: rubric.task,
            mandatory: rubric.mandatory,
            submission: input.submission.clone(),
            strategy: self.config.strategy,
            level: determination.level,
            score: determination.score,
            confidence: confidence(&rubric.levels, determination.level, &verifications),
            satisfied_conditions: determination.satisfied.len(),
            total_conditions: determination.total,
            next_level_gap: next_level_gap(&rubric.levels, determination.level),
            verifications,
            justification,
            strengths,
            recommendations,
            correction_applied: correction.is_some(),
            correction,
            national,
            evaluated_at: Utc::now(),
        }
    }
}

/// Description of the level above `level`, empty at Destacado.
pub fn next_level_gap(ladder: &LevelLadder, level: AchievementLevel) -> String {
    match level.next_higher() {
        Some(next) => format!(
            "Para alcanzar nivel {next}: {}",
            ladder.level(next).description
        ),
        None => String::new(),
    }
}

fn justification(
    rubric: &Rubric,
    determination: &LevelDetermination,
    verifications: &[ConditionVerification],
) -> String {
    if determination.level == AchievementLevel::Insatisfactorio {
        return format!(
            "Nivel {}: {}",
            AchievementLevel::Insatisfactorio,
            rubric.levels.insatisfactorio.description
        );
    }

    let level = rubric.levels.level(determination.level);
    let met: Vec<String> = level
        .conditions
        .iter()
        .filter(|condition| condition_status(level.name, condition, verifications).is_satisfied())
        .map(|condition| format!("[{}] {}", condition.id, condition.description))
        .collect();

    format!(
        "Nivel {} ({}): cumple {} de {} condiciones. {}",
        level.name,
        level.operator.label(),
        determination.satisfied.len(),
        determination.total,
        met.join("; ")
    )
}

/// Tags single-shot answers that came back without a level. An id shared by
/// several levels cannot be attributed and is dropped.
fn attribute_levels(
    rubric: &Rubric,
    verifications: Vec<ConditionVerification>,
) -> Vec<ConditionVerification> {
    verifications
        .into_iter()
        .filter_map(|verification| {
            if verification.level.is_some() {
                return Some(verification);
            }
            let owners: Vec<AchievementLevel> = rubric
                .levels
                .top_down()
                .into_iter()
                .filter(|level| level.owns(&verification.condition_id))
                .map(|level| level.name)
                .collect();
            match owners.as_slice() {
                [] => Some(verification),
                [owner] => Some(verification.for_level(*owner)),
                _ => {
                    tracing::warn!(
                        indicator_id = %rubric.indicator_id,
                        condition_id = %verification.condition_id,
                        "answer names a condition id used by several levels without its level, ignoring it"
                    );
                    None
                }
            }
        })
        .collect()
}

fn strengths(rubric: &Rubric, verifications: &[ConditionVerification]) -> Vec<String> {
    let mut seen = HashSet::new();
    verifications
        .iter()
        .filter(|verification| verification.satisfied)
        .filter_map(|verification| {
            let level = match verification.level {
                Some(tag) => rubric.levels.level(tag),
                None => rubric.levels.level_of(&verification.condition_id)?,
            };
            let condition = level.condition(&verification.condition_id)?;
            if !seen.insert((level.name, condition.id.as_str())) {
                return None;
            }
            if verification.justification.trim().is_empty() {
                Some(condition.description.clone())
            } else {
                Some(verification.justification.clone())
            }
        })
        .collect()
}

/// Mean confidence over the achieved level's verifications.
fn confidence(
    ladder: &LevelLadder,
    level: AchievementLevel,
    verifications: &[ConditionVerification],
) -> Option<f64> {
    if level == AchievementLevel::Insatisfactorio {
        return None;
    }

    let achieved = ladder.level(level);
    let values: Vec<f64> = verifications
        .iter()
        .filter(|verification| {
            achieved.owns(&verification.condition_id)
                && verification.answers(level, &verification.condition_id)
        })
        .map(|verification| verification.confidence)
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn judged_recommendations(
    rubric: &Rubric,
    level: AchievementLevel,
    actions: &[JudgedAction],
) -> Vec<Recommendation> {
    let gain = next_level_gain(level);
    actions
        .iter()
        .map(|action| Recommendation {
            indicator_id: rubric.indicator_id.clone(),
            priority: action.priority,
            action: action.action.clone(),
            impact: action.impact.clone(),
            estimated_points: gain,
            estimated_hours: None,
            rationale: None,
        })
        .collect()
}
