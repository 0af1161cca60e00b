use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::config::EvaluationConfig;
use super::determination::{condition_status, LevelDetermination};
use super::domain::{ConditionVerification, IndicatorEvaluation, Priority, Recommendation};
use super::evaluator::with_timeout;
use crate::oracle::{
    ConditionOracle, OracleError, PrioritizationItem, PrioritizationRequest, RankedAction,
};
use crate::rubric::{AchievementLevel, Rubric};

/// Score gain from `current` to the next level, zero at the top.
pub fn next_level_gain(level: AchievementLevel) -> f64 {
    level
        .next_higher()
        .map(|next| next.score() - level.score())
        .unwrap_or(0.0)
}

/// Snaps an oracle estimate to the closest gain reachable on the ladder,
/// after clamping it to `[0, 4.0 - current]`.
pub fn snap_points(current: f64, estimated: f64) -> f64 {
    let ceiling = (AchievementLevel::Destacado.score() - current).max(0.0);
    let clamped = if estimated.is_finite() {
        estimated.clamp(0.0, ceiling)
    } else {
        0.0
    };

    AchievementLevel::ordered()
        .into_iter()
        .map(AchievementLevel::score)
        .filter(|score| *score > current + f64::EPSILON)
        .map(|score| score - current)
        .min_by(|a, b| (a - clamped).abs().total_cmp(&(b - clamped).abs()))
        .unwrap_or(0.0)
}

/// Action notes for the conditions still open at the achieved level. At the
/// floor the Básico conditions are the ones to work on.
pub fn condition_notes(
    rubric: &Rubric,
    determination: &LevelDetermination,
    verifications: &[ConditionVerification],
    target_score: f64,
) -> Vec<Recommendation> {
    let current = determination.level;
    let focus = match current {
        AchievementLevel::Insatisfactorio => rubric.levels.level(AchievementLevel::Basico),
        other => rubric.levels.level(other),
    };
    let gain = next_level_gain(current);
    let priority = Priority::for_score(determination.score, target_score);
    let impact = match current.next_higher() {
        Some(next) => format!("+{gain:.1} puntos al alcanzar el nivel {next}"),
        None => "Mantiene el puntaje máximo".to_string(),
    };

    let notes: Vec<Recommendation> = focus
        .conditions
        .iter()
        .filter(|condition| !condition_status(focus.name, condition, verifications).is_satisfied())
        .map(|condition| {
            let missing = verifications
                .iter()
                .filter(|verification| verification.answers(focus.name, &condition.id))
                .find_map(|verification| verification.missing.clone());

            Recommendation {
                indicator_id: rubric.indicator_id.clone(),
                priority,
                action: missing.unwrap_or_else(|| condition.description.clone()),
                impact: impact.clone(),
                estimated_points: gain,
                estimated_hours: None,
                rationale: Some(format!("Condición {} del nivel {}", condition.id, focus.name)),
            }
        })
        .collect();

    if !notes.is_empty() {
        return notes;
    }

    vec![Recommendation {
        indicator_id: rubric.indicator_id.clone(),
        priority,
        action: format!(
            "Mantener las prácticas evidenciadas en {}",
            rubric.indicator_name
        ),
        impact,
        estimated_points: gain,
        estimated_hours: None,
        rationale: None,
    }]
}

fn compare(
    a: &Recommendation,
    b: &Recommendation,
    scores: &HashMap<&str, f64>,
    target_score: f64,
) -> Ordering {
    let below = |recommendation: &Recommendation| {
        scores
            .get(recommendation.indicator_id.as_str())
            .is_some_and(|score| *score < target_score)
    };

    below(b)
        .cmp(&below(a))
        .then_with(|| b.estimated_points.total_cmp(&a.estimated_points))
        .then_with(|| a.priority.cmp(&b.priority))
}

/// Orders below-target indicators first, then by points, then by priority.
pub fn rank(recommendations: &mut [Recommendation], evaluations: &[IndicatorEvaluation], target_score: f64) {
    let scores: HashMap<&str, f64> = evaluations
        .iter()
        .map(|evaluation| (evaluation.indicator_id.as_str(), evaluation.score))
        .collect();
    recommendations.sort_by(|a, b| compare(a, b, &scores, target_score));
}

/// Every indicator's own notes merged into one ranked list.
pub fn ranked_recommendations(
    evaluations: &[IndicatorEvaluation],
    target_score: f64,
) -> Vec<Recommendation> {
    let mut merged: Vec<Recommendation> = evaluations
        .iter()
        .flat_map(|evaluation| evaluation.recommendations.iter().cloned())
        .collect();
    rank(&mut merged, evaluations, target_score);
    merged
}

pub fn prioritization_request(
    evaluations: &[IndicatorEvaluation],
    target_score: f64,
) -> PrioritizationRequest {
    PrioritizationRequest {
        target_score,
        indicators: evaluations
            .iter()
            .map(|evaluation| PrioritizationItem {
                indicator_id: evaluation.indicator_id.clone(),
                indicator_name: evaluation.indicator_name.clone(),
                level: evaluation.level,
                score: evaluation.score,
                next_level_gap: evaluation.next_level_gap.clone(),
                pending: evaluation
                    .recommendations
                    .iter()
                    .map(|recommendation| recommendation.action.clone())
                    .collect(),
            })
            .collect(),
    }
}

/// Makes oracle-proposed actions consistent with the ladder.
pub fn reconcile(
    evaluations: &[IndicatorEvaluation],
    actions: Vec<RankedAction>,
    target_score: f64,
) -> Vec<Recommendation> {
    let known: HashMap<&str, &IndicatorEvaluation> = evaluations
        .iter()
        .map(|evaluation| (evaluation.indicator_id.as_str(), evaluation))
        .collect();

    let mut reconciled: Vec<Recommendation> = actions
        .into_iter()
        .filter_map(|action| {
            let Some(evaluation) = known.get(action.indicator_id.as_str()) else {
                tracing::warn!(
                    indicator_id = %action.indicator_id,
                    "dropping recommendation for unknown indicator"
                );
                return None;
            };

            let points = snap_points(evaluation.score, action.estimated_points);
            Some(Recommendation {
                indicator_id: action.indicator_id,
                priority: action.priority,
                action: action.action,
                impact: format!("+{points:.1} puntos"),
                estimated_points: points,
                estimated_hours: action.estimated_hours.filter(|hours| *hours >= 0.0),
                rationale: action.rationale,
            })
        })
        .collect();

    rank(&mut reconciled, evaluations, target_score);
    reconciled
}

/// Oracle-backed prioritization with ladder enforcement on the way back.
#[derive(Clone)]
pub struct RecommendationSynthesizer {
    oracle: Arc<dyn ConditionOracle>,
    target_score: f64,
    timeout: Duration,
}

impl RecommendationSynthesizer {
    pub fn new(oracle: Arc<dyn ConditionOracle>, config: &EvaluationConfig) -> Self {
        Self {
            oracle,
            target_score: config.target_score,
            timeout: config.oracle_timeout,
        }
    }

    pub fn target_score(&self) -> f64 {
        self.target_score
    }

    pub async fn prioritize(
        &self,
        evaluations: &[IndicatorEvaluation],
    ) -> Result<Vec<Recommendation>, OracleError> {
        let request = prioritization_request(evaluations, self.target_score);
        let actions = with_timeout(self.timeout, self.oracle.prioritize(&request)).await?;
        Ok(reconcile(evaluations, actions, self.target_score))
    }
}
