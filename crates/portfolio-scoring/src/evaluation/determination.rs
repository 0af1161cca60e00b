use super::domain::ConditionVerification;
use crate::rubric::{AchievementLevel, Condition, Level, LevelLadder, LogicOperator};

/// Outcome of matching one condition against the available verifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    Satisfied,
    Unsatisfied,
    /// Verified more than once with disagreeing answers.
    Conflicting,
    Unverified,
}

impl ConditionStatus {
    pub fn is_satisfied(self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// Result of the top-down level search.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDetermination {
    pub level: AchievementLevel,
    pub score: f64,
    /// Satisfied condition ids of the achieved level, in rubric order.
    pub satisfied: Vec<String>,
    /// Condition count of the achieved level; zero at the floor.
    pub total: usize,
}

/// Condition ids are only unique within a level, so answers tagged for
/// another level never count here.
pub fn condition_status(
    level: AchievementLevel,
    condition: &Condition,
    verifications: &[ConditionVerification],
) -> ConditionStatus {
    let mut answers = verifications
        .iter()
        .filter(|verification| verification.answers(level, &condition.id))
        .map(|verification| verification.satisfied);

    let Some(first) = answers.next() else {
        return ConditionStatus::Unverified;
    };

    if answers.any(|answer| answer != first) {
        ConditionStatus::Conflicting
    } else if first {
        ConditionStatus::Satisfied
    } else {
        ConditionStatus::Unsatisfied
    }
}

/// Applies the level's operator. Verifications for other levels are ignored
/// and a level without conditions is never satisfied.
pub fn level_satisfied(level: &Level, verifications: &[ConditionVerification]) -> bool {
    if level.conditions.is_empty() {
        return false;
    }

    let mut statuses = level
        .conditions
        .iter()
        .map(|condition| condition_status(level.name, condition, verifications));

    match level.operator {
        LogicOperator::And => statuses.all(ConditionStatus::is_satisfied),
        LogicOperator::Or => statuses.any(ConditionStatus::is_satisfied),
    }
}

/// Walks Destacado, Competente and Básico in order and returns the first
/// satisfied level, falling back to Insatisfactorio.
pub fn determine_level(
    ladder: &LevelLadder,
    verifications: &[ConditionVerification],
) -> LevelDetermination {
    for level in ladder.top_down() {
        if level_satisfied(level, verifications) {
            let satisfied = level
                .conditions
                .iter()
                .filter(|condition| {
                    condition_status(level.name, condition, verifications).is_satisfied()
                })
                .map(|condition| condition.id.clone())
                .collect();

            return LevelDetermination {
                level: level.name,
                score: level.name.score(),
                satisfied,
                total: level.conditions.len(),
            };
        }
    }

    LevelDetermination {
        level: AchievementLevel::Insatisfactorio,
        score: AchievementLevel::Insatisfactorio.score(),
        satisfied: Vec::new(),
        total: 0,
    }
}
