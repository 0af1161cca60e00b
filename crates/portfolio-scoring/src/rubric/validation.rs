use std::collections::HashSet;

use super::domain::{AchievementLevel, Rubric};

/// Structural defects that make a rubric unusable for level determination.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RubricError {
    #[error("level slot {slot} holds a {found} level")]
    MisplacedLevel {
        slot: AchievementLevel,
        found: AchievementLevel,
    },
    #[error("level {level} scores {found}, expected {expected}")]
    UnexpectedScore {
        level: AchievementLevel,
        expected: f64,
        found: f64,
    },
    #[error("Insatisfactorio is the default floor and cannot declare conditions")]
    FloorHasConditions,
    #[error("level {0} declares no conditions")]
    EmptyLevel(AchievementLevel),
    #[error("condition id {condition_id} is repeated within level {level}")]
    DuplicateCondition {
        level: AchievementLevel,
        condition_id: String,
    },
}

impl Rubric {
    /// Checks the ladder invariants: each slot holds its own tier with the
    /// canonical score (hence strictly descending), the floor has no
    /// conditions, and condition ids are unique within a level.
    pub fn validate(&self) -> Result<(), RubricError> {
        for (slot, level) in self.levels.slots() {
            if level.name != slot {
                return Err(RubricError::MisplacedLevel {
                    slot,
                    found: level.name,
                });
            }

            if (level.score - slot.score()).abs() > f64::EPSILON {
                return Err(RubricError::UnexpectedScore {
                    level: slot,
                    expected: slot.score(),
                    found: level.score,
                });
            }

            if slot == AchievementLevel::Insatisfactorio {
                if !level.conditions.is_empty() {
                    return Err(RubricError::FloorHasConditions);
                }
                continue;
            }

            if level.conditions.is_empty() {
                return Err(RubricError::EmptyLevel(slot));
            }

            let mut seen = HashSet::new();
            for condition in &level.conditions {
                if !seen.insert(condition.id.as_str()) {
                    return Err(RubricError::DuplicateCondition {
                        level: slot,
                        condition_id: condition.id.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
