//! Rubric model: indicators, their four-tier level ladder, and the
//! conditions each tier requires.

mod domain;
mod validation;

pub use domain::{
    AchievementLevel, Condition, EvidenceCriteria, Level, LevelLadder, LogicOperator, Quantifier,
    Rubric, RubricContext,
};
pub use validation::RubricError;
