use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::EvaluationStrategy;
use crate::portfolio::SubmissionId;
use crate::rubric::AchievementLevel;

/// Oracle answer for a single condition. Never mutated once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionVerification {
    pub condition_id: String,
    /// Level the condition was checked for. Untagged answers match by id alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<AchievementLevel>,
    pub satisfied: bool,
    /// Oracle confidence in `[0, 1]`.
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub justification: String,
    /// What the submission lacks when the condition is not met.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<String>,
}

impl ConditionVerification {
    /// Whether this answer is about `condition_id` as it appears in `level`.
    pub fn answers(&self, level: AchievementLevel, condition_id: &str) -> bool {
        self.condition_id == condition_id && self.level.map_or(true, |tag| tag == level)
    }

    pub fn for_level(self, level: AchievementLevel) -> Self {
        Self {
            level: Some(level),
            ..self
        }
    }
}

/// How urgent an improvement action is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Alta,
    Media,
    Baja,
}

impl Priority {
    /// `Alta` when more than a full level below target, `Media` when below it.
    pub fn for_score(score: f64, target: f64) -> Self {
        if score < target - 1.0 {
            Self::Alta
        } else if score < target {
            Self::Media
        } else {
            Self::Baja
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "alta" | "high" => Some(Self::Alta),
            "media" | "medium" => Some(Self::Media),
            "baja" | "low" => Some(Self::Baja),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Alta => "alta",
            Self::Media => "media",
            Self::Baja => "baja",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Improvement action for one indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub indicator_id: String,
    pub priority: Priority,
    pub action: String,
    pub impact: String,
    /// Score gain achievable on the ladder; always a difference of level scores.
    pub estimated_points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Record of a self-reported level overridden by the recomputed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCorrection {
    pub claimed: AchievementLevel,
    pub recomputed: AchievementLevel,
    pub note: String,
}

/// National reference values for one indicator and cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorStatistics {
    pub indicator_id: String,
    pub mean: f64,
    pub standard_deviation: f64,
    #[serde(default)]
    pub evaluations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalStanding {
    pub national_mean: f64,
    pub standard_deviation: f64,
    /// Integer percentile in `[0, 100]`.
    pub percentile: u8,
}

/// Identifies the exact submission version an evaluation was made from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionRef {
    pub id: SubmissionId,
    pub version: u32,
}

/// Final, logic-consistent result for one indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorEvaluation {
    pub indicator_id: String,
    pub indicator_name: String,
    pub module: u8,
    pub task: Option<u8>,
    pub mandatory: bool,
    pub submission: SubmissionRef,
    pub strategy: EvaluationStrategy,
    pub level: AchievementLevel,
    pub score: f64,
    pub verifications: Vec<ConditionVerification>,
    pub satisfied_conditions: usize,
    pub total_conditions: usize,
    pub confidence: Option<f64>,
    pub justification: String,
    pub next_level_gap: String,
    pub strengths: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    pub correction_applied: bool,
    pub correction: Option<LevelCorrection>,
    pub national: Option<NationalStanding>,
    pub evaluated_at: DateTime<Utc>,
}

/// Whether voluntary indicators changed a module's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VoluntaryOutcome {
    NotEvaluated,
    Included { gain: f64 },
    Excluded,
}

/// Portfolio category bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AchievementCategory {
    A,
    B,
    C,
    D,
    E,
}

impl AchievementCategory {
    pub fn from_score(score: f64) -> Self {
        if score >= 3.5 {
            Self::A
        } else if score >= 3.0 {
            Self::B
        } else if score >= 2.5 {
            Self::C
        } else if score >= 2.0 {
            Self::D
        } else {
            Self::E
        }
    }
}

/// Career-ladder tranche a portfolio score projects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareerBand {
    Experto,
    Avanzado,
    Competente,
    Inicial,
}

impl CareerBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 3.5 {
            Self::Experto
        } else if score >= 3.0 {
            Self::Avanzado
        } else if score >= 2.5 {
            Self::Competente
        } else {
            Self::Inicial
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Experto => "Experto I o II",
            Self::Avanzado => "Avanzado",
            Self::Competente => "Competente",
            Self::Inicial => "Inicial o en desarrollo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleScore {
    pub module: u8,
    pub mandatory_mean: f64,
    pub voluntary_mean: Option<f64>,
    pub combined_mean: Option<f64>,
    pub effective_score: f64,
    pub voluntary: VoluntaryOutcome,
    pub category: AchievementCategory,
    pub dominant_level: AchievementLevel,
    pub evaluations: Vec<IndicatorEvaluation>,
    pub recommendations: Vec<Recommendation>,
}

impl ModuleScore {
    pub fn with_recommendations(self, recommendations: Vec<Recommendation>) -> Self {
        Self {
            recommendations,
            ..self
        }
    }
}

/// An indicator singled out as a strength or an improvement opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorHighlight {
    pub indicator_id: String,
    pub indicator_name: String,
    pub module: u8,
    pub score: f64,
    pub level: AchievementLevel,
    /// Distance to the strength threshold; zero for strengths.
    pub gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioScore {
    pub modules: Vec<ModuleScore>,
    pub final_score: f64,
    pub category: AchievementCategory,
    pub dominant_level: AchievementLevel,
    pub career_band: CareerBand,
    pub strengths: Vec<IndicatorHighlight>,
    pub opportunities: Vec<IndicatorHighlight>,
    pub computed_at: DateTime<Utc>,
}
