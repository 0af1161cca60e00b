use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the achieved level of an indicator is obtained from the oracle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStrategy {
    /// One verification per condition, level by level, stopping at the first satisfied level.
    #[default]
    PerLevel,
    /// One judgment for the whole indicator, re-checked against its own verifications.
    SingleShot,
}

impl EvaluationStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_level" | "incremental" => Some(Self::PerLevel),
            "single_shot" | "single" => Some(Self::SingleShot),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PerLevel => "per_level",
            Self::SingleShot => "single_shot",
        }
    }
}

/// Engine knobs shared by the evaluator, synthesizer and module orchestration.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    pub strategy: EvaluationStrategy,
    /// Maximum indicators evaluated concurrently within a module.
    pub worker_cap: usize,
    /// Score an indicator should reach; drives recommendation priority.
    pub target_score: f64,
    /// Route recommendations through the oracle's prioritization call.
    pub prioritize: bool,
    pub oracle_timeout: Duration,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            strategy: EvaluationStrategy::PerLevel,
            worker_cap: 3,
            target_score: 3.5,
            prioritize: false,
            oracle_timeout: Duration::from_secs(60),
        }
    }
}
