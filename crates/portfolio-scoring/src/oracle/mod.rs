//! Narrow verification interface to the natural-language judgment service.
//!
//! The engine never trusts an oracle conclusion on its own: every level it
//! reports is recomputed from the condition verifications it returns.

mod cache;
mod client;
pub mod prompt;
pub mod response;


pub use cache::{CachedOracle, OracleCache, DEFAULT_CACHE_CAPACITY};
pub use client::HttpOracleClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ErrorDisposition;
use crate::evaluation::{ConditionVerification, Priority};
use crate::rubric::{
    AchievementLevel, Condition, EvidenceCriteria, Level, LogicOperator, Quantifier, Rubric,
};

/// Everything the oracle may see when checking one condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionRequest {
    pub indicator_id: String,
    pub indicator_name: String,
    pub level: AchievementLevel,
    pub operator: LogicOperator,
    pub level_description: String,
    pub level_notes: Option<String>,
    pub condition_id: String,
    pub condition_description: String,
    pub criteria: EvidenceCriteria,
    pub quantifier: Option<Quantifier>,
    pub clarifying_notes: Vec<String>,
    /// Excerpt of the submission selected by the rubric's evidence paths.
    pub evidence: String,
}

impl ConditionRequest {
    pub fn new(rubric: &Rubric, level: &Level, condition: &Condition, evidence: &str) -> Self {
        Self {
            indicator_id: rubric.indicator_id.clone(),
            indicator_name: rubric.indicator_name.clone(),
            level: level.name,
            operator: level.operator,
            level_description: level.description.clone(),
            level_notes: level.notes.clone(),
            condition_id: condition.id.clone(),
            condition_description: condition.description.clone(),
            criteria: condition.criteria.clone(),
            quantifier: condition.quantifier,
            clarifying_notes: rubric.clarifying_notes.clone(),
            evidence: evidence.to_string(),
        }
    }
}

/// Request for a whole-indicator judgment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgmentRequest {
    pub rubric: Rubric,
    pub evidence: String,
}

/// Self-reported indicator judgment. `claimed_level` is advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelJudgment {
    pub claimed_level: AchievementLevel,
    pub claimed_score: Option<f64>,
    pub verifications: Vec<ConditionVerification>,
    pub justification: String,
    pub next_level_gap: String,
    pub strengths: Vec<String>,
    pub recommendations: Vec<JudgedAction>,
    pub highlighted_evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgedAction {
    pub priority: Priority,
    pub action: String,
    pub impact: String,
}

/// One indicator summary handed to the prioritization call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrioritizationItem {
    pub indicator_id: String,
    pub indicator_name: String,
    pub level: AchievementLevel,
    pub score: f64,
    pub next_level_gap: String,
    pub pending: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrioritizationRequest {
    pub target_score: f64,
    pub indicators: Vec<PrioritizationItem>,
}

/// Raw prioritized action as proposed by the oracle, before ladder checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAction {
    pub priority: Priority,
    pub indicator_id: String,
    pub action: String,
    pub estimated_points: f64,
    pub estimated_hours: Option<f64>,
    pub rationale: Option<String>,
}

#[async_trait]
pub trait ConditionOracle: Send + Sync {
    /// Stable name folded into cache keys.
    fn identity(&self) -> &str {
        "oracle"
    }

    async fn verify_condition(
        &self,
        request: &ConditionRequest,
    ) -> Result<ConditionVerification, OracleError>;

    async fn judge_indicator(&self, request: &JudgmentRequest)
        -> Result<LevelJudgment, OracleError>;

    async fn prioritize(
        &self,
        request: &PrioritizationRequest,
    ) -> Result<Vec<RankedAction>, OracleError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    #[error("oracle response malformed: {reason}")]
    Malformed { reason: String },
    #[error("oracle unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("oracle rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("oracle client misconfigured: {reason}")]
    Configuration { reason: String },
}

impl OracleError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Malformed output is surfaced to the caller to resubmit; it is never
    /// retried internally.
    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            Self::Malformed { .. } => ErrorDisposition::Resubmit,
            Self::Unavailable { .. } => ErrorDisposition::Retry,
            Self::Rejected { .. } | Self::Configuration { .. } => ErrorDisposition::Alert,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "oracle_response_malformed",
            Self::Unavailable { .. } => "oracle_unavailable",
            Self::Rejected { .. } => "oracle_rejected",
            Self::Configuration { .. } => "oracle_configuration",
        }
    }
}
