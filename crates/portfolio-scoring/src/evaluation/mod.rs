//! Level determination, indicator evaluation, statistical enrichment,
//! recommendations and module/portfolio aggregation.

pub mod aggregate;
mod config;
pub mod determination;
mod domain;
mod evaluator;
pub mod recommendations;
pub mod statistics;

#[cfg(test)]
pub(crate) mod tests;

pub use aggregate::{aggregate_module, aggregate_portfolio, AggregationError};
pub use config::{EvaluationConfig, EvaluationStrategy};
pub use determination::{determine_level, level_satisfied, LevelDetermination};
pub use domain::{
    AchievementCategory, CareerBand, ConditionVerification, IndicatorEvaluation,
    IndicatorHighlight, IndicatorStatistics, LevelCorrection, ModuleScore, NationalStanding,
    PortfolioScore, Priority, Recommendation, SubmissionRef, VoluntaryOutcome,
};
pub use evaluator::{next_level_gap, EvaluationError, IndicatorEvaluator, IndicatorInput};
pub use recommendations::RecommendationSynthesizer;
