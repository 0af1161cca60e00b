use std::collections::HashMap;

use chrono::Utc;

use super::domain::{
    AchievementCategory, CareerBand, IndicatorEvaluation, IndicatorHighlight, ModuleScore,
    PortfolioScore, VoluntaryOutcome,
};
use crate::error::ErrorDisposition;
use crate::rubric::AchievementLevel;

pub const MODULE_WEIGHTS: [(u8, f64); 3] = [(1, 0.4), (2, 0.4), (3, 0.2)];

/// Indicators at or above this score are reported as strengths.
pub const STRENGTH_THRESHOLD: f64 = 3.5;
/// Indicators below this score are improvement opportunities.
pub const OPPORTUNITY_THRESHOLD: f64 = 3.0;
const MAX_OPPORTUNITIES: usize = 3;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregationError {
    #[error("module {0} has no mandatory indicator evaluations")]
    EmptyIndicatorSet(u8),
    #[error("indicator {indicator_id} belongs to module {found}, not module {expected}")]
    ModuleMismatch {
        indicator_id: String,
        expected: u8,
        found: u8,
    },
    #[error("portfolio is missing module {0}")]
    MissingModule(u8),
    #[error("module {0} appears more than once")]
    DuplicateModule(u8),
    #[error("module {0} is not part of the portfolio")]
    UnknownModule(u8),
}

impl AggregationError {
    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            Self::EmptyIndicatorSet(_) | Self::MissingModule(_) => ErrorDisposition::Resubmit,
            Self::ModuleMismatch { .. } | Self::DuplicateModule(_) | Self::UnknownModule(_) => {
                ErrorDisposition::Alert
            }
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Means and outcome of the voluntary-inclusion rule for one module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleMeans {
    pub mandatory_mean: f64,
    pub voluntary_mean: Option<f64>,
    pub combined_mean: Option<f64>,
    pub effective_score: f64,
    pub outcome: VoluntaryOutcome,
}

/// Voluntary work counts only when the pooled mean beats the mandatory mean,
/// so the effective score never drops below it.
pub fn module_means(mandatory: &[f64], voluntary: &[f64]) -> Option<ModuleMeans> {
    let mandatory_mean = mean(mandatory)?;

    let Some(voluntary_mean) = mean(voluntary) else {
        return Some(ModuleMeans {
            mandatory_mean,
            voluntary_mean: None,
            combined_mean: None,
            effective_score: mandatory_mean,
            outcome: VoluntaryOutcome::NotEvaluated,
        });
    };

    let pooled: Vec<f64> = mandatory.iter().chain(voluntary).copied().collect();
    let combined_mean = mean(&pooled).unwrap_or(mandatory_mean);

    let (effective_score, outcome) = if combined_mean > mandatory_mean {
        (
            combined_mean,
            VoluntaryOutcome::Included {
                gain: combined_mean - mandatory_mean,
            },
        )
    } else {
        (mandatory_mean, VoluntaryOutcome::Excluded)
    };

    Some(ModuleMeans {
        mandatory_mean,
        voluntary_mean: Some(voluntary_mean),
        combined_mean: Some(combined_mean),
        effective_score,
        outcome,
    })
}

/// Most frequent level; ties go to the higher-scoring level.
pub fn dominant_level<I>(levels: I) -> Option<AchievementLevel>
where
    I: IntoIterator<Item = AchievementLevel>,
{
    let mut counts: HashMap<AchievementLevel, usize> = HashMap::new();
    for level in levels {
        *counts.entry(level).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(level_a, count_a), (level_b, count_b)| {
            count_a.cmp(count_b).then(level_a.cmp(level_b))
        })
        .map(|(level, _)| level)
}

pub fn aggregate_module(
    module: u8,
    evaluations: Vec<IndicatorEvaluation>,
) -> Result<ModuleScore, AggregationError> {
    if !MODULE_WEIGHTS.iter().any(|(known, _)| *known == module) {
        return Err(AggregationError::UnknownModule(module));
    }

    if let Some(stray) = evaluations
        .iter()
        .find(|evaluation| evaluation.module != module)
    {
        return Err(AggregationError::ModuleMismatch {
            indicator_id: stray.indicator_id.clone(),
            expected: module,
            found: stray.module,
        });
    }

    let (mandatory, voluntary): (Vec<&IndicatorEvaluation>, Vec<&IndicatorEvaluation>) =
        evaluations.iter().partition(|evaluation| evaluation.mandatory);
    let mandatory_scores: Vec<f64> = mandatory.iter().map(|evaluation| evaluation.score).collect();
    let voluntary_scores: Vec<f64> = voluntary.iter().map(|evaluation| evaluation.score).collect();

    let means = module_means(&mandatory_scores, &voluntary_scores)
        .ok_or(AggregationError::EmptyIndicatorSet(module))?;

    let voluntary_counted = matches!(means.outcome, VoluntaryOutcome::Included { .. });
    let dominant = dominant_level(
        evaluations
            .iter()
            .filter(|evaluation| evaluation.mandatory || voluntary_counted)
            .map(|evaluation| evaluation.level),
    )
    .ok_or(AggregationError::EmptyIndicatorSet(module))?;

    tracing::info!(
        module,
        mandatory_mean = means.mandatory_mean,
        effective_score = means.effective_score,
        voluntary_included = voluntary_counted,
        "module aggregated"
    );

    Ok(ModuleScore {
        module,
        mandatory_mean: means.mandatory_mean,
        voluntary_mean: means.voluntary_mean,
        combined_mean: means.combined_mean,
        effective_score: means.effective_score,
        voluntary: means.outcome,
        category: AchievementCategory::from_score(means.effective_score),
        dominant_level: dominant,
        evaluations,
        recommendations: Vec::new(),
    })
}

/// Checks that modules 1, 2 and 3 each appear exactly once.
pub fn check_module_set<I>(modules: I) -> Result<(), AggregationError>
where
    I: IntoIterator<Item = u8>,
{
    let mut seen = [false; 3];
    for module in modules {
        let index = match module {
            1..=3 => usize::from(module - 1),
            other => return Err(AggregationError::UnknownModule(other)),
        };
        if seen[index] {
            return Err(AggregationError::DuplicateModule(module));
        }
        seen[index] = true;
    }

    match seen.iter().position(|present| !present) {
        Some(index) => Err(AggregationError::MissingModule(index as u8 + 1)),
        None => Ok(()),
    }
}

/// `0.4·M1 + 0.4·M2 + 0.2·M3`, without intermediate rounding.
pub fn portfolio_score(module_1: f64, module_2: f64, module_3: f64) -> f64 {
    0.4 * module_1 + 0.4 * module_2 + 0.2 * module_3
}

fn highlight(evaluation: &IndicatorEvaluation) -> IndicatorHighlight {
    IndicatorHighlight {
        indicator_id: evaluation.indicator_id.clone(),
        indicator_name: evaluation.indicator_name.clone(),
        module: evaluation.module,
        score: evaluation.score,
        level: evaluation.level,
        gap: (STRENGTH_THRESHOLD - evaluation.score).max(0.0),
    }
}

pub fn aggregate_portfolio(modules: Vec<ModuleScore>) -> Result<PortfolioScore, AggregationError> {
    check_module_set(modules.iter().map(|module| module.module))?;

    let mut ordered = modules;
    ordered.sort_by_key(|module| module.module);

    let final_score = portfolio_score(
        ordered[0].effective_score,
        ordered[1].effective_score,
        ordered[2].effective_score,
    );

    let evaluations: Vec<&IndicatorEvaluation> = ordered
        .iter()
        .flat_map(|module| module.evaluations.iter())
        .collect();

    let dominant = dominant_level(evaluations.iter().map(|evaluation| evaluation.level))
        .unwrap_or(AchievementLevel::Insatisfactorio);

    let strengths = evaluations
        .iter()
        .filter(|evaluation| evaluation.score >= STRENGTH_THRESHOLD)
        .map(|evaluation| highlight(evaluation))
        .collect();

    let mut opportunities: Vec<IndicatorHighlight> = evaluations
        .iter()
        .filter(|evaluation| evaluation.score < OPPORTUNITY_THRESHOLD)
        .map(|evaluation| highlight(evaluation))
        .collect();
    opportunities.sort_by(|a, b| b.gap.total_cmp(&a.gap));
    opportunities.truncate(MAX_OPPORTUNITIES);

    let category = AchievementCategory::from_score(final_score);
    let career_band = CareerBand::from_score(final_score);
    tracing::info!(
        final_score,
        category = ?category,
        career_band = career_band.label(),
        "portfolio aggregated"
    );

    Ok(PortfolioScore {
        modules: ordered,
        final_score,
        category,
        dominant_level: dominant,
        career_band,
        strengths,
        opportunities,
        computed_at: Utc::now(),
    })
}
