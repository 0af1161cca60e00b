use proptest::prelude::*;

use super::common::evaluation;
use crate::evaluation::aggregate::{
    check_module_set, dominant_level, module_means, portfolio_score,
};
use crate::evaluation::{
    aggregate_module, aggregate_portfolio, AchievementCategory, AggregationError, CareerBand,
    IndicatorEvaluation, ModuleScore, VoluntaryOutcome,
};
use crate::rubric::AchievementLevel::{self, Basico, Competente, Destacado, Insatisfactorio};

fn module_evaluations(
    module: u8,
    mandatory: &[AchievementLevel],
    voluntary: &[AchievementLevel],
) -> Vec<IndicatorEvaluation> {
    let mandatory = mandatory
        .iter()
        .enumerate()
        .map(|(index, level)| evaluation(&format!("M{module}-O{index}"), module, *level, true));
    let voluntary = voluntary
        .iter()
        .enumerate()
        .map(|(index, level)| evaluation(&format!("M{module}-V{index}"), module, *level, false));
    mandatory.chain(voluntary).collect()
}

fn module(module: u8, mandatory: &[AchievementLevel]) -> ModuleScore {
    aggregate_module(module, module_evaluations(module, mandatory, &[])).expect("module aggregates")
}

#[test]
fn low_voluntary_scores_are_excluded() {
    let score = aggregate_module(
        1,
        module_evaluations(1, &[Competente, Competente], &[Insatisfactorio, Basico]),
    )
    .expect("module aggregates");

    assert_eq!(score.mandatory_mean, 3.0);
    assert_eq!(score.voluntary_mean, Some(1.5));
    assert_eq!(score.combined_mean, Some(2.25));
    assert_eq!(score.effective_score, 3.0);
    assert_eq!(score.voluntary, VoluntaryOutcome::Excluded);
    assert_eq!(score.category, AchievementCategory::B);
    assert_eq!(score.dominant_level, Competente);
    assert_eq!(score.evaluations.len(), 4);
}

#[test]
fn stronger_voluntary_work_raises_the_module() {
    let score = aggregate_module(
        2,
        module_evaluations(2, &[Competente, Competente], &[Destacado]),
    )
    .expect("module aggregates");

    let expected = 10.0 / 3.0;
    assert!((score.effective_score - expected).abs() < 1e-12);
    match score.voluntary {
        VoluntaryOutcome::Included { gain } => assert!((gain - (expected - 3.0)).abs() < 1e-12),
        other => panic!("expected inclusion, got {other:?}"),
    }
}

#[test]
fn strong_voluntary_work_lifts_a_weak_module() {
    let means = module_means(&[2.8], &[3.6]).expect("mandatory scores present");
    assert_eq!(means.mandatory_mean, 2.8);
    assert_eq!(means.voluntary_mean, Some(3.6));
    let combined = means.combined_mean.expect("voluntary work evaluated");
    assert!((combined - 3.2).abs() < 1e-9);
    assert!((means.effective_score - 3.2).abs() < 1e-9);
    match means.outcome {
        VoluntaryOutcome::Included { gain } => assert!((gain - 0.4).abs() < 1e-9),
        other => panic!("expected inclusion, got {other:?}"),
    }
}

#[test]
fn equal_means_do_not_count_as_improvement() {
    let means = module_means(&[3.0, 3.0], &[3.0]).expect("mandatory scores present");
    assert_eq!(means.outcome, VoluntaryOutcome::Excluded);
    assert_eq!(means.effective_score, 3.0);
}

#[test]
fn module_without_voluntary_work_reports_not_evaluated() {
    let score = module(3, &[Basico, Competente]);
    assert_eq!(score.voluntary, VoluntaryOutcome::NotEvaluated);
    assert_eq!(score.effective_score, 2.5);
    assert_eq!(score.category, AchievementCategory::C);
}

#[test]
fn module_needs_mandatory_evaluations() {
    let error = aggregate_module(1, module_evaluations(1, &[], &[Destacado]))
        .expect_err("voluntary alone is not enough");
    assert_eq!(error, AggregationError::EmptyIndicatorSet(1));
}

#[test]
fn module_rejects_foreign_indicators() {
    let mut evaluations = module_evaluations(1, &[Competente], &[]);
    evaluations.push(evaluation("M2-O0", 2, Competente, true));
    let error = aggregate_module(1, evaluations).expect_err("mixed modules");
    assert!(matches!(error, AggregationError::ModuleMismatch { found: 2, .. }));
}

#[test]
fn dominant_level_ties_go_up() {
    assert_eq!(
        dominant_level([Basico, Competente, Competente, Basico]),
        Some(Competente)
    );
    assert_eq!(dominant_level([Basico, Basico, Destacado]), Some(Basico));
    assert_eq!(dominant_level(Vec::new()), None);
}

#[test]
fn module_set_must_be_complete_and_unique() {
    assert!(check_module_set([3, 1, 2]).is_ok());
    assert_eq!(check_module_set([1, 2]), Err(AggregationError::MissingModule(3)));
    assert_eq!(
        check_module_set([1, 2, 2, 3]),
        Err(AggregationError::DuplicateModule(2))
    );
    assert_eq!(check_module_set([1, 2, 4]), Err(AggregationError::UnknownModule(4)));
}

#[test]
fn weighted_portfolio_lands_in_category_b() {
    let modules = vec![
        module(3, &[Basico]),
        module(1, &[Destacado, Destacado, Destacado, Competente, Competente]),
        module(2, &[Destacado, Competente, Competente, Competente, Competente]),
    ];
    let portfolio = aggregate_portfolio(modules).expect("portfolio aggregates");

    assert!((portfolio.final_score - 3.12).abs() < 1e-9);
    assert_eq!(portfolio.category, AchievementCategory::B);
    assert_eq!(portfolio.career_band, CareerBand::Avanzado);
    assert_eq!(portfolio.dominant_level, Competente);
    let order: Vec<u8> = portfolio.modules.iter().map(|score| score.module).collect();
    assert_eq!(order, vec![1, 2, 3]);

    assert_eq!(portfolio.strengths.len(), 4);
    assert_eq!(portfolio.opportunities.len(), 1);
    assert_eq!(portfolio.opportunities[0].indicator_id, "M3-O0");
    assert!((portfolio.opportunities[0].gap - 1.5).abs() < 1e-12);
}

#[test]
fn opportunities_keep_the_three_widest_gaps() {
    let modules = vec![
        module(1, &[Insatisfactorio, Basico, Basico, Basico]),
        module(2, &[Competente]),
        module(3, &[Competente]),
    ];
    let portfolio = aggregate_portfolio(modules).expect("portfolio aggregates");
    assert_eq!(portfolio.opportunities.len(), 3);
    assert_eq!(portfolio.opportunities[0].level, Insatisfactorio);
    assert!(portfolio.strengths.is_empty());
}

#[test]
fn portfolio_rejects_missing_module() {
    let error = aggregate_portfolio(vec![module(1, &[Competente]), module(2, &[Competente])])
        .expect_err("module 3 missing");
    assert_eq!(error, AggregationError::MissingModule(3));
}

fn levels(range: std::ops::Range<usize>) -> impl Strategy<Value = Vec<AchievementLevel>> {
    prop::collection::vec(prop::sample::select(AchievementLevel::ordered().to_vec()), range)
}

proptest! {
    #[test]
    fn voluntary_work_never_lowers_a_module(mandatory in levels(1..6), voluntary in levels(0..5)) {
        let score = aggregate_module(1, module_evaluations(1, &mandatory, &voluntary))
            .expect("module aggregates");
        prop_assert!(score.effective_score >= score.mandatory_mean);
        if let Some(combined) = score.combined_mean {
            prop_assert!(score.effective_score >= combined);
        }
    }

    #[test]
    fn portfolio_follows_fixed_weights(
        first in levels(1..5),
        second in levels(1..5),
        third in levels(1..5),
    ) {
        let portfolio = aggregate_portfolio(vec![
            module(1, &first),
            module(2, &second),
            module(3, &third),
        ])
        .expect("portfolio aggregates");

        let expected = portfolio_score(
            portfolio.modules[0].effective_score,
            portfolio.modules[1].effective_score,
            portfolio.modules[2].effective_score,
        );
        prop_assert_eq!(portfolio.final_score, expected);
        prop_assert!(portfolio.final_score > 1.0 - 1e-9 && portfolio.final_score < 4.0 + 1e-9);
        prop_assert_eq!(portfolio.category, AchievementCategory::from_score(expected));
    }
}
