use std::sync::Arc;

use super::common::{config, evaluation, ladder, rubric, verification, ScriptedOracle};
use crate::evaluation::recommendations::{
    condition_notes, next_level_gain, prioritization_request, ranked_recommendations, reconcile,
    snap_points,
};
use crate::evaluation::{
    determine_level, EvaluationStrategy, Priority, RecommendationSynthesizer,
};
use crate::oracle::RankedAction;
use crate::rubric::AchievementLevel;

fn ranked(indicator_id: &str, points: f64, priority: Priority) -> RankedAction {
    RankedAction {
        priority,
        indicator_id: indicator_id.to_string(),
        action: format!("Acción para {indicator_id}"),
        estimated_points: points,
        estimated_hours: None,
        rationale: None,
    }
}

#[test]
fn gain_is_one_level_up() {
    assert_eq!(next_level_gain(AchievementLevel::Insatisfactorio), 1.0);
    assert_eq!(next_level_gain(AchievementLevel::Competente), 1.0);
    assert_eq!(next_level_gain(AchievementLevel::Destacado), 0.0);
}

#[test]
fn snapping_clamps_to_reachable_gains() {
    assert_eq!(snap_points(1.0, 0.4), 1.0);
    assert_eq!(snap_points(1.0, 2.6), 3.0);
    assert_eq!(snap_points(2.0, 9.0), 2.0);
    assert_eq!(snap_points(3.0, -1.0), 1.0);
    assert_eq!(snap_points(2.0, f64::NAN), 1.0);
    assert_eq!(snap_points(4.0, 1.0), 0.0);
}

#[test]
fn destacado_keeps_practice_note() {
    let rubric = rubric("M1T1-I1", 1, Some(1), true);
    let verifications = vec![
        verification("D_1", true),
        verification("D_2", true),
        verification("D_3", true),
    ];
    let determination = determine_level(&ladder(), &verifications);
    let notes = condition_notes(&rubric, &determination, &verifications, 3.5);

    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].action, "Mantener las prácticas evidenciadas en Indicador M1T1-I1");
    assert_eq!(notes[0].impact, "Mantiene el puntaje máximo");
    assert_eq!(notes[0].estimated_points, 0.0);
    assert_eq!(notes[0].priority, Priority::Baja);
}

#[test]
fn unverified_conditions_fall_back_to_descriptions() {
    let rubric = rubric("M1T1-I1", 1, Some(1), true);
    let verifications = vec![verification("B_1", true)];
    let determination = determine_level(&ladder(), &verifications);
    let notes = condition_notes(&rubric, &determination, &verifications, 3.5);

    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].action, "Evidencia la condición B_2");
    assert_eq!(notes[0].rationale.as_deref(), Some("Condición B_2 del nivel Básico"));
}

#[test]
fn below_target_indicators_rank_first() {
    let evaluations = vec![
        evaluation("M1-A", 1, AchievementLevel::Destacado, true),
        evaluation("M1-B", 1, AchievementLevel::Competente, true),
        evaluation("M1-C", 1, AchievementLevel::Insatisfactorio, true),
    ];
    let merged = ranked_recommendations(&evaluations, 3.5);
    let order: Vec<&str> = merged
        .iter()
        .map(|recommendation| recommendation.indicator_id.as_str())
        .collect();
    assert_eq!(order, vec!["M1-C", "M1-B", "M1-A"]);
}

#[test]
fn equal_points_break_ties_on_priority() {
    let evaluations = vec![
        evaluation("M2-A", 2, AchievementLevel::Basico, true),
        evaluation("M2-B", 2, AchievementLevel::Basico, true),
    ];
    let reconciled = reconcile(
        &evaluations,
        vec![
            ranked("M2-A", 1.0, Priority::Baja),
            ranked("M2-B", 1.0, Priority::Alta),
        ],
        3.5,
    );
    assert_eq!(reconciled[0].indicator_id, "M2-B");
    assert_eq!(reconciled[1].indicator_id, "M2-A");
}

#[test]
fn reconcile_drops_unknown_indicators_and_negative_hours() {
    let evaluations = vec![evaluation("M2-A", 2, AchievementLevel::Competente, true)];
    let mut valid = ranked("M2-A", 0.3, Priority::Media);
    valid.estimated_hours = Some(-2.0);

    let reconciled = reconcile(&evaluations, vec![valid, ranked("M9-X", 1.0, Priority::Alta)], 3.5);
    assert_eq!(reconciled.len(), 1);
    assert_eq!(reconciled[0].estimated_points, 1.0);
    assert_eq!(reconciled[0].estimated_hours, None);
}

#[test]
fn prioritization_request_lists_pending_actions() {
    let evaluations = vec![evaluation("M3-A", 3, AchievementLevel::Basico, false)];
    let request = prioritization_request(&evaluations, 3.0);
    assert_eq!(request.target_score, 3.0);
    assert_eq!(request.indicators.len(), 1);
    assert_eq!(request.indicators[0].pending, vec!["Mejorar M3-A".to_string()]);
}

#[tokio::test]
async fn synthesizer_reconciles_oracle_ranking() {
    let oracle = ScriptedOracle::default().with_ranking(Ok(vec![
        ranked("M1-A", 0.9, Priority::Media),
        ranked("M1-B", 2.2, Priority::Alta),
    ]));
    let synthesizer = RecommendationSynthesizer::new(
        Arc::new(oracle),
        &config(EvaluationStrategy::PerLevel),
    );
    let evaluations = vec![
        evaluation("M1-A", 1, AchievementLevel::Competente, true),
        evaluation("M1-B", 1, AchievementLevel::Basico, true),
    ];

    let recommendations = synthesizer
        .prioritize(&evaluations)
        .await
        .expect("ranking succeeds");
    assert_eq!(synthesizer.target_score(), 3.5);
    assert_eq!(recommendations[0].indicator_id, "M1-B");
    assert_eq!(recommendations[0].estimated_points, 2.0);
    assert_eq!(recommendations[1].estimated_points, 1.0);
}
