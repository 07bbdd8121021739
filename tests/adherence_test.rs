// ABOUTME: Adherence tracker tests: compliance math, rolling-window auto-adjustment
// ABOUTME: Verifies recorded days stay bit-identical through adjustments
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::sync::Arc;

use chrono::NaiveDate;
use nutriplan_engine::adherence_tracker::{ActualIntake, AdherenceTracker};
use nutriplan_engine::config::EngineConfig;
use nutriplan_engine::errors::EngineError;
use nutriplan_engine::models::plan::{
    AdjustmentReason, EquivalenceAllowance, PlanConstraints, PlanObjective, WeeklyPlan,
};
use nutriplan_engine::plan_generator::{PlanGenerator, PlanRequest};
use nutriplan_engine::plan_session::CancelFlag;

mod common;

fn generator() -> PlanGenerator {
    PlanGenerator::new(Arc::new(common::synthetic_catalog()), EngineConfig::default())
}

fn seven_day_plan(generator: &PlanGenerator) -> WeeklyPlan {
    let target = common::target_2000();
    let request = PlanRequest {
        patient_id: "patient-1".to_owned(),
        start_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        objective: PlanObjective::Maintenance,
        target,
        allowance: EquivalenceAllowance::for_target(&target),
        constraints: PlanConstraints::default(),
        days: 7,
    };
    generator.generate(&request, &CancelFlag::new()).unwrap()
}

/// Logged intake exactly matching the planned day
fn intake_matching(plan: &WeeklyPlan, day_index: u32) -> ActualIntake {
    let day = plan.day(day_index).unwrap();
    ActualIntake {
        calories: day.totals.calories,
        protein_g: day.totals.protein_g,
        carbs_g: day.totals.carbs_g,
        fat_g: day.totals.fat_g,
        fiber_g: day.totals.fiber_g,
        items: day
            .slots
            .iter()
            .flat_map(|s| s.items.iter())
            .map(|i| i.food_id.clone())
            .collect(),
    }
}

/// Logged intake at a fraction of the planned calories
fn intake_scaled(plan: &WeeklyPlan, day_index: u32, factor: f64) -> ActualIntake {
    let matching = intake_matching(plan, day_index);
    ActualIntake {
        calories: matching.calories * factor,
        protein_g: matching.protein_g * factor,
        carbs_g: matching.carbs_g * factor,
        fat_g: matching.fat_g * factor,
        fiber_g: matching.fiber_g * factor,
        items: matching.items,
    }
}

// ============================================================================
// COMPLIANCE & ADHERENCE PERCENTAGE
// ============================================================================

#[test]
fn test_perfect_adherence_is_one_hundred_percent() {
    let generator = generator();
    let tracker = AdherenceTracker::new(EngineConfig::default());
    let mut plan = seven_day_plan(&generator);

    for day_index in 1..=7 {
        let intake = intake_matching(&plan, day_index);
        let record = tracker
            .record_day(&mut plan, day_index, &intake)
            .unwrap();
        assert!((record.compliance - 1.0).abs() < 1e-9);
        assert!(record.missing_items.is_empty());
        assert!(record.extra_items.is_empty());
    }
    assert!((tracker.adherence_percentage(&plan) - 100.0).abs() < 1e-9);
}

#[test]
fn test_adherence_percentage_is_bounded() {
    let generator = generator();
    let tracker = AdherenceTracker::new(EngineConfig::default());
    let mut plan = seven_day_plan(&generator);

    // Eating triple the plan floors compliance at zero rather than going
    // negative.
    let intake = intake_scaled(&plan, 1, 3.0);
    let record = tracker
        .record_day(&mut plan, 1, &intake)
        .unwrap();
    assert!((record.compliance - 0.0).abs() < 1e-9);

    let pct = tracker.adherence_percentage(&plan);
    assert!((0.0..=100.0).contains(&pct));
}

#[test]
fn test_missing_and_extra_items_are_reported() {
    let generator = generator();
    let tracker = AdherenceTracker::new(EngineConfig::default());
    let mut plan = seven_day_plan(&generator);

    // Skip every planned serving of one food and log something unplanned.
    let mut intake = intake_matching(&plan, 1);
    let skipped = intake.items[0].clone();
    intake.items.retain(|item| item != &skipped);
    intake.items.push("torta de chilaquiles".to_owned());

    let skipped_name = generator.catalog().get(&skipped).unwrap().name.clone();
    let record = tracker.record_day(&mut plan, 1, &intake).unwrap();
    assert!(record.missing_items.contains(&skipped_name));
    assert_eq!(record.extra_items, vec!["torta de chilaquiles".to_owned()]);
}

#[test]
fn test_days_are_recorded_at_most_once() {
    let generator = generator();
    let tracker = AdherenceTracker::new(EngineConfig::default());
    let mut plan = seven_day_plan(&generator);

    let intake = intake_matching(&plan, 1);
    tracker
        .record_day(&mut plan, 1, &intake)
        .unwrap();
    let intake = intake_matching(&plan, 1);
    let err = tracker
        .record_day(&mut plan, 1, &intake)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = tracker
        .record_day(&mut plan, 99, &ActualIntake::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

// ============================================================================
// AUTO-ADJUSTMENT - rolling window, bounded target shift, append-only log
// ============================================================================

#[test]
fn test_low_adherence_triggers_a_bounded_adjustment() {
    let generator = generator();
    let tracker = AdherenceTracker::new(EngineConfig::default());
    let mut plan = seven_day_plan(&generator);
    let original_calories = plan.target.calories_total;

    for day_index in 1..=3 {
        let intake = intake_scaled(&plan, day_index, 0.5);
        tracker
            .record_day(&mut plan, day_index, &intake)
            .unwrap();
    }

    // Snapshot the recorded days before adjusting.
    let frozen: Vec<String> = (1..=3)
        .map(|i| serde_json::to_string(plan.day(i).unwrap()).unwrap())
        .collect();

    let adjustment = tracker
        .maybe_auto_adjust(&mut plan, &generator, &CancelFlag::new())
        .unwrap()
        .expect("50% adherence must trigger an adjustment");

    assert_eq!(adjustment.reason, AdjustmentReason::LowAdherence);
    assert_eq!(adjustment.changed_days, vec![4, 5, 6, 7]);
    assert_eq!(plan.adjustments.len(), 1);

    // The shift is bounded: eating half the plan moves the target down by
    // at most 10%.
    assert!((plan.target.calories_total - original_calories * 0.90).abs() < 1.0);

    // Recorded days are untouched, bit for bit.
    for (i, before) in frozen.iter().enumerate() {
        let after = serde_json::to_string(plan.day(i as u32 + 1).unwrap()).unwrap();
        assert_eq!(before, &after, "day {} changed", i + 1);
    }

    // Regenerated days track the shifted target.
    for day_index in 4..=7 {
        let day = plan.day(day_index).unwrap();
        assert!(
            (day.totals.calories - plan.target.calories_total).abs()
                <= plan.target.calories_total * 0.05,
            "day {day_index} at {:.0} kcal vs target {:.0}",
            day.totals.calories,
            plan.target.calories_total
        );
    }
}

#[test]
fn test_good_adherence_does_not_adjust() {
    let generator = generator();
    let tracker = AdherenceTracker::new(EngineConfig::default());
    let mut plan = seven_day_plan(&generator);

    for day_index in 1..=3 {
        let intake = intake_matching(&plan, day_index);
        tracker
            .record_day(&mut plan, day_index, &intake)
            .unwrap();
    }
    let adjustment = tracker
        .maybe_auto_adjust(&mut plan, &generator, &CancelFlag::new())
        .unwrap();
    assert!(adjustment.is_none());
    assert!(plan.adjustments.is_empty());
}

#[test]
fn test_window_must_fill_before_adjusting() {
    let generator = generator();
    let tracker = AdherenceTracker::new(EngineConfig::default());
    let mut plan = seven_day_plan(&generator);

    // Two bad days are not enough for the default 3-day window.
    for day_index in 1..=2 {
        let intake = intake_scaled(&plan, day_index, 0.4);
        tracker
            .record_day(&mut plan, day_index, &intake)
            .unwrap();
    }
    let adjustment = tracker
        .maybe_auto_adjust(&mut plan, &generator, &CancelFlag::new())
        .unwrap();
    assert!(adjustment.is_none());
}

// ============================================================================
// MANUAL OVERRIDE
// ============================================================================

#[test]
fn test_manual_override_is_recorded_as_an_adjustment() {
    let generator = generator();
    let tracker = AdherenceTracker::new(EngineConfig::default());
    let mut plan = seven_day_plan(&generator);

    let replacement = plan.day(5).unwrap().clone();
    let untouched_before = serde_json::to_string(plan.day(2).unwrap()).unwrap();

    tracker
        .manual_override(&mut plan, replacement, Some("nutritionist edit".to_owned()))
        .unwrap();

    assert_eq!(plan.adjustments.len(), 1);
    let adjustment = &plan.adjustments[0];
    assert_eq!(adjustment.reason, AdjustmentReason::ManualOverride);
    assert_eq!(adjustment.changed_days, vec![5]);
    assert_eq!(adjustment.note.as_deref(), Some("nutritionist edit"));

    // Days outside the adjustment stay bit-identical.
    let untouched_after = serde_json::to_string(plan.day(2).unwrap()).unwrap();
    assert_eq!(untouched_before, untouched_after);
}

#[test]
fn test_out_of_band_override_is_rejected() {
    let generator = generator();
    let tracker = AdherenceTracker::new(EngineConfig::default());
    let mut plan = seven_day_plan(&generator);

    // Double every quantity consistently: internally coherent, but twice the
    // calories the plan's target allows.
    let mut menu = plan.day(5).unwrap().clone();
    for slot in &mut menu.slots {
        for item in &mut slot.items {
            item.quantity_g *= 2.0;
            item.units *= 2.0;
            item.nutrition.calories *= 2.0;
            item.nutrition.protein_g *= 2.0;
            item.nutrition.carbs_g *= 2.0;
            item.nutrition.fat_g *= 2.0;
            item.nutrition.fiber_g *= 2.0;
        }
        slot.calories *= 2.0;
    }
    menu.totals = menu.computed_totals();

    let before = serde_json::to_string(&plan).unwrap();
    let err = tracker
        .manual_override(&mut plan, menu, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::PlanInvariantViolation { .. }));
    // A rejected override leaves the plan untouched.
    assert_eq!(before, serde_json::to_string(&plan).unwrap());
}
