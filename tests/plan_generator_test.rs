// ABOUTME: Plan generator tests: allocation, balancing, constraints, determinism
// ABOUTME: Includes the 2000 kcal / 7-day scenario and the day-balance invariant
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use nutriplan_engine::catalog::FoodCatalog;
use nutriplan_engine::config::EngineConfig;
use nutriplan_engine::errors::EngineError;
use nutriplan_engine::models::food::EquivalenceCategory;
use nutriplan_engine::models::plan::{
    DayState, EquivalenceAllowance, NutrientTarget, PlanConstraints, PlanObjective,
};
use nutriplan_engine::plan_generator::{PlanGenerator, PlanRequest};
use nutriplan_engine::plan_session::CancelFlag;

mod common;

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn request(target: NutrientTarget, allowance: EquivalenceAllowance, days: u32) -> PlanRequest {
    PlanRequest {
        patient_id: "patient-1".to_owned(),
        start_date: start_date(),
        objective: PlanObjective::Maintenance,
        target,
        allowance,
        constraints: PlanConstraints::default(),
        days,
    }
}

fn synthetic_generator() -> PlanGenerator {
    PlanGenerator::new(Arc::new(common::synthetic_catalog()), EngineConfig::default())
}

// ============================================================================
// SCENARIO - 2000 kcal, 7 days, the classic starter allowance
// ============================================================================

#[test]
fn test_seven_day_scenario_hits_the_calorie_band() {
    let catalog = Arc::new(FoodCatalog::bundled().unwrap());
    let generator = PlanGenerator::new(catalog, EngineConfig::default());

    let target = NutrientTarget {
        calories_total: 2000.0,
        protein_g: 150.0,
        protein_pct: 30.0,
        carbs_g: 225.0,
        carbs_pct: 45.0,
        fat_g: 55.6,
        fat_pct: 25.0,
        fiber_g: 28.0,
    };
    let allowance = EquivalenceAllowance::new()
        .with(EquivalenceCategory::Fruits, 3.0)
        .with(EquivalenceCategory::Vegetables, 4.0)
        .with(EquivalenceCategory::CerealsNoFat, 6.0)
        .with(EquivalenceCategory::LeanProteinLow, 5.0);

    let plan = generator
        .generate(&request(target, allowance, 7), &CancelFlag::new())
        .unwrap();

    assert_eq!(plan.days.len(), 7);
    for day in &plan.days {
        assert_eq!(day.state, DayState::Finalized);
        assert!(
            (day.totals.calories - 2000.0).abs() <= 100.0,
            "day {} at {:.0} kcal",
            day.day_index,
            day.totals.calories
        );
        day.validate_totals().unwrap();
    }
    // The starter allowance is far below 2000 kcal, so it must have been
    // rescaled onto the target.
    assert!(plan
        .metadata
        .optimization_flags
        .iter()
        .any(|f| f.starts_with("allowance_rescaled")));
}

// ============================================================================
// DAY BALANCE INVARIANT - calories +/-5%, macros +/-10%
// ============================================================================

#[test]
fn test_generated_days_stay_within_the_tolerance_bands() {
    let generator = synthetic_generator();
    let target = common::target_2000();
    let allowance = EquivalenceAllowance::for_target(&target);

    let plan = generator
        .generate(&request(target, allowance, 7), &CancelFlag::new())
        .unwrap();

    for day in &plan.days {
        let t = &day.totals;
        assert!(
            (t.calories - target.calories_total).abs() <= target.calories_total * 0.05,
            "day {} calories {:.0}",
            day.day_index,
            t.calories
        );
        assert!((t.protein_g - target.protein_g).abs() <= target.protein_g * 0.10);
        assert!((t.carbs_g - target.carbs_g).abs() <= target.carbs_g * 0.10);
        assert!((t.fat_g - target.fat_g).abs() <= target.fat_g * 0.10);
    }
    plan.validate_invariants(&generator.config().tolerances).unwrap();
    assert!(plan.metadata.warnings.is_empty(), "{:?}", plan.metadata.warnings);
}

#[test]
fn test_generation_is_deterministic() {
    let generator = synthetic_generator();
    let target = common::target_2000();
    let allowance = EquivalenceAllowance::for_target(&target);

    let first = generator
        .generate(&request(target, allowance.clone(), 5), &CancelFlag::new())
        .unwrap();
    let second = generator
        .generate(&request(target, allowance, 5), &CancelFlag::new())
        .unwrap();

    // Ids and timestamps differ; the menus must not.
    let days_a = serde_json::to_string(&first.days).unwrap();
    let days_b = serde_json::to_string(&second.days).unwrap();
    assert_eq!(days_a, days_b);
}

// ============================================================================
// CONSTRAINTS
// ============================================================================

#[test]
fn test_avoided_tags_never_appear() {
    let generator = synthetic_generator();
    let target = common::target_2000();
    let allowance = EquivalenceAllowance::for_target(&target);

    let mut req = request(target, allowance, 7);
    req.constraints.avoid = BTreeSet::from(["fish".to_owned()]);

    let plan = generator.generate(&req, &CancelFlag::new()).unwrap();
    for day in &plan.days {
        for slot in &day.slots {
            for item in &slot.items {
                assert_ne!(item.food_id, "protein_b", "fish food planned on day {}", day.day_index);
            }
        }
    }
}

#[test]
fn test_traditional_preference_drives_selection() {
    let generator = synthetic_generator();
    let target = common::target_2000();
    let allowance = EquivalenceAllowance::for_target(&target);

    let mut req = request(target, allowance, 1);
    req.constraints.prefer_traditional = true;

    let plan = generator.generate(&req, &CancelFlag::new()).unwrap();
    let fruit_items: Vec<_> = plan.days[0]
        .slots
        .iter()
        .flat_map(|s| s.items.iter())
        .filter(|i| i.category == EquivalenceCategory::Fruits)
        .collect();
    assert!(!fruit_items.is_empty());
    // fruit_c is the only traditional fruit in the fixture.
    assert!(fruit_items.iter().all(|i| i.food_id == "fruit_c"));
}

#[test]
fn test_out_of_season_foods_are_skipped() {
    let generator = synthetic_generator();
    let target = common::target_2000();
    let allowance = EquivalenceAllowance::for_target(&target);

    let mut req = request(target, allowance, 7);
    req.constraints.respect_season = true;
    req.constraints.season = Some("winter".to_owned());

    let plan = generator.generate(&req, &CancelFlag::new()).unwrap();
    for day in &plan.days {
        for slot in &day.slots {
            for item in &slot.items {
                // fruit_b is summer-only in the fixture.
                assert_ne!(item.food_id, "fruit_b");
            }
        }
    }
}

#[test]
fn test_empty_category_without_substitute_is_infeasible() {
    let generator = synthetic_generator();
    let target = common::target_2000();
    let allowance = EquivalenceAllowance::for_target(&target)
        .with(EquivalenceCategory::SugarsNoFat, 2.0);

    let mut req = request(target, allowance, 3);
    req.constraints.avoid = BTreeSet::from(["sugar".to_owned()]);

    let err = generator.generate(&req, &CancelFlag::new()).unwrap_err();
    match err {
        EngineError::InfeasibleAllowance {
            category,
            day_index,
            ..
        } => {
            assert_eq!(category, EquivalenceCategory::SugarsNoFat);
            assert_eq!(day_index, 1);
        }
        other => panic!("expected InfeasibleAllowance, got {other:?}"),
    }
}

#[test]
fn test_legume_allowance_redistributes_into_lean_protein() {
    let generator = synthetic_generator();
    let target = common::target_2000();
    let allowance = EquivalenceAllowance::for_target(&target);
    assert!(allowance.get(EquivalenceCategory::Legumes) > 0.0);

    let mut req = request(target, allowance, 3);
    req.constraints.avoid = BTreeSet::from(["legume".to_owned()]);

    let plan = generator.generate(&req, &CancelFlag::new()).unwrap();
    for day in &plan.days {
        let has_legume = day
            .slots
            .iter()
            .flat_map(|s| s.items.iter())
            .any(|i| i.category == EquivalenceCategory::Legumes);
        assert!(!has_legume, "legume item survived on day {}", day.day_index);
        // The redistributed calories keep the day inside the band.
        assert!(
            (day.totals.calories - target.calories_total).abs()
                <= target.calories_total * 0.05
        );
    }
}

// ============================================================================
// LIFECYCLE & CANCELLATION
// ============================================================================

#[test]
fn test_cancelled_generation_yields_no_plan() {
    let generator = synthetic_generator();
    let target = common::target_2000();
    let allowance = EquivalenceAllowance::for_target(&target);

    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = generator
        .generate(&request(target, allowance, 7), &cancel)
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
}

#[test]
fn test_invalid_requests_are_rejected() {
    let generator = synthetic_generator();
    let target = common::target_2000();
    let allowance = EquivalenceAllowance::for_target(&target);

    let err = generator
        .generate(&request(target, allowance.clone(), 0), &CancelFlag::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = generator
        .generate(
            &request(target, EquivalenceAllowance::new(), 7),
            &CancelFlag::new(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}
