// ABOUTME: Domain models shared across the engine
// ABOUTME: Food/category reference data and the plan-side aggregates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

//! Domain models

/// Food reference data and equivalence categories
pub mod food;

/// Targets, allowances, day menus and the `WeeklyPlan` aggregate
pub mod plan;

pub use food::{EquivalenceCategory, Food, NutrientTotals, UnitProfile};
pub use plan::{
    AdherenceRecord, Adjustment, AdjustmentReason, DayMenu, DayState, EquivalenceAllowance,
    GenerationMetadata, MealItem, MealSlot, NutrientTarget, PlanConstraints, PlanObjective,
    PlanSource, PlanStatus, SlotKind, WeeklyPlan,
};
