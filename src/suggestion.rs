// ABOUTME: Pluggable substitution-suggestion strategy (LLM advisory seam)
// ABOUTME: Every candidate is re-validated by the equivalence calculator before acceptance
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

//! Suggestion providers
//!
//! External advisory layers (an LLM chat assistant, a cultural-adaptation
//! service) may propose substitutions, but they never bypass the engine's
//! invariants: a suggestion is an unvalidated candidate until
//! [`apply_suggestion`] has run it through the equivalence calculator's
//! tolerance check and the plan's aggregate invariants. Correctness stays
//! independent of any external model's behavior.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::FoodCatalog;
use crate::config::EngineConfig;
use crate::equivalence_calculator::{convert, within_tolerance, Conversion};
use crate::errors::{EngineError, EngineResult};
use crate::models::plan::{AdjustmentReason, SlotKind, WeeklyPlan};

/// A candidate substitution proposed by an external provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedSubstitution {
    /// 1-based day the substitution targets
    pub day_index: u32,
    /// Slot the substitution targets
    pub slot: SlotKind,
    /// Catalog id of the planned food to replace
    pub replace_food_id: String,
    /// Catalog id of the proposed replacement
    pub with_food_id: String,
    /// Provider rationale, kept in the adjustment note when accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Strategy interface for substitution providers
///
/// Implementations are free-form (rule-based, model-backed); the engine
/// treats their output as untrusted candidates.
pub trait SuggestionProvider {
    /// Propose substitutions for a plan
    fn suggest(&self, plan: &WeeklyPlan, catalog: &FoodCatalog) -> Vec<SuggestedSubstitution>;
}

/// Validate a suggestion and, if it passes, apply it to the plan
///
/// Acceptance requires: both foods exist in the catalog, they share an
/// equivalence category, the converted amount stays within the exchange
/// tolerance, and the resulting day keeps the plan's aggregate invariants.
/// An accepted suggestion is recorded as a manual-override adjustment whose
/// note carries the provider rationale.
///
/// # Errors
///
/// Returns `EngineError::InvalidInput` for unknown days/slots/foods,
/// `EngineError::CategoryMismatch` for cross-category proposals, and
/// `EngineError::PlanInvariantViolation` when the substitution would leave
/// the plan outside tolerance.
pub fn apply_suggestion(
    plan: &mut WeeklyPlan,
    suggestion: &SuggestedSubstitution,
    catalog: &FoodCatalog,
    config: &EngineConfig,
) -> EngineResult<()> {
    let day = plan.day(suggestion.day_index).ok_or_else(|| {
        EngineError::invalid_input(format!("plan has no day {}", suggestion.day_index))
    })?;
    let source = catalog.get(&suggestion.replace_food_id).ok_or_else(|| {
        EngineError::invalid_input(format!(
            "unknown food '{}'",
            suggestion.replace_food_id
        ))
    })?;
    let target = catalog.get(&suggestion.with_food_id).ok_or_else(|| {
        EngineError::invalid_input(format!("unknown food '{}'", suggestion.with_food_id))
    })?;

    let mut menu = day.clone();
    let slot = menu
        .slots
        .iter_mut()
        .find(|s| s.kind == suggestion.slot)
        .ok_or_else(|| {
            EngineError::invalid_input(format!("day has no {} slot", suggestion.slot))
        })?;
    let item = slot
        .items
        .iter_mut()
        .find(|i| i.food_id == suggestion.replace_food_id)
        .ok_or_else(|| {
            EngineError::invalid_input(format!(
                "'{}' is not planned in {} of day {}",
                suggestion.replace_food_id, suggestion.slot, suggestion.day_index
            ))
        })?;

    let amount = match convert(source, item.quantity_g, target)? {
        Conversion::Amount(g) => g,
        // Free replacement: one defined portion stands in for the amount.
        Conversion::Unlimited => target.portion_size_g,
    };
    if !target.is_free()
        && !within_tolerance(
            source,
            item.quantity_g,
            target,
            amount,
            config.tolerances.conversion_band_pct,
        )
    {
        return Err(EngineError::invariant_violation(format!(
            "substituting '{}' for '{}' exceeds the {}% exchange tolerance",
            suggestion.with_food_id,
            suggestion.replace_food_id,
            config.tolerances.conversion_band_pct
        )));
    }

    debug!(
        day_index = suggestion.day_index,
        slot = %suggestion.slot,
        from = %suggestion.replace_food_id,
        to = %suggestion.with_food_id,
        amount,
        "suggestion passed validation"
    );

    item.food_id = target.id.clone();
    item.food_name = target.name.clone();
    item.category = target.equivalence_category;
    item.quantity_g = amount;
    item.nutrition = target.nutrition_for(amount);
    slot.calories = slot.totals().calories;
    menu.totals = menu.computed_totals();

    plan.replace_day(
        menu,
        AdjustmentReason::ManualOverride,
        suggestion.rationale.clone(),
        &config.tolerances,
    )
}
