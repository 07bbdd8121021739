// ABOUTME: Equivalence conversion between foods of the same SMAE category
// ABOUTME: Preserves caloric contribution within the 5% exchange tolerance
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

//! Equivalence Calculator
//!
//! Converts an amount of one food into the amount of another food of the
//! same category that carries the same caloric contribution. This is the
//! defining correctness property of the exchange model: substitutions must
//! stay nutritionally interchangeable, so the caloric difference between the
//! source and the converted target never exceeds the SMAE exchange
//! tolerance (5 %), granularity rounding aside.

use crate::errors::{EngineError, EngineResult};
use crate::models::food::Food;

/// Finest rounding step for converted amounts (grams)
const MIN_ROUNDING_STEP_G: f64 = 0.1;

/// Result of an equivalence conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// Equivalent amount of the target food, in grams
    Amount(f64),
    /// The target food is free (zero calories): no bounded equivalent exists
    Unlimited,
}

impl Conversion {
    /// The converted amount, or `None` for unlimited conversions
    #[must_use]
    pub const fn amount_g(self) -> Option<f64> {
        match self {
            Self::Amount(g) => Some(g),
            Self::Unlimited => None,
        }
    }
}

/// Convert `amount_g` of `source` into the equivalent amount of `target`
///
/// Both foods must share an equivalence category. The source amount is
/// expressed as a nominal-unit multiple (amount over portion size, scaled by
/// the food's calories relative to the category's nominal unit calories);
/// the target amount restores the same unit multiple. The result is rounded
/// to one decimal gram or the target's natural portion granularity,
/// whichever is coarser.
///
/// # Errors
///
/// Returns `EngineError::InvalidInput` for a non-positive or non-finite
/// amount, `EngineError::CategoryMismatch` when the foods belong to
/// different categories.
pub fn convert(source: &Food, amount_g: f64, target: &Food) -> EngineResult<Conversion> {
    if !amount_g.is_finite() || amount_g <= 0.0 {
        return Err(EngineError::invalid_input(
            "conversion amount must be a positive number of grams",
        ));
    }
    if source.equivalence_category != target.equivalence_category {
        return Err(EngineError::CategoryMismatch {
            source_category: source.equivalence_category,
            target: target.equivalence_category,
        });
    }
    if target.is_free() {
        return Ok(Conversion::Unlimited);
    }

    let units = source.units_for_amount(amount_g);
    let per_unit = target.grams_per_unit().ok_or_else(|| {
        // Unreachable after the is_free check; kept as a defensive contract.
        EngineError::invalid_input("target food has no defined unit size")
    })?;
    let raw = units * per_unit;

    let step = target
        .portion_granularity_g
        .unwrap_or(MIN_ROUNDING_STEP_G)
        .max(MIN_ROUNDING_STEP_G);
    let mut rounded = (raw / step).round() * step;
    if rounded <= 0.0 && raw > 0.0 {
        rounded = step;
    }
    // Trim float noise from the step multiplication.
    rounded = (rounded * 10.0).round() / 10.0;

    Ok(Conversion::Amount(rounded))
}

/// Percent caloric difference between a source contribution and a converted
/// target contribution
#[must_use]
pub fn caloric_difference_pct(
    source: &Food,
    source_amount_g: f64,
    target: &Food,
    target_amount_g: f64,
) -> f64 {
    let source_kcal = source.nutrition_for(source_amount_g).calories;
    if source_kcal <= 0.0 {
        return 0.0;
    }
    let target_kcal = target.nutrition_for(target_amount_g).calories;
    (target_kcal - source_kcal).abs() / source_kcal * 100.0
}

/// Whether a proposed substitution stays within the exchange tolerance
///
/// This is the acceptance gate for every substitution, including candidates
/// proposed by external suggestion providers.
#[must_use]
pub fn within_tolerance(
    source: &Food,
    source_amount_g: f64,
    target: &Food,
    target_amount_g: f64,
    band_pct: f64,
) -> bool {
    caloric_difference_pct(source, source_amount_g, target, target_amount_g) <= band_pct
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::models::food::EquivalenceCategory;

    fn fruit(id: &str, portion_g: f64, kcal: f64) -> Food {
        Food {
            id: id.to_owned(),
            name: id.to_owned(),
            equivalence_category: EquivalenceCategory::Fruits,
            portion_description: format!("{portion_g} g"),
            portion_size_g: portion_g,
            calories: kcal,
            protein_g: 0.5,
            carbs_g: kcal / 4.0,
            fat_g: 0.2,
            fiber_g: 2.0,
            micronutrients: std::collections::BTreeMap::new(),
            tags: std::collections::BTreeSet::new(),
            cost_tier: 1,
            portion_granularity_g: None,
        }
    }

    #[test]
    fn conversion_preserves_calories_within_tolerance() {
        let apple = fruit("apple", 100.0, 52.0);
        let banana = fruit("banana", 100.0, 89.0);

        let converted = convert(&apple, 150.0, &banana).unwrap();
        let amount = converted.amount_g().unwrap();

        // 150 g of apple is 78 kcal; the banana amount must match it.
        assert!(within_tolerance(&apple, 150.0, &banana, amount, 5.0));
        assert!((amount - 87.6).abs() < 0.5, "got {amount}");
    }

    #[test]
    fn granularity_rounds_to_half_pieces() {
        let mut egg = fruit("egg", 50.0, 74.0);
        egg.portion_granularity_g = Some(25.0);
        let other = fruit("other", 40.0, 70.0);

        let converted = convert(&other, 60.0, &egg).unwrap();
        let amount = converted.amount_g().unwrap();
        assert!((amount % 25.0).abs() < 1e-9, "got {amount}");
    }

    #[test]
    fn mismatched_categories_are_rejected() {
        let apple = fruit("apple", 100.0, 52.0);
        let mut tortilla = fruit("tortilla", 30.0, 64.0);
        tortilla.equivalence_category = EquivalenceCategory::CerealsNoFat;

        let err = convert(&apple, 100.0, &tortilla).unwrap_err();
        assert!(matches!(err, EngineError::CategoryMismatch { .. }));
    }

    #[test]
    fn free_target_is_unlimited() {
        let mut jamaica = fruit("jamaica", 240.0, 0.0);
        jamaica.equivalence_category = EquivalenceCategory::FreeBeverage;
        let mut tea = fruit("tea", 240.0, 0.0);
        tea.equivalence_category = EquivalenceCategory::FreeBeverage;

        assert_eq!(convert(&tea, 240.0, &jamaica).unwrap(), Conversion::Unlimited);
    }
}
