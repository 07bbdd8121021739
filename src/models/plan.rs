// ABOUTME: Plan-side models: targets, allowances, day menus, the WeeklyPlan aggregate
// ABOUTME: WeeklyPlan owns its days and append-only adjustment log exclusively
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

//! Meal-plan models
//!
//! [`WeeklyPlan`] is the aggregate root: it exclusively owns its
//! [`DayMenu`]s and its adjustment log. Finalized days are never mutated in
//! place; the only mutation path is [`WeeklyPlan::replace_day`], which
//! re-validates the aggregate invariants and appends an [`Adjustment`]
//! record. The adjustment log is append-only, an audit trail of how the plan
//! evolved.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ToleranceConfig;
use crate::errors::{EngineError, EngineResult};
use crate::models::food::{EquivalenceCategory, Food, NutrientTotals};

/// Daily caloric and macronutrient targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientTarget {
    /// Total daily calories (kcal)
    pub calories_total: f64,
    /// Protein target (grams)
    pub protein_g: f64,
    /// Protein share of calories (percent)
    pub protein_pct: f64,
    /// Carbohydrate target (grams)
    pub carbs_g: f64,
    /// Carbohydrate share of calories (percent)
    pub carbs_pct: f64,
    /// Fat target (grams)
    pub fat_g: f64,
    /// Fat share of calories (percent)
    pub fat_pct: f64,
    /// Minimum fiber (grams)
    pub fiber_g: f64,
}

impl NutrientTarget {
    /// Macro targets as plain nutrient totals
    #[must_use]
    pub const fn as_totals(&self) -> NutrientTotals {
        NutrientTotals {
            calories: self.calories_total,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
            fiber_g: self.fiber_g,
        }
    }

    /// Copy of this target rescaled onto a different calorie total,
    /// preserving the macro split
    #[must_use]
    pub fn rescaled_to(&self, calories_total: f64) -> Self {
        let scale = calories_total / self.calories_total;
        Self {
            calories_total,
            protein_g: self.protein_g * scale,
            carbs_g: self.carbs_g * scale,
            fat_g: self.fat_g * scale,
            fiber_g: self.fiber_g * scale,
            ..*self
        }
    }
}

/// Daily exchange-unit allowance per equivalence category
///
/// Invariant: the allowance's nominal calories stay within the configured
/// band of the plan's calorie target ([`EquivalenceAllowance::is_within`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceAllowance {
    /// Unit count per category (fractional units allowed)
    pub units: BTreeMap<EquivalenceCategory, f64>,
}

impl EquivalenceAllowance {
    /// Empty allowance
    #[must_use]
    pub const fn new() -> Self {
        Self {
            units: BTreeMap::new(),
        }
    }

    /// Set the unit count for a category (builder-style)
    #[must_use]
    pub fn with(mut self, category: EquivalenceCategory, units: f64) -> Self {
        self.units.insert(category, units);
        self
    }

    /// Unit count for a category (0 when absent)
    #[must_use]
    pub fn get(&self, category: EquivalenceCategory) -> f64 {
        self.units.get(&category).copied().unwrap_or(0.0)
    }

    /// Nominal calories represented by the whole allowance
    #[must_use]
    pub fn total_calories(&self) -> f64 {
        self.units
            .iter()
            .map(|(cat, units)| cat.unit_profile().calories * units)
            .sum()
    }

    /// Nominal nutrient totals represented by the whole allowance
    #[must_use]
    pub fn nominal_totals(&self) -> NutrientTotals {
        let mut totals = NutrientTotals::default();
        for (cat, units) in &self.units {
            let p = cat.unit_profile();
            totals.add(&NutrientTotals {
                calories: p.calories * units,
                protein_g: p.protein_g * units,
                carbs_g: p.carbs_g * units,
                fat_g: p.fat_g * units,
                fiber_g: p.fiber_g * units,
            });
        }
        totals
    }

    /// Whether the allowance's nominal calories are within `band_pct`
    /// percent of `calories_total`
    #[must_use]
    pub fn is_within(&self, calories_total: f64, band_pct: f64) -> bool {
        if calories_total <= 0.0 {
            return false;
        }
        let deviation = (self.total_calories() - calories_total).abs() / calories_total;
        deviation <= band_pct / 100.0
    }

    /// Copy of this allowance with every unit count rescaled so the nominal
    /// calorie total matches `calories_total`
    ///
    /// Categories with zero nominal calories (free beverages) keep their
    /// unit counts unchanged. An empty or zero-calorie allowance is
    /// returned as-is.
    #[must_use]
    pub fn scaled_to(&self, calories_total: f64) -> Self {
        let current = self.total_calories();
        if current <= 0.0 {
            return self.clone();
        }
        let scale = calories_total / current;
        let units = self
            .units
            .iter()
            .map(|(cat, count)| {
                let scaled = if cat.is_free() { *count } else { count * scale };
                (*cat, scaled)
            })
            .collect();
        Self { units }
    }

    /// Derive an allowance approximating a nutrient target
    ///
    /// Deterministic waterfall: a fixed vegetable/fruit/legume base, then
    /// cereals to cover remaining carbohydrates, lean protein to cover
    /// remaining protein, pure fats to cover remaining fat, and a final
    /// rescale onto the calorie target.
    #[must_use]
    pub fn for_target(target: &NutrientTarget) -> Self {
        use EquivalenceCategory as Cat;

        let mut allowance = Self::new()
            .with(Cat::Vegetables, 4.0)
            .with(Cat::Fruits, 3.0)
            .with(Cat::Legumes, 1.0);

        let base = allowance.nominal_totals();
        let cereal_units =
            ((target.carbs_g - base.carbs_g) / Cat::CerealsNoFat.unit_profile().carbs_g)
                .round()
                .max(0.0);
        allowance = allowance.with(Cat::CerealsNoFat, cereal_units);

        let after_cereals = allowance.nominal_totals();
        let lean_units = ((target.protein_g - after_cereals.protein_g)
            / Cat::LeanProteinLow.unit_profile().protein_g)
            .round()
            .max(0.0);
        allowance = allowance.with(Cat::LeanProteinLow, lean_units);

        let after_lean = allowance.nominal_totals();
        let fat_units = ((target.fat_g - after_lean.fat_g) / Cat::FatsPure.unit_profile().fat_g)
            .round()
            .max(0.0);
        allowance = allowance.with(Cat::FatsPure, fat_units);

        allowance.scaled_to(target.calories_total)
    }
}

/// Patient constraints a plan is generated (and regenerated) under
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConstraints {
    /// Tags, allergens or food ids that must not appear in the plan
    #[serde(default)]
    pub avoid: BTreeSet<String>,
    /// Prefer foods flagged traditional
    #[serde(default)]
    pub prefer_traditional: bool,
    /// Prefer foods in season
    #[serde(default)]
    pub respect_season: bool,
    /// Current season tag ("summer", "winter") when `respect_season` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    /// Exclude foods above this cost tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost_tier: Option<u8>,
}

impl PlanConstraints {
    /// Whether a food passes the avoid-list and budget filters
    #[must_use]
    pub fn admits(&self, food: &Food) -> bool {
        if self.avoid.iter().any(|a| {
            food.id.eq_ignore_ascii_case(a) || food.has_tag(a) || food.name.eq_ignore_ascii_case(a)
        }) {
            return false;
        }
        if let Some(max_tier) = self.max_cost_tier {
            if food.cost_tier > max_tier {
                return false;
            }
        }
        true
    }

    /// Whether a food is in season under these constraints
    ///
    /// Foods carrying no season tag are treated as available year-round.
    #[must_use]
    pub fn in_season(&self, food: &Food) -> bool {
        match (&self.season, self.respect_season) {
            (Some(season), true) => {
                let has_any_season = food.has_tag("summer") || food.has_tag("winter");
                !has_any_season || food.has_tag(season)
            }
            _ => true,
        }
    }
}

/// Meal slot labels across a day
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SlotKind {
    /// First meal of the day
    Breakfast,
    /// Mid-morning snack
    #[serde(rename = "snack-1")]
    MorningSnack,
    /// Main meal
    Lunch,
    /// Afternoon snack
    #[serde(rename = "snack-2")]
    AfternoonSnack,
    /// Last meal of the day
    Dinner,
}

impl SlotKind {
    /// Every slot in day order
    pub const ALL: [Self; 5] = [
        Self::Breakfast,
        Self::MorningSnack,
        Self::Lunch,
        Self::AfternoonSnack,
        Self::Dinner,
    ];

    /// Customary meal time for this slot
    #[must_use]
    pub const fn recommended_time(self) -> &'static str {
        match self {
            Self::Breakfast => "08:00",
            Self::MorningSnack => "11:00",
            Self::Lunch => "14:00",
            Self::AfternoonSnack => "17:00",
            Self::Dinner => "20:00",
        }
    }

    /// Slot label as serialized
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::MorningSnack => "snack-1",
            Self::Lunch => "lunch",
            Self::AfternoonSnack => "snack-2",
            Self::Dinner => "dinner",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A food placed in a meal slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealItem {
    /// Catalog id of the food
    pub food_id: String,
    /// Food name at generation time
    pub food_name: String,
    /// Category the units are drawn from
    pub category: EquivalenceCategory,
    /// Quantity in grams
    pub quantity_g: f64,
    /// Exchange units this item consumes
    pub units: f64,
    /// Nutrient contribution of the quantity
    pub nutrition: NutrientTotals,
}

/// One meal slot of a day menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSlot {
    /// Slot label
    pub kind: SlotKind,
    /// Recommended time ("HH:MM")
    pub recommended_time: String,
    /// Foods in this slot
    pub items: Vec<MealItem>,
    /// Calories for the slot (derived from items)
    pub calories: f64,
}

impl MealSlot {
    /// Recompute nutrient totals from the items
    #[must_use]
    pub fn totals(&self) -> NutrientTotals {
        let mut totals = NutrientTotals::default();
        for item in &self.items {
            totals.add(&item.nutrition);
        }
        totals
    }
}

/// Lifecycle state of a day menu
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayState {
    /// No allocation yet
    Empty,
    /// Units are being distributed across slots
    Allocating,
    /// Allocation verified (or repaired) against the per-day target
    Balanced,
    /// Immutable; further changes require an Adjustment
    Finalized,
}

/// A single day of the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayMenu {
    /// 1-based day index within the plan
    pub day_index: u32,
    /// Lifecycle state (always `Finalized` once owned by a plan)
    pub state: DayState,
    /// Ordered meal slots
    pub slots: Vec<MealSlot>,
    /// Daily totals (derived; must equal the slot sums within rounding)
    pub totals: NutrientTotals,
}

impl DayMenu {
    /// Recompute daily totals from the slots
    #[must_use]
    pub fn computed_totals(&self) -> NutrientTotals {
        let mut totals = NutrientTotals::default();
        for slot in &self.slots {
            totals.add(&slot.totals());
        }
        totals
    }

    /// Check the derived-totals invariant (slot sums match cached totals
    /// within rounding tolerance)
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanInvariantViolation` naming the drifted
    /// quantity.
    pub fn validate_totals(&self) -> EngineResult<()> {
        let computed = self.computed_totals();
        if (computed.calories - self.totals.calories).abs() > 0.5 {
            return Err(EngineError::invariant_violation(format!(
                "day {} calories_total {:.1} does not match slot sum {:.1}",
                self.day_index, self.totals.calories, computed.calories
            )));
        }
        for slot in &self.slots {
            let slot_computed = slot.totals().calories;
            if (slot_computed - slot.calories).abs() > 0.5 {
                return Err(EngineError::invariant_violation(format!(
                    "day {} slot {} calories {:.1} do not match item sum {:.1}",
                    self.day_index, slot.kind, slot.calories, slot_computed
                )));
            }
        }
        Ok(())
    }
}

/// Patient objective driving the caloric adjustment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PlanObjective {
    /// Caloric deficit for weight reduction
    WeightReduction,
    /// Caloric balance
    Maintenance,
    /// Caloric surplus for weight gain
    WeightGain,
    /// Athletic objective with a caller-supplied TDEE multiplier
    Athletic {
        /// Multiplier applied to TDEE (e.g. 1.10)
        multiplier: f64,
    },
    /// Therapeutic objective with a prescriber-supplied multiplier
    Therapeutic {
        /// Multiplier applied to TDEE
        multiplier: f64,
    },
}

/// How a plan came to exist
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// Produced by the generator
    Generated,
    /// Authored by a nutritionist
    Manual,
}

/// Plan lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// In use
    Active,
    /// Replaced by a newer plan
    Superseded,
    /// Date range elapsed
    Retired,
}

/// Generation metadata carried by the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Generated vs. manually authored
    pub source: PlanSource,
    /// Optimization decisions taken during generation
    pub optimization_flags: Vec<String>,
    /// Best-effort deviations surfaced instead of failing (see error design)
    pub warnings: Vec<String>,
}

/// Reason an adjustment was applied
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AdjustmentReason {
    /// Rolling adherence fell below the configured threshold
    LowAdherence,
    /// The nutrient target changed
    TargetChanged,
    /// A planned ingredient became unavailable
    IngredientUnavailable,
    /// Nutritionist-supplied replacement accepted after re-validation
    ManualOverride,
}

/// An entry in the plan's append-only adjustment log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    /// When the adjustment was committed
    pub timestamp: DateTime<Utc>,
    /// Why the plan changed
    pub reason: AdjustmentReason,
    /// 1-based indices of the day menus that were replaced
    pub changed_days: Vec<u32>,
    /// Free-form context (provider rationale, operator note)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Planned-vs-actual record for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdherenceRecord {
    /// 1-based day index
    pub day_index: u32,
    /// Planned totals for the day
    pub planned: NutrientTotals,
    /// Actual logged totals
    pub actual: NutrientTotals,
    /// Compliance fraction in [0, 1]
    pub compliance: f64,
    /// Planned items with no logged counterpart
    pub missing_items: Vec<String>,
    /// Logged items that were not planned
    pub extra_items: Vec<String>,
}

/// The plan aggregate root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPlan {
    /// Plan id
    pub id: Uuid,
    /// Patient the plan belongs to
    pub patient_id: String,
    /// First day covered
    pub start_date: NaiveDate,
    /// Last day covered (inclusive)
    pub end_date: NaiveDate,
    /// Objective the target was resolved for
    pub objective: PlanObjective,
    /// Daily nutrient target
    pub target: NutrientTarget,
    /// Daily exchange allowance
    pub allowance: EquivalenceAllowance,
    /// Constraints the plan was generated under (reused on regeneration)
    #[serde(default)]
    pub constraints: PlanConstraints,
    /// Day menus, ordered by day index
    pub days: Vec<DayMenu>,
    /// Generation metadata
    pub metadata: GenerationMetadata,
    /// Lifecycle status
    pub status: PlanStatus,
    /// Adherence records, in recording order
    pub adherence: Vec<AdherenceRecord>,
    /// Append-only adjustment log
    pub adjustments: Vec<Adjustment>,
}

impl WeeklyPlan {
    /// Day menu by 1-based index
    #[must_use]
    pub fn day(&self, day_index: u32) -> Option<&DayMenu> {
        self.days.iter().find(|d| d.day_index == day_index)
    }

    /// Adherence record for a day, if recorded
    #[must_use]
    pub fn adherence_for(&self, day_index: u32) -> Option<&AdherenceRecord> {
        self.adherence.iter().find(|r| r.day_index == day_index)
    }

    /// Validate the aggregate invariants
    ///
    /// Checks every day's derived-totals consistency, each day's calorie
    /// band against the daily target, and the allowance/target calorie
    /// agreement.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanInvariantViolation` naming the first
    /// violated invariant.
    pub fn validate_invariants(&self, tolerances: &ToleranceConfig) -> EngineResult<()> {
        for day in &self.days {
            day.validate_totals()?;
            let band = self.target.calories_total * tolerances.calorie_band_pct / 100.0;
            if (day.totals.calories - self.target.calories_total).abs() > band {
                return Err(EngineError::invariant_violation(format!(
                    "day {} calories {:.0} outside +/-{:.0} of target {:.0}",
                    day.day_index, day.totals.calories, band, self.target.calories_total
                )));
            }
        }
        if !self
            .allowance
            .is_within(self.target.calories_total, tolerances.allowance_band_pct)
        {
            return Err(EngineError::invariant_violation(format!(
                "allowance calories {:.0} outside the {:.0}% band of target {:.0}",
                self.allowance.total_calories(),
                tolerances.allowance_band_pct,
                self.target.calories_total
            )));
        }
        Ok(())
    }

    /// Replace a finalized day menu, recording the change in the adjustment
    /// log
    ///
    /// The single mutation path for day menus: the replacement must carry
    /// the same day index as an existing day, be `Finalized`, and leave the
    /// aggregate invariants intact. On success the old menu is swapped out
    /// atomically and an [`Adjustment`] is appended.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` for an unknown day index or a
    /// non-finalized menu, `EngineError::PlanInvariantViolation` if the
    /// replacement would drift the plan outside tolerance.
    pub fn replace_day(
        &mut self,
        menu: DayMenu,
        reason: AdjustmentReason,
        note: Option<String>,
        tolerances: &ToleranceConfig,
    ) -> EngineResult<()> {
        self.replace_days(vec![menu], reason, note, tolerances)
    }

    /// Replace several finalized day menus under a single adjustment entry
    ///
    /// Same contract as [`replace_day`](Self::replace_day); all replacements
    /// are validated together and committed atomically, so a rejected batch
    /// leaves the plan untouched.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` for an empty batch, an unknown
    /// day index or a non-finalized menu,
    /// `EngineError::PlanInvariantViolation` if the batch would drift the
    /// plan outside tolerance.
    pub fn replace_days(
        &mut self,
        menus: Vec<DayMenu>,
        reason: AdjustmentReason,
        note: Option<String>,
        tolerances: &ToleranceConfig,
    ) -> EngineResult<()> {
        if menus.is_empty() {
            return Err(EngineError::invalid_input(
                "adjustment must replace at least one day",
            ));
        }
        let mut positions = Vec::with_capacity(menus.len());
        for menu in &menus {
            if menu.state != DayState::Finalized {
                return Err(EngineError::invalid_input(
                    "replacement day menus must be finalized",
                ));
            }
            let position = self
                .days
                .iter()
                .position(|d| d.day_index == menu.day_index)
                .ok_or_else(|| {
                    EngineError::invalid_input(format!("plan has no day {}", menu.day_index))
                })?;
            positions.push(position);
        }

        // Validate on a copy so a rejected batch leaves the plan intact.
        let mut candidate = self.clone();
        for (position, menu) in positions.iter().zip(&menus) {
            candidate.days[*position] = menu.clone();
        }
        candidate.validate_invariants(tolerances)?;

        let mut changed_days: Vec<u32> = menus.iter().map(|m| m.day_index).collect();
        changed_days.sort_unstable();
        for (position, menu) in positions.into_iter().zip(menus) {
            self.days[position] = menu;
        }
        self.adjustments.push(Adjustment {
            timestamp: Utc::now(),
            reason,
            changed_days,
            note,
        });
        Ok(())
    }

    /// Mark this plan superseded by a newer one
    pub fn supersede(&mut self) {
        self.status = PlanStatus::Superseded;
    }

    /// Retire the plan once its date range has elapsed
    pub fn retire_if_elapsed(&mut self, today: NaiveDate) {
        if self.status == PlanStatus::Active && today > self.end_date {
            self.status = PlanStatus::Retired;
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    fn target_2000() -> NutrientTarget {
        NutrientTarget {
            calories_total: 2000.0,
            protein_g: 100.0,
            protein_pct: 20.0,
            carbs_g: 250.0,
            carbs_pct: 50.0,
            fat_g: 66.7,
            fat_pct: 30.0,
            fiber_g: 28.0,
        }
    }

    #[test]
    fn allowance_scaling_hits_the_calorie_target() {
        let allowance = EquivalenceAllowance::new()
            .with(EquivalenceCategory::Fruits, 3.0)
            .with(EquivalenceCategory::Vegetables, 4.0)
            .with(EquivalenceCategory::CerealsNoFat, 6.0)
            .with(EquivalenceCategory::LeanProteinLow, 5.0);
        let scaled = allowance.scaled_to(2000.0);
        assert!((scaled.total_calories() - 2000.0).abs() < 0.01);
    }

    #[test]
    fn free_categories_survive_scaling_unchanged() {
        let allowance = EquivalenceAllowance::new()
            .with(EquivalenceCategory::CerealsNoFat, 10.0)
            .with(EquivalenceCategory::FreeBeverage, 2.0);
        let scaled = allowance.scaled_to(1400.0);
        assert!((scaled.get(EquivalenceCategory::FreeBeverage) - 2.0).abs() < f64::EPSILON);
        assert!((scaled.total_calories() - 1400.0).abs() < 0.01);
    }

    #[test]
    fn for_target_lands_within_the_macro_bands() {
        let target = target_2000();
        let allowance = EquivalenceAllowance::for_target(&target);
        let totals = allowance.nominal_totals();

        assert!((totals.calories - 2000.0).abs() < 0.01);
        assert!(
            (totals.protein_g - target.protein_g).abs() <= target.protein_g * 0.10,
            "protein {:.1} vs target {:.1}",
            totals.protein_g,
            target.protein_g
        );
        assert!((totals.carbs_g - target.carbs_g).abs() <= target.carbs_g * 0.10);
        assert!((totals.fat_g - target.fat_g).abs() <= target.fat_g * 0.10);
    }
}
