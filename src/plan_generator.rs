// ABOUTME: Meal plan generation: allocates exchange units across slots and days
// ABOUTME: Day state machine Empty -> Allocating -> Balanced -> Finalized
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

//! Meal Plan Generator
//!
//! Turns a [`NutrientTarget`] plus an [`EquivalenceAllowance`] into a
//! [`WeeklyPlan`]: each day's allowance is distributed across meal slots
//! with a fixed proportional split, foods are selected under the patient's
//! constraints, and the day is verified (and repaired by same-category
//! equivalence swaps) against the per-day tolerance bands before being
//! finalized.
//!
//! Generation is a bounded synchronous computation. Cancellation is checked
//! once per day, so a cancelled request never yields a partially finalized
//! plan.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::FoodCatalog;
use crate::config::EngineConfig;
use crate::equivalence_calculator::{convert, Conversion};
use crate::errors::{EngineError, EngineResult};
use crate::models::food::{EquivalenceCategory, Food, NutrientTotals};
use crate::models::plan::{
    DayMenu, DayState, EquivalenceAllowance, GenerationMetadata, MealItem, MealSlot,
    NutrientTarget, PlanObjective, PlanSource, PlanStatus, SlotKind, WeeklyPlan,
};
use crate::plan_session::CancelFlag;

pub use crate::models::plan::PlanConstraints;

/// Slot shares below this many units are deferred to the day's main meal
/// instead of producing crumb portions
const MIN_SLOT_UNITS: f64 = 0.25;

/// Everything the generator needs to produce a plan
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// Patient the plan is for
    pub patient_id: String,
    /// First day covered by the plan
    pub start_date: chrono::NaiveDate,
    /// Objective the target was resolved for
    pub objective: PlanObjective,
    /// Daily nutrient target
    pub target: NutrientTarget,
    /// Daily exchange allowance
    pub allowance: EquivalenceAllowance,
    /// Patient constraints
    pub constraints: PlanConstraints,
    /// Number of days to generate (1-31)
    pub days: u32,
}

/// Meal plan generator over an injected catalog
#[derive(Debug, Clone)]
pub struct PlanGenerator {
    catalog: Arc<FoodCatalog>,
    config: EngineConfig,
}

/// Internal per-day builder enforcing the day state machine
struct DayBuilder {
    day_index: u32,
    state: DayState,
    slots: Vec<MealSlot>,
}

impl DayBuilder {
    const fn new(day_index: u32) -> Self {
        Self {
            day_index,
            state: DayState::Empty,
            slots: Vec::new(),
        }
    }

    fn totals(&self) -> NutrientTotals {
        let mut totals = NutrientTotals::default();
        for slot in &self.slots {
            totals.add(&slot.totals());
        }
        totals
    }

    fn finalize(mut self) -> DayMenu {
        self.state = DayState::Finalized;
        for slot in &mut self.slots {
            slot.calories = slot.totals().calories;
        }
        let menu = DayMenu {
            day_index: self.day_index,
            state: self.state,
            totals: NutrientTotals::default(),
            slots: self.slots,
        };
        DayMenu {
            totals: menu.computed_totals(),
            ..menu
        }
    }
}

impl PlanGenerator {
    /// Create a generator over a shared catalog with the given configuration
    #[must_use]
    pub const fn new(catalog: Arc<FoodCatalog>, config: EngineConfig) -> Self {
        Self { catalog, config }
    }

    /// The generator's configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The catalog the generator selects from
    #[must_use]
    pub fn catalog(&self) -> &FoodCatalog {
        &self.catalog
    }

    /// Generate a complete plan for the request
    ///
    /// An allowance whose nominal calories fall outside the configured band
    /// of the target is rescaled onto the target (recorded in the plan's
    /// optimization flags) rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` for an invalid request,
    /// `EngineError::InfeasibleAllowance` when a category cannot be filled
    /// under the constraints, and `EngineError::Cancelled` when the cancel
    /// flag is raised between days.
    pub fn generate(&self, request: &PlanRequest, cancel: &CancelFlag) -> EngineResult<WeeklyPlan> {
        self.validate_request(request)?;

        let mut flags = Vec::new();
        let allowance = self.effective_allowance(request, &mut flags);

        let mut days = Vec::with_capacity(request.days as usize);
        let mut warnings = Vec::new();
        for day_index in 1..=request.days {
            if cancel.is_cancelled() {
                debug!(day_index, "generation cancelled between days");
                return Err(EngineError::Cancelled);
            }
            let (menu, mut day_warnings) = self.generate_day(
                &request.target,
                &allowance,
                &request.constraints,
                day_index,
            )?;
            warnings.append(&mut day_warnings);
            days.push(menu);
        }

        let plan = WeeklyPlan {
            id: Uuid::new_v4(),
            patient_id: request.patient_id.clone(),
            start_date: request.start_date,
            end_date: request.start_date + Duration::days(i64::from(request.days) - 1),
            objective: request.objective,
            target: request.target,
            allowance,
            constraints: request.constraints.clone(),
            days,
            metadata: GenerationMetadata {
                source: PlanSource::Generated,
                optimization_flags: flags,
                warnings,
            },
            status: PlanStatus::Active,
            adherence: Vec::new(),
            adjustments: Vec::new(),
        };
        info!(
            plan_id = %plan.id,
            days = plan.days.len(),
            kcal_target = plan.target.calories_total,
            warnings = plan.metadata.warnings.len(),
            "plan generated"
        );
        Ok(plan)
    }

    /// Generate a single finalized day against an in-band allowance
    ///
    /// Used by [`generate`](Self::generate) and by the adjuster when it
    /// regenerates the remaining days of an existing plan. Returns the menu
    /// together with any best-effort warnings produced while balancing.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InfeasibleAllowance` when a category has no
    /// admissible foods and no declared cross-substitution target can
    /// absorb its units.
    pub fn generate_day(
        &self,
        target: &NutrientTarget,
        allowance: &EquivalenceAllowance,
        constraints: &PlanConstraints,
        day_index: u32,
    ) -> EngineResult<(DayMenu, Vec<String>)> {
        let mut builder = DayBuilder::new(day_index);
        builder.state = DayState::Allocating;

        let candidates = self.candidate_table(allowance, constraints, day_index)?;
        self.allocate(&mut builder, &candidates, day_index);

        builder.state = DayState::Balanced;
        let warnings = self.balance(&mut builder, target, &candidates);

        Ok((builder.finalize(), warnings))
    }

    fn validate_request(&self, request: &PlanRequest) -> EngineResult<()> {
        if request.days == 0 || request.days > 31 {
            return Err(EngineError::invalid_input(
                "plan length must be between 1 and 31 days",
            ));
        }
        if request.target.calories_total <= 0.0 {
            return Err(EngineError::invalid_input(
                "target calories must be positive",
            ));
        }
        if request.allowance.units.is_empty() {
            return Err(EngineError::invalid_input("allowance must not be empty"));
        }
        self.config.slots.validate()
    }

    fn effective_allowance(
        &self,
        request: &PlanRequest,
        flags: &mut Vec<String>,
    ) -> EquivalenceAllowance {
        let band = self.config.tolerances.allowance_band_pct;
        if request.allowance.is_within(request.target.calories_total, band) {
            request.allowance.clone()
        } else {
            let scaled = request.allowance.scaled_to(request.target.calories_total);
            debug!(
                from = request.allowance.total_calories(),
                to = scaled.total_calories(),
                "allowance rescaled onto the calorie target"
            );
            flags.push(format!(
                "allowance_rescaled: {:.0} kcal -> {:.0} kcal",
                request.allowance.total_calories(),
                request.target.calories_total
            ));
            scaled
        }
    }

    /// Resolve the admissible candidate foods per category, applying
    /// cross-substitution when a category has none
    ///
    /// Returns the effective allowance keyed by the categories that will
    /// actually be allocated, each with its sorted candidate list.
    fn candidate_table<'a>(
        &'a self,
        allowance: &EquivalenceAllowance,
        constraints: &PlanConstraints,
        day_index: u32,
    ) -> EngineResult<BTreeMap<EquivalenceCategory, (f64, Vec<&'a Food>)>> {
        let mut table: BTreeMap<EquivalenceCategory, (f64, Vec<&Food>)> = BTreeMap::new();

        for (&category, &units) in &allowance.units {
            if units <= 1e-9 {
                continue;
            }
            let candidates = self.admissible(category, constraints);
            if candidates.is_empty() {
                // Redistribute into a declared cross-substitution category,
                // preserving nominal calories.
                let substitute = category
                    .substitution_targets()
                    .iter()
                    .copied()
                    .find(|sub| !self.admissible(*sub, constraints).is_empty());
                match substitute {
                    Some(sub) => {
                        let from_kcal = category.unit_profile().calories;
                        let to_kcal = sub.unit_profile().calories;
                        let converted_units = if to_kcal > 0.0 {
                            units * from_kcal / to_kcal
                        } else {
                            units
                        };
                        debug!(
                            %category,
                            substitute = %sub,
                            units,
                            converted_units,
                            "category redistributed to cross-substitution target"
                        );
                        let entry = table
                            .entry(sub)
                            .or_insert_with(|| (0.0, self.admissible(sub, constraints)));
                        entry.0 += converted_units;
                    }
                    None => {
                        return Err(EngineError::InfeasibleAllowance {
                            category,
                            day_index,
                            slot: None,
                            reason: "no admissible foods under the active constraints".to_owned(),
                        });
                    }
                }
            } else {
                let entry = table.entry(category).or_insert_with(|| (0.0, candidates));
                entry.0 += units;
            }
        }
        Ok(table)
    }

    /// Admissible foods of a category, ordered by the selection policy:
    /// preferred (traditional, in-season) first, then lower cost tier,
    /// higher fiber, stable catalog order
    fn admissible(
        &self,
        category: EquivalenceCategory,
        constraints: &PlanConstraints,
    ) -> Vec<&Food> {
        let mut foods: Vec<(usize, &Food)> = self
            .catalog
            .iter()
            .enumerate()
            .filter(|(_, f)| f.equivalence_category == category)
            .filter(|(_, f)| constraints.admits(f))
            .filter(|(_, f)| constraints.in_season(f))
            .collect();
        foods.sort_by(|(idx_a, a), (idx_b, b)| {
            let pref_a = constraints.prefer_traditional && a.is_traditional();
            let pref_b = constraints.prefer_traditional && b.is_traditional();
            pref_b
                .cmp(&pref_a)
                .then(a.cost_tier.cmp(&b.cost_tier))
                .then(
                    b.fiber_g
                        .partial_cmp(&a.fiber_g)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(idx_a.cmp(idx_b))
        });
        foods.into_iter().map(|(_, f)| f).collect()
    }

    /// Distribute each category's units across the slots with the fixed
    /// proportional split; crumb shares are deferred to the main meal
    fn allocate(
        &self,
        builder: &mut DayBuilder,
        candidates: &BTreeMap<EquivalenceCategory, (f64, Vec<&Food>)>,
        day_index: u32,
    ) {
        // Per-slot unit shares per category.
        let mut slot_units: BTreeMap<EquivalenceCategory, [f64; 5]> = BTreeMap::new();
        for (&category, entry) in candidates {
            let total_units = entry.0;
            let mut shares = [0.0_f64; 5];
            let mut deferred = 0.0;
            for (slot_idx, slot) in SlotKind::ALL.iter().enumerate() {
                let share = total_units * self.config.slots.fraction_for(*slot);
                if share < MIN_SLOT_UNITS && *slot != SlotKind::Lunch {
                    deferred += share;
                } else {
                    shares[slot_idx] = share;
                }
            }
            // Lunch is the largest share by configuration; it absorbs crumbs.
            shares[2] += deferred;
            slot_units.insert(category, shares);
        }

        for (slot_idx, slot_kind) in SlotKind::ALL.iter().enumerate() {
            let mut items = Vec::new();
            for (&category, entry) in candidates {
                let foods = &entry.1;
                let units = slot_units[&category][slot_idx];
                if units <= 1e-9 {
                    continue;
                }
                // Rotate the pick by day for menu variety; deterministic for
                // a given (day, category).
                let food = foods[(day_index as usize - 1) % foods.len()];
                items.push(Self::item_for(food, units));
            }
            let totals: f64 = items.iter().map(|i: &MealItem| i.nutrition.calories).sum();
            builder.slots.push(MealSlot {
                kind: *slot_kind,
                recommended_time: slot_kind.recommended_time().to_owned(),
                items,
                calories: totals,
            });
        }
    }

    /// Build a meal item consuming `units` exchange units of `food`
    fn item_for(food: &Food, units: f64) -> MealItem {
        let quantity_g = food.grams_per_unit().map_or_else(
            // Free foods: one defined portion per unit.
            || units * food.portion_size_g,
            |per_unit| units * per_unit,
        );
        let step = food.portion_granularity_g.unwrap_or(0.1).max(0.1);
        let mut rounded = (quantity_g / step).round() * step;
        if rounded <= 0.0 && quantity_g > 0.0 {
            rounded = step;
        }
        rounded = (rounded * 10.0).round() / 10.0;
        MealItem {
            food_id: food.id.clone(),
            food_name: food.name.clone(),
            category: food.equivalence_category,
            quantity_g: rounded,
            units,
            nutrition: food.nutrition_for(rounded),
        }
    }

    /// Verify the day against the per-day bands and repair numeric drift by
    /// same-category swaps; residual deviation degrades to warnings
    fn balance(
        &self,
        builder: &mut DayBuilder,
        target: &NutrientTarget,
        candidates: &BTreeMap<EquivalenceCategory, (f64, Vec<&Food>)>,
    ) -> Vec<String> {
        let mut warnings = Vec::new();
        for _pass in 0..self.config.balancing.max_swap_passes {
            if self.day_deviation(&builder.totals(), target) <= 0.0 {
                break;
            }
            if !self.try_best_swap(builder, target, candidates) {
                break;
            }
        }

        let totals = builder.totals();
        let deviation = self.day_deviation(&totals, target);
        if deviation > 0.0 {
            let message = format!(
                "day {} left outside tolerance after balancing: {:.0} kcal (target {:.0}), P {:.0} g / C {:.0} g / F {:.0} g",
                builder.day_index,
                totals.calories,
                target.calories_total,
                totals.protein_g,
                totals.carbs_g,
                totals.fat_g,
            );
            warn!(day_index = builder.day_index, %message, "best-effort day");
            warnings.push(message);
        }
        warnings
    }

    /// Excess relative deviation beyond the configured bands (0.0 when the
    /// day is inside every band)
    fn day_deviation(&self, totals: &NutrientTotals, target: &NutrientTarget) -> f64 {
        let cal_band = self.config.tolerances.calorie_band_pct / 100.0;
        let macro_band = self.config.tolerances.macro_band_pct / 100.0;
        let mut excess = 0.0;

        let cal_dev = (totals.calories - target.calories_total).abs() / target.calories_total;
        excess += (cal_dev - cal_band).max(0.0);

        for (actual, wanted) in [
            (totals.protein_g, target.protein_g),
            (totals.carbs_g, target.carbs_g),
            (totals.fat_g, target.fat_g),
        ] {
            if wanted > 0.0 {
                let dev = (actual - wanted).abs() / wanted;
                excess += (dev - macro_band).max(0.0);
            }
        }
        excess
    }

    /// Try the single same-category swap that most reduces the day's excess
    /// deviation; returns false when no swap improves the day
    fn try_best_swap(
        &self,
        builder: &mut DayBuilder,
        target: &NutrientTarget,
        candidates: &BTreeMap<EquivalenceCategory, (f64, Vec<&Food>)>,
    ) -> bool {
        let current_totals = builder.totals();
        let current_score = self.day_deviation(&current_totals, target);
        let mut best: Option<(usize, usize, MealItem, f64)> = None;

        for (slot_idx, slot) in builder.slots.iter().enumerate() {
            for (item_idx, item) in slot.items.iter().enumerate() {
                let Some((_, foods)) = candidates.get(&item.category) else {
                    continue;
                };
                let Some(source) = self.catalog.get(&item.food_id) else {
                    continue;
                };
                for candidate in foods {
                    if candidate.id == item.food_id || candidate.is_free() {
                        continue;
                    }
                    let Ok(Conversion::Amount(amount)) =
                        convert(source, item.quantity_g, candidate)
                    else {
                        continue;
                    };
                    let replacement = MealItem {
                        food_id: candidate.id.clone(),
                        food_name: candidate.name.clone(),
                        category: candidate.equivalence_category,
                        quantity_g: amount,
                        units: item.units,
                        nutrition: candidate.nutrition_for(amount),
                    };
                    let mut trial = current_totals;
                    trial.calories += replacement.nutrition.calories - item.nutrition.calories;
                    trial.protein_g += replacement.nutrition.protein_g - item.nutrition.protein_g;
                    trial.carbs_g += replacement.nutrition.carbs_g - item.nutrition.carbs_g;
                    trial.fat_g += replacement.nutrition.fat_g - item.nutrition.fat_g;
                    trial.fiber_g += replacement.nutrition.fiber_g - item.nutrition.fiber_g;
                    let score = self.day_deviation(&trial, target);
                    if score < best.as_ref().map_or(current_score, |(_, _, _, s)| *s) {
                        best = Some((slot_idx, item_idx, replacement, score));
                    }
                }
            }
        }

        match best {
            Some((slot_idx, item_idx, replacement, score)) => {
                debug!(
                    day_index = builder.day_index,
                    slot = %builder.slots[slot_idx].kind,
                    from = %builder.slots[slot_idx].items[item_idx].food_id,
                    to = %replacement.food_id,
                    score,
                    "balancing swap applied"
                );
                builder.slots[slot_idx].items[item_idx] = replacement;
                true
            }
            None => false,
        }
    }
}
