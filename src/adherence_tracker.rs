// ABOUTME: Records actual vs planned intake and drives bounded auto-adjustment
// ABOUTME: Rolling-window adherence below threshold regenerates the remaining days
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

//! Adherence Tracker & Auto-Adjuster
//!
//! Tracks how closely a patient's logged intake follows the plan. When
//! adherence over the most recent rolling window falls below the configured
//! threshold, the adjuster re-invokes the generator for the remaining days
//! with the calorie target shifted toward recent actual intake (bounded),
//! appending a low-adherence [`Adjustment`]. Recorded days are never
//! mutated. Manual overrides are accepted verbatim but re-validated against
//! the aggregate plan invariants and logged through the same adjustment
//! trail.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::models::food::NutrientTotals;
use crate::models::plan::{
    AdherenceRecord, Adjustment, AdjustmentReason, DayMenu, WeeklyPlan,
};
use crate::plan_generator::PlanGenerator;
use crate::plan_session::CancelFlag;

/// A day of logged intake, as reported by the intake-logging collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActualIntake {
    /// Calories consumed (kcal)
    pub calories: f64,
    /// Protein consumed (grams)
    pub protein_g: f64,
    /// Carbohydrates consumed (grams)
    pub carbs_g: f64,
    /// Fat consumed (grams)
    pub fat_g: f64,
    /// Fiber consumed (grams)
    pub fiber_g: f64,
    /// Names or catalog ids of the foods actually eaten
    #[serde(default)]
    pub items: Vec<String>,
}

impl ActualIntake {
    fn as_totals(&self) -> NutrientTotals {
        NutrientTotals {
            calories: self.calories,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
            fiber_g: self.fiber_g,
        }
    }
}

/// Adherence tracker over the engine configuration
#[derive(Debug, Clone)]
pub struct AdherenceTracker {
    config: EngineConfig,
}

impl AdherenceTracker {
    /// Create a tracker with the given configuration
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Record a day of actual intake against the plan
    ///
    /// Compliance is `1 - |actual - planned| / planned` calories, floored at
    /// zero. Missing/extra item lists come from comparing logged item names
    /// against the planned menu. Each day is recorded at most once.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` for an unknown day index or a day
    /// that already has a record.
    pub fn record_day(
        &self,
        plan: &mut WeeklyPlan,
        day_index: u32,
        actual: &ActualIntake,
    ) -> EngineResult<AdherenceRecord> {
        let day = plan
            .day(day_index)
            .ok_or_else(|| EngineError::invalid_input(format!("plan has no day {day_index}")))?;
        if plan.adherence_for(day_index).is_some() {
            return Err(EngineError::invalid_input(format!(
                "day {day_index} already has an adherence record"
            )));
        }

        let planned = day.totals;
        let compliance = if planned.calories > 0.0 {
            (1.0 - (actual.calories - planned.calories).abs() / planned.calories).max(0.0)
        } else if actual.calories > 0.0 {
            0.0
        } else {
            1.0
        };

        let planned_names: Vec<&str> = day
            .slots
            .iter()
            .flat_map(|slot| slot.items.iter())
            .flat_map(|item| [item.food_id.as_str(), item.food_name.as_str()])
            .collect();
        let missing_items: Vec<String> = day
            .slots
            .iter()
            .flat_map(|slot| slot.items.iter())
            .filter(|item| {
                !actual.items.iter().any(|logged| {
                    logged.eq_ignore_ascii_case(&item.food_id)
                        || logged.eq_ignore_ascii_case(&item.food_name)
                })
            })
            .map(|item| item.food_name.clone())
            .collect();
        let extra_items: Vec<String> = actual
            .items
            .iter()
            .filter(|logged| {
                !planned_names
                    .iter()
                    .any(|planned| planned.eq_ignore_ascii_case(logged))
            })
            .cloned()
            .collect();

        let record = AdherenceRecord {
            day_index,
            planned,
            actual: actual.as_totals(),
            compliance,
            missing_items,
            extra_items,
        };
        plan.adherence.push(record.clone());
        Ok(record)
    }

    /// Mean compliance over all recorded days, as a percentage in [0, 100]
    ///
    /// A plan with no recorded days reports 100: there is no observed
    /// deviation yet.
    #[must_use]
    pub fn adherence_percentage(&self, plan: &WeeklyPlan) -> f64 {
        if plan.adherence.is_empty() {
            return 100.0;
        }
        let mean: f64 = plan.adherence.iter().map(|r| r.compliance).sum::<f64>()
            / plan.adherence.len() as f64;
        (mean * 100.0).clamp(0.0, 100.0)
    }

    /// Mean compliance over the most recent rolling window, if enough days
    /// are recorded
    #[must_use]
    pub fn rolling_adherence_pct(&self, plan: &WeeklyPlan) -> Option<f64> {
        let window = self.config.adherence.window_days;
        if plan.adherence.len() < window {
            return None;
        }
        let tail = &plan.adherence[plan.adherence.len() - window..];
        let mean = tail.iter().map(|r| r.compliance).sum::<f64>() / window as f64;
        Some((mean * 100.0).clamp(0.0, 100.0))
    }

    /// Auto-adjust the plan when rolling adherence falls below the threshold
    ///
    /// Regenerates every day after the last recorded one with the calorie
    /// target shifted toward the window's mean actual intake, bounded by the
    /// configured maximum shift. The new menus, the shifted target and the
    /// rescaled allowance are committed together with a single low-adherence
    /// adjustment entry. Recorded days are untouched. A generator failure
    /// degrades to keeping the current plan and surfacing a warning.
    ///
    /// Returns the appended adjustment, or `None` when no adjustment was
    /// needed or possible.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Cancelled` when the cancel flag is raised
    /// mid-regeneration; the plan is left unchanged in that case.
    pub fn maybe_auto_adjust(
        &self,
        plan: &mut WeeklyPlan,
        generator: &PlanGenerator,
        cancel: &CancelFlag,
    ) -> EngineResult<Option<Adjustment>> {
        let Some(rolling) = self.rolling_adherence_pct(plan) else {
            return Ok(None);
        };
        if rolling >= self.config.adherence.low_adherence_threshold_pct {
            return Ok(None);
        }

        let last_recorded = plan
            .adherence
            .iter()
            .map(|r| r.day_index)
            .max()
            .unwrap_or(0);
        let remaining: Vec<u32> = plan
            .days
            .iter()
            .map(|d| d.day_index)
            .filter(|idx| *idx > last_recorded)
            .collect();
        if remaining.is_empty() {
            warn!(plan_id = %plan.id, rolling, "low adherence but no remaining days to adjust");
            return Ok(None);
        }

        // Shift the daily target toward what the patient actually eats,
        // bounded so the plan stays clinically anchored.
        let window = self.config.adherence.window_days;
        let tail = &plan.adherence[plan.adherence.len() - window..];
        let mean_actual =
            tail.iter().map(|r| r.actual.calories).sum::<f64>() / window as f64;
        let max_shift = self.config.adherence.max_target_shift_pct / 100.0;
        let original = plan.target.calories_total;
        let shifted = mean_actual.clamp(original * (1.0 - max_shift), original * (1.0 + max_shift));
        let new_target = plan.target.rescaled_to(shifted.round());
        let new_allowance = plan.allowance.scaled_to(new_target.calories_total);

        let mut menus = Vec::with_capacity(remaining.len());
        let mut day_warnings = Vec::new();
        for day_index in &remaining {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            match generator.generate_day(&new_target, &new_allowance, &plan.constraints, *day_index)
            {
                Ok((menu, mut warnings)) => {
                    day_warnings.append(&mut warnings);
                    menus.push(menu);
                }
                Err(err) => {
                    // Best effort: a plan with a flagged deviation beats none.
                    let message = format!(
                        "auto-adjustment abandoned, keeping current plan: {err}"
                    );
                    warn!(plan_id = %plan.id, %message, "auto-adjust degraded");
                    plan.metadata.warnings.push(message);
                    return Ok(None);
                }
            }
        }

        // Commit atomically: target, allowance, menus and the audit entry.
        plan.target = new_target;
        plan.allowance = new_allowance;
        for menu in menus {
            if let Some(slot) = plan.days.iter_mut().find(|d| d.day_index == menu.day_index) {
                *slot = menu;
            }
        }
        plan.metadata.warnings.extend(day_warnings);
        let adjustment = Adjustment {
            timestamp: Utc::now(),
            reason: AdjustmentReason::LowAdherence,
            changed_days: remaining,
            note: Some(format!(
                "rolling adherence {rolling:.0}% below {:.0}%; daily target {original:.0} -> {:.0} kcal",
                self.config.adherence.low_adherence_threshold_pct, new_target.calories_total
            )),
        };
        plan.adjustments.push(adjustment.clone());
        info!(
            plan_id = %plan.id,
            rolling,
            changed_days = adjustment.changed_days.len(),
            "low-adherence adjustment committed"
        );
        Ok(Some(adjustment))
    }

    /// Accept a nutritionist-supplied replacement for one day
    ///
    /// The menu is taken verbatim but the aggregate plan invariants are
    /// re-validated before acceptance, and the change is recorded as a
    /// manual-override adjustment.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanInvariantViolation` if the override drifts
    /// the plan outside tolerance, `EngineError::InvalidInput` for an
    /// unknown day or non-finalized menu.
    pub fn manual_override(
        &self,
        plan: &mut WeeklyPlan,
        menu: DayMenu,
        note: Option<String>,
    ) -> EngineResult<()> {
        plan.replace_day(
            menu,
            AdjustmentReason::ManualOverride,
            note,
            &self.config.tolerances,
        )
    }
}
