// ABOUTME: Resolves daily caloric and macro targets from patient profile and objective
// ABOUTME: Mifflin-St Jeor BMR, activity-factor TDEE, objective adjustment, macro split
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

//! Target Resolver
//!
//! Derives a patient's daily [`NutrientTarget`] from profile attributes and
//! objective using standard predictive equations.
//!
//! # Scientific References
//!
//! - Mifflin, M.D., et al. (1990). A new predictive equation for resting
//!   energy expenditure. *American Journal of Clinical Nutrition*, 51(2).
//!   <https://doi.org/10.1093/ajcn/51.2.241>
//! - `McArdle`, W.D., Katch, F.I., & Katch, V.L. (2010). Exercise Physiology
//!   (activity factors).

use serde::{Deserialize, Serialize};

use crate::config::{ActivityFactorsConfig, BmrConfig, EngineConfig, MacroSplit, ObjectiveConfig};
use crate::errors::{EngineError, EngineResult};
use crate::models::plan::{NutrientTarget, PlanObjective};

/// Calories per gram of protein and carbohydrate (Atwater factor)
const KCAL_PER_G_PROTEIN_CARB: f64 = 4.0;
/// Calories per gram of fat (Atwater factor)
const KCAL_PER_G_FAT: f64 = 9.0;

/// Biological sex for the BMR equation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    /// Male constant (+5)
    Male,
    /// Female constant (-161)
    Female,
}

/// Activity level for the TDEE multiplier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little or no exercise
    Sedentary,
    /// Exercise 1-3 days/week
    LightlyActive,
    /// Exercise 3-5 days/week
    ModeratelyActive,
    /// Exercise 6-7 days/week
    VeryActive,
    /// Hard training twice a day
    ExtraActive,
}

/// Patient attributes the resolver consumes
///
/// Supplied by the external profile service; the engine never stores these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Body weight in kilograms
    pub weight_kg: f64,
    /// Height in centimeters
    pub height_cm: f64,
    /// Age in years
    pub age: u32,
    /// Biological sex
    pub sex: Sex,
    /// Habitual activity level
    pub activity_level: ActivityLevel,
}

/// Calculate Basal Metabolic Rate using the Mifflin-St Jeor equation
///
/// Formula: BMR = (10 x `weight_kg`) + (6.25 x `height_cm`) - (5 x age) +
/// sex constant (+5 men, -161 women).
///
/// # Errors
///
/// Returns `EngineError::InvalidInput` if profile values are out of the
/// ranges the equation was validated for.
pub fn calculate_bmr(profile: &PatientProfile, config: &BmrConfig) -> EngineResult<f64> {
    if profile.weight_kg <= 0.0 || profile.weight_kg > 300.0 {
        return Err(EngineError::invalid_input(
            "weight must be between 0 and 300 kg",
        ));
    }
    if profile.height_cm <= 0.0 || profile.height_cm > 300.0 {
        return Err(EngineError::invalid_input(
            "height must be between 0 and 300 cm",
        ));
    }
    if !(10..=120).contains(&profile.age) {
        return Err(EngineError::invalid_input(
            "age must be between 10 and 120 years",
        ));
    }

    let weight_component = config.msj_weight_coef * profile.weight_kg;
    let height_component = config.msj_height_coef * profile.height_cm;
    let age_component = config.msj_age_coef * f64::from(profile.age);
    let sex_constant = match profile.sex {
        Sex::Male => config.msj_male_constant,
        Sex::Female => config.msj_female_constant,
    };

    let bmr = weight_component + height_component + age_component + sex_constant;
    Ok(bmr.max(config.minimum_bmr_kcal))
}

/// Calculate Total Daily Energy Expenditure from BMR and activity level
///
/// # Errors
///
/// Returns `EngineError::InvalidInput` if BMR is not positive.
pub fn calculate_tdee(
    bmr: f64,
    activity_level: ActivityLevel,
    config: &ActivityFactorsConfig,
) -> EngineResult<f64> {
    if bmr <= 0.0 {
        return Err(EngineError::invalid_input("BMR must be positive"));
    }
    let factor = match activity_level {
        ActivityLevel::Sedentary => config.sedentary,
        ActivityLevel::LightlyActive => config.lightly_active,
        ActivityLevel::ModeratelyActive => config.moderately_active,
        ActivityLevel::VeryActive => config.very_active,
        ActivityLevel::ExtraActive => config.extra_active,
    };
    Ok(bmr * factor)
}

/// TDEE multiplier for an objective
///
/// Reduction and gain use the configured adjustment; athletic and
/// therapeutic objectives carry their own prescriber-supplied multiplier.
///
/// # Errors
///
/// Returns `EngineError::InfeasibleTarget` for a caller-supplied multiplier
/// outside the clinically plausible 0.5-2.0 range.
pub fn objective_multiplier(
    objective: PlanObjective,
    config: &ObjectiveConfig,
) -> EngineResult<f64> {
    let multiplier = match objective {
        PlanObjective::WeightReduction => 1.0 + config.reduction_pct / 100.0,
        PlanObjective::Maintenance => 1.0,
        PlanObjective::WeightGain => 1.0 + config.gain_pct / 100.0,
        PlanObjective::Athletic { multiplier } | PlanObjective::Therapeutic { multiplier } => {
            multiplier
        }
    };
    if !(0.5..=2.0).contains(&multiplier) {
        return Err(EngineError::infeasible_target(format!(
            "objective multiplier {multiplier:.2} outside the 0.5-2.0 range"
        )));
    }
    Ok(multiplier)
}

/// Resolve a daily nutrient target with the configured default macro split
///
/// # Errors
///
/// Returns `EngineError::InvalidInput` on out-of-range profile values and
/// `EngineError::InfeasibleTarget` on an invalid objective multiplier.
pub fn resolve(
    profile: &PatientProfile,
    objective: PlanObjective,
    config: &EngineConfig,
) -> EngineResult<NutrientTarget> {
    resolve_with_split(profile, objective, config.macro_split.default_split(), config)
}

/// Resolve a daily nutrient target with a caller-supplied macro split
///
/// # Errors
///
/// In addition to [`resolve`]'s errors, returns
/// `EngineError::InfeasibleTarget` when the split has a negative share or
/// does not sum to 100 +/- 1.
pub fn resolve_with_split(
    profile: &PatientProfile,
    objective: PlanObjective,
    split: MacroSplit,
    config: &EngineConfig,
) -> EngineResult<NutrientTarget> {
    split.validate()?;

    let bmr = calculate_bmr(profile, &config.bmr)?;
    let tdee = calculate_tdee(bmr, profile.activity_level, &config.activity_factors)?;
    let multiplier = objective_multiplier(objective, &config.objectives)?;
    let calories_total = (tdee * multiplier).round();

    let protein_g = calories_total * split.protein_pct / 100.0 / KCAL_PER_G_PROTEIN_CARB;
    let carbs_g = calories_total * split.carbs_pct / 100.0 / KCAL_PER_G_PROTEIN_CARB;
    let fat_g = calories_total * split.fat_pct / 100.0 / KCAL_PER_G_FAT;
    let fiber_g = calories_total / 1000.0 * config.macro_split.fiber_g_per_1000_kcal;

    Ok(NutrientTarget {
        calories_total,
        protein_g,
        protein_pct: split.protein_pct,
        carbs_g,
        carbs_pct: split.carbs_pct,
        fat_g,
        fat_pct: split.fat_pct,
        fiber_g,
    })
}
