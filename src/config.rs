// ABOUTME: Engine configuration: BMR coefficients, tolerances, slot split, thresholds
// ABOUTME: Every tunable the generator and resolver use, with documented defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

//! Engine Configuration
//!
//! All numeric policy lives here rather than inline in the algorithms: the
//! predictive-equation coefficients, tolerance bands, meal-slot proportions
//! and adherence thresholds are reasonable defaults inferred from the SMAE
//! exchange system and can be overridden wholesale by deserializing a
//! caller-supplied configuration.
//!
//! # Scientific References
//!
//! - BMR: Mifflin et al. (1990) DOI: 10.1093/ajcn/51.2.241
//! - Activity factors: `McArdle` et al. (2010) - Exercise Physiology
//! - Fiber: IOM Dietary Reference Intakes (14 g / 1000 kcal)

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::models::plan::SlotKind;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Basal Metabolic Rate (BMR) calculation settings
    pub bmr: BmrConfig,
    /// Activity factor multipliers for total energy expenditure
    pub activity_factors: ActivityFactorsConfig,
    /// Objective-based caloric adjustments
    pub objectives: ObjectiveConfig,
    /// Default macronutrient split and permitted bands
    pub macro_split: MacroSplitConfig,
    /// Tolerance bands used by the calculator, generator and validators
    pub tolerances: ToleranceConfig,
    /// Per-slot share of the daily allowance
    pub slots: SlotDistributionConfig,
    /// Day-balancing behavior
    pub balancing: BalancingConfig,
    /// Adherence tracking and auto-adjustment thresholds
    pub adherence: AdherenceConfig,
}

impl EngineConfig {
    /// Validate every sub-configuration
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` naming the first offending field.
    pub fn validate(&self) -> EngineResult<()> {
        self.macro_split.default_split().validate()?;
        self.slots.validate()?;
        self.adherence.validate()?;
        if self.tolerances.calorie_band_pct <= 0.0 || self.tolerances.macro_band_pct <= 0.0 {
            return Err(EngineError::invalid_input(
                "tolerance bands must be positive percentages",
            ));
        }
        Ok(())
    }
}

/// BMR (Basal Metabolic Rate) calculation configuration
///
/// Reference: Mifflin, M.D., et al. (1990). A new predictive equation for
/// resting energy expenditure. DOI: 10.1093/ajcn/51.2.241
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BmrConfig {
    /// Mifflin-St Jeor weight coefficient (10.0)
    pub msj_weight_coef: f64,
    /// Mifflin-St Jeor height coefficient (6.25)
    pub msj_height_coef: f64,
    /// Mifflin-St Jeor age coefficient (-5.0)
    pub msj_age_coef: f64,
    /// Mifflin-St Jeor male constant (+5)
    pub msj_male_constant: f64,
    /// Mifflin-St Jeor female constant (-161)
    pub msj_female_constant: f64,
    /// Safety floor for computed BMR (kcal/day)
    pub minimum_bmr_kcal: f64,
}

impl Default for BmrConfig {
    fn default() -> Self {
        Self {
            msj_weight_coef: 10.0,
            msj_height_coef: 6.25,
            msj_age_coef: -5.0,
            msj_male_constant: 5.0,
            msj_female_constant: -161.0,
            minimum_bmr_kcal: 1000.0,
        }
    }
}

/// Activity factor multipliers for total daily energy expenditure
///
/// Reference: `McArdle`, W.D., Katch, F.I., & Katch, V.L. (2010)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityFactorsConfig {
    /// Sedentary (little/no exercise): 1.2
    pub sedentary: f64,
    /// Lightly active (1-3 days/week): 1.375
    pub lightly_active: f64,
    /// Moderately active (3-5 days/week): 1.55
    pub moderately_active: f64,
    /// Very active (6-7 days/week): 1.725
    pub very_active: f64,
    /// Extra active (hard training 2x/day): 1.9
    pub extra_active: f64,
}

impl Default for ActivityFactorsConfig {
    fn default() -> Self {
        Self {
            sedentary: 1.2,
            lightly_active: 1.375,
            moderately_active: 1.55,
            very_active: 1.725,
            extra_active: 1.9,
        }
    }
}

/// Objective-based caloric adjustment configuration
///
/// Reduction and gain percentages sit inside the clinically customary
/// -15..-20 % and +10..+15 % bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    /// Caloric reduction for weight-loss objectives (negative percent)
    pub reduction_pct: f64,
    /// Caloric surplus for weight-gain objectives (positive percent)
    pub gain_pct: f64,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            reduction_pct: -17.5,
            gain_pct: 12.5,
        }
    }
}

/// Macronutrient split over total calories (percent)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroSplit {
    /// Protein share of calories (percent)
    pub protein_pct: f64,
    /// Carbohydrate share of calories (percent)
    pub carbs_pct: f64,
    /// Fat share of calories (percent)
    pub fat_pct: f64,
}

impl MacroSplit {
    /// Create a split without validating it
    #[must_use]
    pub const fn new(protein_pct: f64, carbs_pct: f64, fat_pct: f64) -> Self {
        Self {
            protein_pct,
            carbs_pct,
            fat_pct,
        }
    }

    /// Validate that percentages are non-negative and sum to 100 +/- 1
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InfeasibleTarget` on a negative share or a sum
    /// outside the rounding tolerance.
    pub fn validate(&self) -> EngineResult<()> {
        if self.protein_pct < 0.0 || self.carbs_pct < 0.0 || self.fat_pct < 0.0 {
            return Err(EngineError::infeasible_target(
                "macro percentages must be non-negative",
            ));
        }
        let sum = self.protein_pct + self.carbs_pct + self.fat_pct;
        if (sum - 100.0).abs() > 1.0 {
            return Err(EngineError::infeasible_target(format!(
                "macro percentages must sum to 100 +/- 1, got {sum:.1}"
            )));
        }
        Ok(())
    }
}

/// Default macronutrient split and the bands a custom split must respect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroSplitConfig {
    /// Default protein share (percent): 20, within 15-30
    pub protein_pct: f64,
    /// Default carbohydrate share (percent): 50, within 40-55
    pub carbs_pct: f64,
    /// Default fat share (percent): 30, within 20-35
    pub fat_pct: f64,
    /// Minimum fiber per 1000 kcal (grams): 14
    pub fiber_g_per_1000_kcal: f64,
}

impl Default for MacroSplitConfig {
    fn default() -> Self {
        Self {
            protein_pct: 20.0,
            carbs_pct: 50.0,
            fat_pct: 30.0,
            fiber_g_per_1000_kcal: 14.0,
        }
    }
}

impl MacroSplitConfig {
    /// The configured default split
    #[must_use]
    pub const fn default_split(&self) -> MacroSplit {
        MacroSplit::new(self.protein_pct, self.carbs_pct, self.fat_pct)
    }
}

/// Tolerance bands (percent) used across the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Per-day calorie band around the target: +/- 5 %
    pub calorie_band_pct: f64,
    /// Per-day macro-gram band around the target: +/- 10 %
    pub macro_band_pct: f64,
    /// Caloric tolerance for an equivalence conversion: 5 % (SMAE exchange)
    pub conversion_band_pct: f64,
    /// Allowed drift between allowance calories and target calories: +/- 5 %
    pub allowance_band_pct: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            calorie_band_pct: 5.0,
            macro_band_pct: 10.0,
            conversion_band_pct: 5.0,
            allowance_band_pct: 5.0,
        }
    }
}

/// Share of the daily allowance each meal slot receives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDistributionConfig {
    /// Breakfast share: 0.25
    pub breakfast: f64,
    /// Mid-morning snack share: 0.10
    pub morning_snack: f64,
    /// Lunch share: 0.35
    pub lunch: f64,
    /// Afternoon snack share: 0.10
    pub afternoon_snack: f64,
    /// Dinner share: 0.20
    pub dinner: f64,
}

impl Default for SlotDistributionConfig {
    fn default() -> Self {
        Self {
            breakfast: 0.25,
            morning_snack: 0.10,
            lunch: 0.35,
            afternoon_snack: 0.10,
            dinner: 0.20,
        }
    }
}

impl SlotDistributionConfig {
    /// Share for a specific slot
    #[must_use]
    pub const fn fraction_for(&self, slot: SlotKind) -> f64 {
        match slot {
            SlotKind::Breakfast => self.breakfast,
            SlotKind::MorningSnack => self.morning_snack,
            SlotKind::Lunch => self.lunch,
            SlotKind::AfternoonSnack => self.afternoon_snack,
            SlotKind::Dinner => self.dinner,
        }
    }

    /// Validate that slot shares cover the whole day
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` if shares do not sum to 1.0
    /// within rounding tolerance or any share is negative.
    pub fn validate(&self) -> EngineResult<()> {
        let shares = [
            self.breakfast,
            self.morning_snack,
            self.lunch,
            self.afternoon_snack,
            self.dinner,
        ];
        if shares.iter().any(|s| *s < 0.0) {
            return Err(EngineError::invalid_input(
                "slot shares must be non-negative",
            ));
        }
        let sum: f64 = shares.iter().sum();
        if (sum - 1.0).abs() > 0.001 {
            return Err(EngineError::invalid_input(format!(
                "slot shares must sum to 1.0, got {sum:.3}"
            )));
        }
        Ok(())
    }
}

/// Day-balancing behavior for the generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancingConfig {
    /// Maximum same-category swap passes per day before degrading to a
    /// warning
    pub max_swap_passes: u32,
}

impl Default for BalancingConfig {
    fn default() -> Self {
        Self { max_swap_passes: 8 }
    }
}

/// Adherence tracking and auto-adjustment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdherenceConfig {
    /// Rolling window of most recent recorded days: 3
    pub window_days: usize,
    /// Adherence percentage below which auto-adjustment triggers: 70
    pub low_adherence_threshold_pct: f64,
    /// Bound on how far auto-adjustment may shift the daily calorie target
    /// from the original, as a percent: 10
    pub max_target_shift_pct: f64,
}

impl Default for AdherenceConfig {
    fn default() -> Self {
        Self {
            window_days: 3,
            low_adherence_threshold_pct: 70.0,
            max_target_shift_pct: 10.0,
        }
    }
}

impl AdherenceConfig {
    /// Validate threshold and window settings
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` on an empty window or a threshold
    /// outside 0-100.
    pub fn validate(&self) -> EngineResult<()> {
        if self.window_days == 0 {
            return Err(EngineError::invalid_input(
                "adherence window must cover at least one day",
            ));
        }
        if !(0.0..=100.0).contains(&self.low_adherence_threshold_pct) {
            return Err(EngineError::invalid_input(
                "adherence threshold must be between 0 and 100",
            ));
        }
        Ok(())
    }
}
