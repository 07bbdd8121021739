// ABOUTME: Food reference data and the closed SMAE equivalence-category enum
// ABOUTME: Category metadata (nominal unit profiles, cross-substitutions) lives here
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

//! Food and equivalence-category models
//!
//! The SMAE exchange system (Sistema Mexicano de Alimentos Equivalentes)
//! groups foods into categories with a standardized nutrient profile per
//! exchange unit. Every [`Food`] belongs to exactly one
//! [`EquivalenceCategory`]; the category's nominal profile is what makes two
//! foods of the same category interchangeable at the right amounts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

/// SMAE equivalence categories
///
/// A closed set: category membership is reference data curated with the
/// catalog, never invented at plan-generation time.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquivalenceCategory {
    /// Cereals and tubers without added fat (tortilla, rice, bread)
    CerealsNoFat,
    /// Cereals prepared with fat (pastries, fried grains)
    CerealsWithFat,
    /// Fruits
    Fruits,
    /// Vegetables
    Vegetables,
    /// Legumes (beans, lentils, chickpeas)
    Legumes,
    /// Animal protein, very low fat (<=1 g fat per exchange)
    LeanProteinVeryLow,
    /// Animal protein, low fat
    LeanProteinLow,
    /// Animal protein, moderate fat
    LeanProteinModerate,
    /// Animal protein, high fat
    LeanProteinHigh,
    /// Skim milk and equivalents
    MilkSkim,
    /// Whole milk and equivalents
    MilkWhole,
    /// Fats without protein (oil, butter, avocado)
    FatsPure,
    /// Fats carrying protein (nuts, seeds)
    FatsWithProtein,
    /// Sugars without fat
    SugarsNoFat,
    /// Sugars with fat (chocolate, pastry toppings)
    SugarsWithFat,
    /// Free beverages and condiments (no caloric accounting)
    FreeBeverage,
}

/// Nominal nutrient profile of one exchange unit of a category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitProfile {
    /// Calories per unit (kcal)
    pub calories: f64,
    /// Protein per unit (grams)
    pub protein_g: f64,
    /// Carbohydrates per unit (grams)
    pub carbs_g: f64,
    /// Fat per unit (grams)
    pub fat_g: f64,
    /// Fiber per unit (grams)
    pub fiber_g: f64,
}

impl UnitProfile {
    const fn new(calories: f64, protein_g: f64, carbs_g: f64, fat_g: f64, fiber_g: f64) -> Self {
        Self {
            calories,
            protein_g,
            carbs_g,
            fat_g,
            fiber_g,
        }
    }
}

impl EquivalenceCategory {
    /// Every category, in stable order
    pub const ALL: [Self; 16] = [
        Self::CerealsNoFat,
        Self::CerealsWithFat,
        Self::Fruits,
        Self::Vegetables,
        Self::Legumes,
        Self::LeanProteinVeryLow,
        Self::LeanProteinLow,
        Self::LeanProteinModerate,
        Self::LeanProteinHigh,
        Self::MilkSkim,
        Self::MilkWhole,
        Self::FatsPure,
        Self::FatsWithProtein,
        Self::SugarsNoFat,
        Self::SugarsWithFat,
        Self::FreeBeverage,
    ];

    /// Nominal nutrient profile of one exchange unit
    ///
    /// Values follow the published SMAE exchange tables.
    #[must_use]
    pub const fn unit_profile(self) -> UnitProfile {
        match self {
            Self::CerealsNoFat => UnitProfile::new(70.0, 2.0, 15.0, 0.0, 1.0),
            Self::CerealsWithFat => UnitProfile::new(115.0, 2.0, 15.0, 5.0, 1.0),
            Self::Fruits => UnitProfile::new(60.0, 0.0, 15.0, 0.0, 2.0),
            Self::Vegetables => UnitProfile::new(25.0, 2.0, 4.0, 0.0, 2.0),
            Self::Legumes => UnitProfile::new(120.0, 8.0, 20.0, 1.0, 5.0),
            Self::LeanProteinVeryLow => UnitProfile::new(40.0, 7.0, 0.0, 1.0, 0.0),
            Self::LeanProteinLow => UnitProfile::new(55.0, 7.0, 0.0, 3.0, 0.0),
            Self::LeanProteinModerate => UnitProfile::new(75.0, 7.0, 0.0, 5.0, 0.0),
            Self::LeanProteinHigh => UnitProfile::new(100.0, 7.0, 0.0, 8.0, 0.0),
            Self::MilkSkim => UnitProfile::new(95.0, 9.0, 12.0, 2.0, 0.0),
            Self::MilkWhole => UnitProfile::new(150.0, 9.0, 12.0, 8.0, 0.0),
            Self::FatsPure => UnitProfile::new(45.0, 0.0, 0.0, 5.0, 0.0),
            Self::FatsWithProtein => UnitProfile::new(70.0, 3.0, 3.0, 5.0, 0.0),
            Self::SugarsNoFat => UnitProfile::new(40.0, 0.0, 10.0, 0.0, 0.0),
            Self::SugarsWithFat => UnitProfile::new(85.0, 0.0, 10.0, 5.0, 0.0),
            Self::FreeBeverage => UnitProfile::new(0.0, 0.0, 0.0, 0.0, 0.0),
        }
    }

    /// Categories whose units may absorb this category's allowance when the
    /// catalog offers no admissible food
    ///
    /// Cross-substitution is deliberately narrow: only pairings with an
    /// equivalent nominal macro role are declared (legumes and the
    /// animal-protein tiers). Everything else returns an empty slice.
    #[must_use]
    pub const fn substitution_targets(self) -> &'static [Self] {
        match self {
            Self::Legumes => &[Self::LeanProteinLow, Self::LeanProteinModerate],
            Self::LeanProteinVeryLow | Self::LeanProteinLow => &[Self::Legumes],
            _ => &[],
        }
    }

    /// Whether one unit of this category carries no calories
    #[must_use]
    pub fn is_free(self) -> bool {
        self.unit_profile().calories == 0.0
    }

    /// Canonical SCREAMING_SNAKE_CASE name (the serialized form)
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CerealsNoFat => "CEREALS_NO_FAT",
            Self::CerealsWithFat => "CEREALS_WITH_FAT",
            Self::Fruits => "FRUITS",
            Self::Vegetables => "VEGETABLES",
            Self::Legumes => "LEGUMES",
            Self::LeanProteinVeryLow => "LEAN_PROTEIN_VERY_LOW",
            Self::LeanProteinLow => "LEAN_PROTEIN_LOW",
            Self::LeanProteinModerate => "LEAN_PROTEIN_MODERATE",
            Self::LeanProteinHigh => "LEAN_PROTEIN_HIGH",
            Self::MilkSkim => "MILK_SKIM",
            Self::MilkWhole => "MILK_WHOLE",
            Self::FatsPure => "FATS_PURE",
            Self::FatsWithProtein => "FATS_WITH_PROTEIN",
            Self::SugarsNoFat => "SUGARS_NO_FAT",
            Self::SugarsWithFat => "SUGARS_WITH_FAT",
            Self::FreeBeverage => "FREE_BEVERAGE",
        }
    }
}

impl fmt::Display for EquivalenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EquivalenceCategory {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| EngineError::UnknownCategory { name: s.to_owned() })
    }
}

/// Aggregated nutrient totals (calories plus macro grams)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientTotals {
    /// Calories (kcal)
    pub calories: f64,
    /// Protein (grams)
    pub protein_g: f64,
    /// Carbohydrates (grams)
    pub carbs_g: f64,
    /// Fat (grams)
    pub fat_g: f64,
    /// Fiber (grams)
    pub fiber_g: f64,
}

impl NutrientTotals {
    /// Accumulate another total into this one
    pub fn add(&mut self, other: &Self) {
        self.calories += other.calories;
        self.protein_g += other.protein_g;
        self.carbs_g += other.carbs_g;
        self.fat_g += other.fat_g;
        self.fiber_g += other.fiber_g;
    }
}

/// A canonical food record
///
/// Immutable reference data: created and updated only by catalog curation,
/// never by plan generation. Nutrient fields are per defined portion
/// (`portion_size_g` grams).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    /// Stable identifier (catalog-unique)
    pub id: String,
    /// Display name
    pub name: String,
    /// The single equivalence category this food belongs to
    pub equivalence_category: EquivalenceCategory,
    /// Human-readable portion ("1 tortilla (30 g)")
    pub portion_description: String,
    /// Defined portion size in grams
    pub portion_size_g: f64,
    /// Calories per portion (kcal)
    pub calories: f64,
    /// Protein per portion (grams)
    pub protein_g: f64,
    /// Carbohydrates per portion (grams)
    pub carbs_g: f64,
    /// Fat per portion (grams)
    pub fat_g: f64,
    /// Fiber per portion (grams)
    pub fiber_g: f64,
    /// Micronutrients per portion, name to milligrams
    #[serde(default)]
    pub micronutrients: BTreeMap<String, f64>,
    /// Free-form tags: "traditional", region and season names, allergens
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Relative cost tier, 1 = cheapest (generator tie-break)
    #[serde(default = "default_cost_tier")]
    pub cost_tier: u8,
    /// Natural rounding step in grams (e.g. half an egg = 25 g); defaults
    /// to decigram rounding when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portion_granularity_g: Option<f64>,
}

const fn default_cost_tier() -> u8 {
    2
}

impl Food {
    /// Whether this food carries a tag (case-insensitive)
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Whether the catalog curator flagged this food as traditional
    #[must_use]
    pub fn is_traditional(&self) -> bool {
        self.has_tag("traditional")
    }

    /// Whether this food is a zero-calorie "free" food
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.calories == 0.0
    }

    /// Grams of this food that amount to one nominal exchange unit of its
    /// category, or `None` for free foods
    #[must_use]
    pub fn grams_per_unit(&self) -> Option<f64> {
        if self.is_free() {
            return None;
        }
        let nominal = self.equivalence_category.unit_profile().calories;
        Some(self.portion_size_g * nominal / self.calories)
    }

    /// Exchange units represented by `amount_g` grams of this food
    ///
    /// Free foods always count as zero units.
    #[must_use]
    pub fn units_for_amount(&self, amount_g: f64) -> f64 {
        self.grams_per_unit()
            .map_or(0.0, |per_unit| amount_g / per_unit)
    }

    /// Nutrient totals contributed by `amount_g` grams of this food
    #[must_use]
    pub fn nutrition_for(&self, amount_g: f64) -> NutrientTotals {
        let scale = amount_g / self.portion_size_g;
        NutrientTotals {
            calories: self.calories * scale,
            protein_g: self.protein_g * scale,
            carbs_g: self.carbs_g * scale,
            fat_g: self.fat_g * scale,
            fiber_g: self.fiber_g * scale,
        }
    }

    /// Validate the record as catalog curation would
    ///
    /// # Errors
    ///
    /// Returns `EngineError::CatalogData` on an empty id/name, a
    /// non-positive portion size, or negative nutrient values.
    pub fn validate(&self) -> EngineResult<()> {
        if self.id.trim().is_empty() {
            return Err(EngineError::CatalogData("food id must not be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(EngineError::CatalogData(format!(
                "food '{}' must have a name",
                self.id
            )));
        }
        if self.portion_size_g <= 0.0 {
            return Err(EngineError::CatalogData(format!(
                "food '{}' must have a positive portion size",
                self.id
            )));
        }
        let nutrients = [
            self.calories,
            self.protein_g,
            self.carbs_g,
            self.fat_g,
            self.fiber_g,
        ];
        if nutrients.iter().any(|v| *v < 0.0 || !v.is_finite()) {
            return Err(EngineError::CatalogData(format!(
                "food '{}' has a negative or non-finite nutrient value",
                self.id
            )));
        }
        if let Some(step) = self.portion_granularity_g {
            if step <= 0.0 {
                return Err(EngineError::CatalogData(format!(
                    "food '{}' has a non-positive portion granularity",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn category_roundtrips_through_name() {
        for category in EquivalenceCategory::ALL {
            let parsed: EquivalenceCategory = category.name().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = "CEREALS_MAYBE_FAT".parse::<EquivalenceCategory>().unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnknownCategory { name } if name == "CEREALS_MAYBE_FAT"
        ));
    }

    #[test]
    fn cross_substitution_is_narrow_and_symmetric_for_legumes() {
        assert!(EquivalenceCategory::Legumes
            .substitution_targets()
            .contains(&EquivalenceCategory::LeanProteinLow));
        assert!(EquivalenceCategory::LeanProteinLow
            .substitution_targets()
            .contains(&EquivalenceCategory::Legumes));
        assert!(EquivalenceCategory::Fruits.substitution_targets().is_empty());
    }
}
