// ABOUTME: Shared test fixtures: synthetic catalog and canonical targets
// ABOUTME: Synthetic foods are exactly proportional to their category's nominal unit
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use nutriplan_engine::catalog::FoodCatalog;
use nutriplan_engine::models::food::{EquivalenceCategory, Food};
use nutriplan_engine::models::plan::NutrientTarget;

/// Build a synthetic food whose per-portion nutrition is exactly
/// `unit_multiple` nominal units of its category.
///
/// Keeping foods macro-proportional to the category profile makes generated
/// day totals analytically predictable in tests.
pub fn synthetic_food(
    id: &str,
    name: &str,
    category: EquivalenceCategory,
    portion_size_g: f64,
    unit_multiple: f64,
    tags: &[&str],
    cost_tier: u8,
) -> Food {
    let profile = category.unit_profile();
    Food {
        id: id.to_owned(),
        name: name.to_owned(),
        equivalence_category: category,
        portion_description: format!("{portion_size_g} g"),
        portion_size_g,
        calories: profile.calories * unit_multiple,
        protein_g: profile.protein_g * unit_multiple,
        carbs_g: profile.carbs_g * unit_multiple,
        fat_g: profile.fat_g * unit_multiple,
        fiber_g: profile.fiber_g * unit_multiple,
        micronutrients: BTreeMap::new(),
        tags: tags.iter().map(|t| (*t).to_owned()).collect::<BTreeSet<_>>(),
        cost_tier,
        portion_granularity_g: None,
    }
}

/// Synthetic catalog covering the categories the tests exercise
pub fn synthetic_catalog() -> FoodCatalog {
    use EquivalenceCategory as Cat;
    let foods = vec![
        synthetic_food("fruit_a", "Fruta A", Cat::Fruits, 100.0, 1.0, &[], 1),
        synthetic_food("fruit_b", "Fruta B", Cat::Fruits, 80.0, 1.25, &["summer"], 2),
        synthetic_food("fruit_c", "Fruta C", Cat::Fruits, 120.0, 0.8, &["traditional"], 1),
        synthetic_food("veg_a", "Verdura A", Cat::Vegetables, 150.0, 1.0, &["traditional"], 1),
        synthetic_food("veg_b", "Verdura B", Cat::Vegetables, 100.0, 1.0, &[], 1),
        synthetic_food("cereal_a", "Cereal A", Cat::CerealsNoFat, 30.0, 1.0, &["traditional"], 1),
        synthetic_food("cereal_b", "Cereal B", Cat::CerealsNoFat, 50.0, 1.1, &[], 2),
        synthetic_food("cereal_c", "Cereal C", Cat::CerealsNoFat, 40.0, 0.9, &["gluten"], 1),
        synthetic_food("legume_a", "Legumbre A", Cat::Legumes, 90.0, 1.0, &["legume", "traditional"], 1),
        synthetic_food("legume_b", "Legumbre B", Cat::Legumes, 100.0, 1.0, &["legume"], 1),
        synthetic_food("protein_a", "Proteína A", Cat::LeanProteinLow, 30.0, 1.0, &[], 2),
        synthetic_food("protein_b", "Proteína B", Cat::LeanProteinLow, 40.0, 1.0, &["fish"], 2),
        synthetic_food("protein_c", "Proteína C", Cat::LeanProteinLow, 35.0, 1.2, &[], 3),
        synthetic_food("fat_a", "Grasa A", Cat::FatsPure, 5.0, 1.0, &[], 1),
        synthetic_food("fat_b", "Grasa B", Cat::FatsPure, 30.0, 1.0, &["traditional"], 2),
        synthetic_food("sugar_a", "Azúcar A", Cat::SugarsNoFat, 10.0, 1.0, &["sugar"], 1),
        synthetic_food("tea_a", "Té A", Cat::FreeBeverage, 240.0, 0.0, &["traditional"], 1),
    ];
    FoodCatalog::new(foods).expect("synthetic catalog must validate")
}

/// A 2000 kcal / 20-50-30 daily target
pub fn target_2000() -> NutrientTarget {
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
