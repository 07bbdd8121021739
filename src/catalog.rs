// ABOUTME: Immutable food catalog with search, category filtering and stats
// ABOUTME: Loaded once at startup from YAML (or the bundled SMAE data), then shared read-only
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

//! Food Catalog & Equivalence Index
//!
//! The catalog is constructed once at process start and injected read-only
//! into every component that needs food data. It is `Send + Sync`, so any
//! number of concurrent readers may share it behind an `Arc`.
//!
//! Search is case- and diacritic-insensitive: the shipped data uses Spanish
//! food names ("Plátano", "Frijol"), and queries typed without accents must
//! still match.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{EngineError, EngineResult};
use crate::models::food::{EquivalenceCategory, Food};

/// Bundled default catalog: SMAE staple foods
const BUNDLED_CATALOG_YAML: &str = include_str!("../data/catalog.yaml");

/// Aggregate catalog statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogStats {
    /// Number of foods in the catalog
    pub total_count: usize,
    /// Number of foods tagged traditional
    pub traditional_count: usize,
    /// Number of distinct equivalence categories present
    pub category_count: usize,
    /// Traditional share of the catalog, percent rounded to one decimal
    pub traditional_percentage: f64,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    foods: Vec<Food>,
}

/// Immutable, process-wide food reference data
#[derive(Debug, Clone)]
pub struct FoodCatalog {
    foods: Vec<Food>,
    by_id: HashMap<String, usize>,
}

impl FoodCatalog {
    /// Build a catalog from curated food records
    ///
    /// # Errors
    ///
    /// Returns `EngineError::CatalogData` if any record fails validation or
    /// two records share an id.
    pub fn new(foods: Vec<Food>) -> EngineResult<Self> {
        let mut by_id = HashMap::with_capacity(foods.len());
        for (idx, food) in foods.iter().enumerate() {
            food.validate()?;
            if by_id.insert(food.id.clone(), idx).is_some() {
                return Err(EngineError::CatalogData(format!(
                    "duplicate food id '{}'",
                    food.id
                )));
            }
        }
        debug!(foods = foods.len(), "catalog constructed");
        Ok(Self { foods, by_id })
    }

    /// Parse a catalog from YAML text
    ///
    /// # Errors
    ///
    /// Returns `EngineError::CatalogData` on malformed YAML or invalid
    /// records.
    pub fn from_yaml_str(yaml: &str) -> EngineResult<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.foods)
    }

    /// Load a catalog from a YAML file
    ///
    /// # Errors
    ///
    /// Returns `EngineError::CatalogData` if the file cannot be read or
    /// parsed.
    pub fn from_yaml_file(path: &Path) -> EngineResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            EngineError::CatalogData(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The catalog bundled with the crate (SMAE staple foods)
    ///
    /// # Errors
    ///
    /// Returns `EngineError::CatalogData` only if the bundled data is
    /// corrupt, which indicates a packaging defect.
    pub fn bundled() -> EngineResult<Self> {
        Self::from_yaml_str(BUNDLED_CATALOG_YAML)
    }

    /// Number of foods
    #[must_use]
    pub fn len(&self) -> usize {
        self.foods.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }

    /// All foods in stable insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Food> {
        self.foods.iter()
    }

    /// Food by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Food> {
        self.by_id.get(id).map(|idx| &self.foods[*idx])
    }

    /// Lazy, restartable search over names and tags
    ///
    /// Case- and diacritic-insensitive substring match. An empty query
    /// yields the full catalog in insertion order. Each call returns a
    /// fresh iterator bounded by the catalog size.
    pub fn search<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a Food> + 'a {
        let needle = fold(query);
        self.foods.iter().filter(move |food| {
            if needle.is_empty() {
                return true;
            }
            fold(&food.name).contains(&needle)
                || food.tags.iter().any(|tag| fold(tag).contains(&needle))
        })
    }

    /// All foods of one equivalence category
    #[must_use]
    pub fn by_category(&self, category: EquivalenceCategory) -> Vec<&Food> {
        self.foods
            .iter()
            .filter(|f| f.equivalence_category == category)
            .collect()
    }

    /// All foods of a category given by name
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownCategory` if the name is not a
    /// recognized category.
    pub fn by_category_name(&self, name: &str) -> EngineResult<Vec<&Food>> {
        let category: EquivalenceCategory = name.parse()?;
        Ok(self.by_category(category))
    }

    /// Aggregate statistics over the catalog
    #[must_use]
    pub fn stats(&self) -> CatalogStats {
        let total_count = self.foods.len();
        let traditional_count = self.foods.iter().filter(|f| f.is_traditional()).count();
        let category_count = self
            .foods
            .iter()
            .map(|f| f.equivalence_category)
            .collect::<HashSet<_>>()
            .len();
        let traditional_percentage = if total_count == 0 {
            0.0
        } else {
            let pct = traditional_count as f64 / total_count as f64 * 100.0;
            (pct * 10.0).round() / 10.0
        };
        CatalogStats {
            total_count,
            traditional_count,
            category_count,
            traditional_percentage,
        }
    }
}

/// Lowercase and strip Spanish diacritics for matching
fn fold(input: &str) -> String {
    input
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}
