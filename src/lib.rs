// ABOUTME: Library entry point for the nutritional equivalence and meal-plan engine
// ABOUTME: Catalog, equivalence calculator, target resolver, generator, adherence tracker
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

#![deny(unsafe_code)]

//! # NutriPlan Engine
//!
//! A pure-computation engine for nutritional equivalence and dynamic meal
//! planning built on the SMAE food exchange system (Sistema Mexicano de
//! Alimentos Equivalentes).
//!
//! ## Architecture
//!
//! - **Catalog**: immutable food reference data, loaded once and shared
//!   read-only
//! - **Equivalence Calculator**: converts amounts between foods of the same
//!   exchange category while preserving caloric contribution
//! - **Target Resolver**: profile + objective to daily caloric/macro targets
//! - **Plan Generator**: distributes exchange-unit allowances across meal
//!   slots and days, honoring patient constraints
//! - **Adherence Tracker**: planned-vs-actual tracking with bounded
//!   automatic plan adjustment
//!
//! ## Example
//!
//! ```rust
//! use nutriplan_engine::catalog::FoodCatalog;
//! use nutriplan_engine::config::EngineConfig;
//! use nutriplan_engine::models::plan::{EquivalenceAllowance, PlanConstraints, PlanObjective};
//! use nutriplan_engine::plan_generator::{PlanGenerator, PlanRequest};
//! use nutriplan_engine::plan_session::CancelFlag;
//! use nutriplan_engine::target_resolver::{self, ActivityLevel, PatientProfile, Sex};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), nutriplan_engine::errors::EngineError> {
//! let catalog = Arc::new(FoodCatalog::bundled()?);
//! let config = EngineConfig::default();
//!
//! let profile = PatientProfile {
//!     weight_kg: 70.0,
//!     height_cm: 170.0,
//!     age: 30,
//!     sex: Sex::Female,
//!     activity_level: ActivityLevel::LightlyActive,
//! };
//! let target = target_resolver::resolve(&profile, PlanObjective::Maintenance, &config)?;
//! let allowance = EquivalenceAllowance::for_target(&target);
//!
//! let generator = PlanGenerator::new(catalog, config);
//! let request = PlanRequest {
//!     patient_id: "patient-1".into(),
//!     start_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
//!     objective: PlanObjective::Maintenance,
//!     target,
//!     allowance,
//!     constraints: PlanConstraints::default(),
//!     days: 7,
//! };
//! let plan = generator.generate(&request, &CancelFlag::new())?;
//! assert_eq!(plan.days.len(), 7);
//! # Ok(())
//! # }
//! ```

/// Adherence tracking and bounded automatic plan adjustment
pub mod adherence_tracker;

/// Immutable food catalog with search, category filtering and stats
pub mod catalog;

/// Engine configuration with documented defaults
pub mod config;

/// Equivalence conversion between foods of the same exchange category
pub mod equivalence_calculator;

/// Unified error taxonomy
pub mod errors;

/// Domain models: foods, categories, targets, allowances and plans
pub mod models;

/// Meal plan generation
pub mod plan_generator;

/// Per-plan session registry and cooperative cancellation
pub mod plan_session;

/// Substitution-suggestion strategy seam with deterministic re-validation
pub mod suggestion;

/// Daily target resolution from patient profile and objective
pub mod target_resolver;
