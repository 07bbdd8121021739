// ABOUTME: Unified error taxonomy for the equivalence and meal-plan engine
// ABOUTME: All variants are recoverable by the caller and carry retry context
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

//! # Engine Error Handling
//!
//! Every failure the engine can produce is recoverable by the caller: catalog
//! and lookup errors surface immediately, generation errors carry enough
//! context (day, category, slot) for the caller to relax constraints and
//! retry. Nothing here is process-fatal.

use thiserror::Error;
use uuid::Uuid;

use crate::models::food::EquivalenceCategory;
use crate::models::plan::SlotKind;

/// Result alias used across the engine
pub type EngineResult<T> = Result<T, EngineError>;

/// Unified error type for the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// A category name did not resolve to a known equivalence category
    #[error("unknown equivalence category: {name}")]
    UnknownCategory {
        /// The unrecognized category name as supplied by the caller
        name: String,
    },

    /// Source and target foods belong to different equivalence categories
    #[error("category mismatch: {source_category:?} cannot be converted to {target:?}")]
    CategoryMismatch {
        /// Category of the source food
        source_category: EquivalenceCategory,
        /// Category of the target food
        target: EquivalenceCategory,
    },

    /// Caller-supplied target parameters cannot produce a valid nutrient target
    #[error("infeasible target: {reason}")]
    InfeasibleTarget {
        /// Why the target cannot be satisfied
        reason: String,
    },

    /// A category allowance cannot be satisfied from the catalog under the
    /// active constraints
    #[error("infeasible allowance for {category:?} (day {day_index}): {reason}")]
    InfeasibleAllowance {
        /// The category that could not be filled
        category: EquivalenceCategory,
        /// 1-based day index where allocation failed
        day_index: u32,
        /// Slot where allocation failed, when known
        slot: Option<SlotKind>,
        /// Why no food qualified
        reason: String,
    },

    /// A mutation would leave the plan violating its aggregate invariants
    #[error("plan invariant violation: {reason}")]
    PlanInvariantViolation {
        /// Which invariant failed and by how much
        reason: String,
    },

    /// Input validation failure (profile attributes, amounts, day counts)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Catalog data could not be loaded or failed validation
    #[error("catalog data error: {0}")]
    CatalogData(String),

    /// No plan registered under the given id
    #[error("plan not found: {0}")]
    PlanNotFound(Uuid),

    /// The operation was cancelled before completion
    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Create an `InvalidInput` error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an `InfeasibleTarget` error
    pub fn infeasible_target(reason: impl Into<String>) -> Self {
        Self::InfeasibleTarget {
            reason: reason.into(),
        }
    }

    /// Create a `PlanInvariantViolation` error
    pub fn invariant_violation(reason: impl Into<String>) -> Self {
        Self::PlanInvariantViolation {
            reason: reason.into(),
        }
    }

    /// Whether the caller can expect a retry to succeed after relaxing
    /// constraints or correcting inputs
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl From<serde_yaml::Error> for EngineError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::CatalogData(err.to_string())
    }
}
