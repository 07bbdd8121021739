// ABOUTME: Per-plan session registry and cooperative cancellation
// ABOUTME: Single-writer regeneration per plan id; reads stay concurrent
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Intelligence

//! Plan sessions
//!
//! The engine itself is pure computation, but callers that regenerate plans
//! interactively need two guarantees: concurrent regeneration requests for
//! the same plan id are serialized (no interleaved adjustment entries), and
//! reads of a finalized plan proceed concurrently with a regeneration until
//! the replacement commits atomically.
//!
//! [`CancelFlag`] is the cooperative cancellation handle the generator polls
//! at day-loop granularity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{EngineError, EngineResult};
use crate::models::plan::WeeklyPlan;

/// Cooperative cancellation handle
///
/// Cheap to clone and share with the thread driving a generation; the
/// generator checks it between days, so a cancelled request never leaves a
/// partially finalized day behind.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// A fresh, un-cancelled flag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Registry of live plans with single-writer mutation discipline per plan id
#[derive(Debug, Default)]
pub struct PlanSessions {
    plans: DashMap<Uuid, Arc<RwLock<WeeklyPlan>>>,
}

impl PlanSessions {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plan, returning its id
    pub fn insert(&self, plan: WeeklyPlan) -> Uuid {
        let id = plan.id;
        self.plans.insert(id, Arc::new(RwLock::new(plan)));
        debug!(plan_id = %id, "plan registered");
        id
    }

    /// Remove a plan from the registry
    #[must_use]
    pub fn remove(&self, id: Uuid) -> bool {
        self.plans.remove(&id).is_some()
    }

    /// Read a snapshot of a plan
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` for an unknown id.
    pub fn snapshot(&self, id: Uuid) -> EngineResult<WeeklyPlan> {
        let entry = self.plans.get(&id).ok_or(EngineError::PlanNotFound(id))?;
        let guard = entry
            .read()
            .map_err(|_| EngineError::invalid_input("plan lock poisoned"))?;
        Ok(guard.clone())
    }

    /// Run a read-only closure against a plan without cloning it
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` for an unknown id.
    pub fn read<T>(&self, id: Uuid, f: impl FnOnce(&WeeklyPlan) -> T) -> EngineResult<T> {
        let entry = self.plans.get(&id).ok_or(EngineError::PlanNotFound(id))?;
        let guard = entry
            .read()
            .map_err(|_| EngineError::invalid_input("plan lock poisoned"))?;
        Ok(f(&guard))
    }

    /// Run a mutation under the plan's write lock
    ///
    /// Writers for the same plan id are serialized here; the closure's
    /// changes become visible to readers atomically when the lock drops.
    /// A closure error leaves the stored plan untouched only if the closure
    /// itself mutates nothing before failing, which is the discipline every
    /// engine mutation path (validate first, then commit) follows.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlanNotFound` for an unknown id, or the
    /// closure's error.
    pub fn mutate<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut WeeklyPlan) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let entry = self.plans.get(&id).ok_or(EngineError::PlanNotFound(id))?;
        let mut guard = entry
            .write()
            .map_err(|_| EngineError::invalid_input("plan lock poisoned"))?;
        f(&mut guard)
    }
}
