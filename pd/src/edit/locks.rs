//! Per-plan edit locks
//!
//! One edit session per plan id at a time. Acquisition is non-blocking;
//! losers get `PlanLocked` and retry later. The guard releases on drop,
//! so an abandoned or panicked session never wedges its plan.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::EngineError;

/// Registry of plan ids with an active edit session
#[derive(Clone, Default)]
pub struct PlanLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl PlanLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to lock a plan for editing
    pub fn try_acquire(&self, plan_id: &str) -> Result<PlanLockGuard, EngineError> {
        let mut held = match self.held.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !held.insert(plan_id.to_string()) {
            debug!(%plan_id, "try_acquire: already locked");
            return Err(EngineError::PlanLocked {
                plan_id: plan_id.to_string(),
            });
        }

        debug!(%plan_id, "try_acquire: locked");
        Ok(PlanLockGuard {
            plan_id: plan_id.to_string(),
            held: self.held.clone(),
        })
    }

    /// Whether a plan currently has an active session
    pub fn is_locked(&self, plan_id: &str) -> bool {
        match self.held.lock() {
            Ok(held) => held.contains(plan_id),
            Err(poisoned) => poisoned.into_inner().contains(plan_id),
        }
    }
}

/// RAII lock on one plan id; released on drop
pub struct PlanLockGuard {
    plan_id: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl PlanLockGuard {
    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }
}

impl Drop for PlanLockGuard {
    fn drop(&mut self) {
        let mut held = match self.held.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        held.remove(&self.plan_id);
        debug!(plan_id = %self.plan_id, "drop: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_acquisition() {
        let locks = PlanLocks::new();
        let guard = locks.try_acquire("plan-a").unwrap();

        assert!(matches!(
            locks.try_acquire("plan-a"),
            Err(EngineError::PlanLocked { .. })
        ));
        assert!(locks.is_locked("plan-a"));

        drop(guard);
        assert!(!locks.is_locked("plan-a"));
        assert!(locks.try_acquire("plan-a").is_ok());
    }

    #[test]
    fn test_different_plans_independent() {
        let locks = PlanLocks::new();
        let _a = locks.try_acquire("plan-a").unwrap();
        let _b = locks.try_acquire("plan-b").unwrap();
        assert!(locks.is_locked("plan-a"));
        assert!(locks.is_locked("plan-b"));
    }
}
