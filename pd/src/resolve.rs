//! Conflict and time-block resolver
//!
//! A pure function over a plan and the user's existing commitments. It
//! never mutates anything; callers decide what to do with the report.
//! Interval conflicts use half-open semantics and only count across
//! different plans. Block capacity overruns are warnings, not conflicts.

use std::collections::HashMap;

use tracing::debug;

use crate::config::EngineConfig;
use crate::domain::{Plan, TimeBlock, TimeSlot};

/// The user's existing schedule, as seen by the resolver
///
/// Explicit-time steps of other plans appear as slots; block-level
/// steps contribute only to per-block minute totals.
#[derive(Debug, Clone, Default)]
pub struct Commitments {
    pub slots: Vec<TimeSlot>,
    pub block_minutes: HashMap<TimeBlock, u32>,
}

impl Commitments {
    pub fn minutes_in(&self, block: TimeBlock) -> u32 {
        self.block_minutes.get(&block).copied().unwrap_or(0)
    }
}

/// Two intervals from different plans overlapping
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictPair {
    /// The slot from the plan under resolution
    pub step: TimeSlot,
    /// The commitment it collides with
    pub existing: TimeSlot,
}

impl std::fmt::Display for ConflictPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' ({} - {}) overlaps '{}' ({} - {})",
            self.step.label,
            self.step.start.format("%H:%M"),
            self.step.end.format("%H:%M"),
            self.existing.label,
            self.existing.start.format("%H:%M"),
            self.existing.end.format("%H:%M"),
        )
    }
}

/// A block whose scheduled minutes exceed its configured length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityExceeded {
    pub block: TimeBlock,
    pub scheduled_minutes: u32,
    pub capacity_minutes: u32,
}

impl std::fmt::Display for CapacityExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} block holds {} minutes of work against a {} minute capacity",
            self.block, self.scheduled_minutes, self.capacity_minutes
        )
    }
}

/// Everything the resolver found wrong, plus ranked ways out
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictReport {
    /// Every conflicting pair, in plan step order
    pub conflicts: Vec<ConflictPair>,
    /// Blocks over capacity
    pub capacity: Vec<CapacityExceeded>,
    /// Alternative blocks, best first
    pub alternatives: Vec<TimeBlock>,
}

/// A plan that cleared interval conflict checks
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlan {
    pub plan_id: String,
    /// Capacity overruns are reported even on a clear resolution
    pub capacity: Vec<CapacityExceeded>,
}

/// Outcome of conflict resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Clear(ResolvedPlan),
    Conflicts(ConflictReport),
}

impl Resolution {
    pub fn is_clear(&self) -> bool {
        matches!(self, Self::Clear(_))
    }

    /// Capacity findings regardless of variant
    pub fn capacity(&self) -> &[CapacityExceeded] {
        match self {
            Self::Clear(resolved) => &resolved.capacity,
            Self::Conflicts(report) => &report.capacity,
        }
    }
}

/// Resolve a plan against existing commitments
///
/// Interval conflicts come only from explicit-time steps; block-level
/// steps can at most push a block over capacity.
pub fn resolve(plan: &Plan, commitments: &Commitments, config: &EngineConfig) -> Resolution {
    let plan_slots: Vec<TimeSlot> = plan
        .steps
        .iter()
        .filter_map(|step| TimeSlot::from_step(plan, step))
        .collect();

    let mut conflicts = Vec::new();
    for slot in &plan_slots {
        for existing in &commitments.slots {
            if slot.conflicts_with(existing) {
                conflicts.push(ConflictPair {
                    step: slot.clone(),
                    existing: existing.clone(),
                });
            }
        }
    }

    let capacity = capacity_findings(plan, commitments, config);

    debug!(
        plan_id = %plan.id,
        conflicts = conflicts.len(),
        over_capacity = capacity.len(),
        "resolve: checked"
    );

    if conflicts.is_empty() {
        return Resolution::Clear(ResolvedPlan {
            plan_id: plan.id.clone(),
            capacity,
        });
    }

    let alternatives = rank_alternatives(plan, commitments, &conflicts);
    Resolution::Conflicts(ConflictReport {
        conflicts,
        capacity,
        alternatives,
    })
}

/// Blocks whose combined scheduled minutes exceed the configured length
fn capacity_findings(plan: &Plan, commitments: &Commitments, config: &EngineConfig) -> Vec<CapacityExceeded> {
    TimeBlock::ALL
        .into_iter()
        .filter_map(|block| {
            let scheduled = plan.block_minutes(block) + commitments.minutes_in(block);
            (scheduled > config.block_length_minutes).then_some(CapacityExceeded {
                block,
                scheduled_minutes: scheduled,
                capacity_minutes: config.block_length_minutes,
            })
        })
        .collect()
}

/// Rank alternative blocks for conflicted work
///
/// Order: fewest commitment slots landing in the block, then closeness
/// to the originally requested block, then lowest utilization. Ties
/// fall back to enum order, keeping output reproducible.
fn rank_alternatives(plan: &Plan, commitments: &Commitments, conflicts: &[ConflictPair]) -> Vec<TimeBlock> {
    let requested = conflicts
        .first()
        .and_then(|pair| pair.step.block())
        .unwrap_or_default();

    let mut candidates: Vec<TimeBlock> = TimeBlock::ALL.to_vec();
    candidates.sort_by_key(|&block| {
        let slot_count = commitments
            .slots
            .iter()
            .filter(|slot| slot.block() == Some(block))
            .count();
        let distance = (block as i32 - requested as i32).unsigned_abs();
        let utilization = plan.block_minutes(block) + commitments.minutes_in(block);
        (slot_count, distance, utilization, block)
    });
    candidates
}
