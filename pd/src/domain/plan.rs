//! Plan and PlanStep domain types
//!
//! A Plan is one user's unit of work: a titled, prioritized set of
//! time-blocked steps produced by analysis and refined through edit
//! sessions. Step ordinals always form a dense 0..N-1 sequence; every
//! mutating operation renumbers atomically.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use planstore::{IndexValue, Record, now_ms};
use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::priority::Priority;
use crate::error::EngineError;

/// Coarse daily bucket used when no explicit start time is given
///
/// Enum order is the deterministic tie-break order for resolver output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeBlock {
    Morning,
    #[default]
    Afternoon,
    Evening,
}

impl TimeBlock {
    /// All blocks in tie-break order
    pub const ALL: [TimeBlock; 3] = [TimeBlock::Morning, TimeBlock::Afternoon, TimeBlock::Evening];

    /// Map an hour of day to its block: 06-12 morning, 12-18 afternoon,
    /// 18-23 evening. Hours outside those ranges have no block.
    pub fn from_hour(hour: u32) -> Option<Self> {
        match hour {
            6..=11 => Some(Self::Morning),
            12..=17 => Some(Self::Afternoon),
            18..=22 => Some(Self::Evening),
            _ => None,
        }
    }
}

impl std::fmt::Display for TimeBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Morning => write!(f, "morning"),
            Self::Afternoon => write!(f, "afternoon"),
            Self::Evening => write!(f, "evening"),
        }
    }
}

impl std::str::FromStr for TimeBlock {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            _ => Err(format!("Unknown time block: {}", s)),
        }
    }
}

/// When a step is scheduled: a coarse block, or an explicit start time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSchedule {
    /// Coarse daily bucket
    Block(TimeBlock),
    /// Explicit start time; the step occupies [start, start + duration)
    At(NaiveDateTime),
}

impl StepSchedule {
    /// The block this schedule falls in, if any
    pub fn block(&self) -> Option<TimeBlock> {
        match self {
            Self::Block(block) => Some(*block),
            Self::At(start) => TimeBlock::from_hour(start.hour()),
        }
    }

    /// Explicit start time, if any
    pub fn start_time(&self) -> Option<NaiveDateTime> {
        match self {
            Self::At(start) => Some(*start),
            Self::Block(_) => None,
        }
    }
}

/// Plan status in the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Being refined via edit sessions
    #[default]
    Draft,
    /// Accepted by the user, steps in progress
    Active,
    /// All steps done
    Completed,
    /// User cancelled
    Abandoned,
}

impl PlanStatus {
    /// Check whether a direct transition to `to` is allowed
    ///
    /// Only draft -> active and active -> {completed, abandoned} exist.
    pub fn can_transition(self, to: PlanStatus) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Active)
                | (Self::Active, Self::Completed)
                | (Self::Active, Self::Abandoned)
        )
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// One atomic action within a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Unique identifier (e.g., "019430-step-draft-slides")
    pub id: String,

    /// Parent plan id
    pub plan_id: String,

    /// Position within the plan; dense 0..N-1, unique per plan
    pub ordinal: u32,

    /// Human-readable title
    pub title: String,

    /// Estimated duration in minutes, always > 0
    pub duration_minutes: u32,

    /// Time block or explicit start time
    pub schedule: StepSchedule,

    /// Priority for ordering within the block
    pub priority: Priority,

    /// Completion flag
    pub done: bool,
}

impl PlanStep {
    /// Create a new step; the ordinal is assigned by the owning Plan
    pub fn new(plan_id: impl Into<String>, title: impl Into<String>, duration_minutes: u32) -> Self {
        let title = title.into();
        Self {
            id: generate_id("step", &title),
            plan_id: plan_id.into(),
            ordinal: 0,
            title,
            duration_minutes,
            schedule: StepSchedule::Block(TimeBlock::default()),
            priority: Priority::default(),
            done: false,
        }
    }

    /// Set the schedule (builder style)
    pub fn with_schedule(mut self, schedule: StepSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Set the priority (builder style)
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// A Plan is one user's unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Unique identifier (e.g., "019430-plan-prepare-presentation")
    pub id: String,

    /// Owning user
    pub user_id: i64,

    /// Human-readable title
    pub title: String,

    /// Free-text description the plan was analyzed from
    pub description: String,

    /// Current version number; bumped by exactly 1 per commit
    pub version: u32,

    /// Overall priority
    pub priority: Priority,

    /// Total estimated duration in minutes
    pub total_minutes: u32,

    /// Current status in the workflow
    pub status: PlanStatus,

    /// Owned steps, ordered by ordinal
    pub steps: Vec<PlanStep>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Plan {
    /// Create a new empty Plan in draft status at version 1
    pub fn new(user_id: i64, title: impl Into<String>, description: impl Into<String>) -> Self {
        let title = title.into();
        let now = now_ms();
        Self {
            id: generate_id("plan", &title),
            user_id,
            title,
            description: description.into(),
            version: 1,
            priority: Priority::default(),
            total_minutes: 0,
            status: PlanStatus::Draft,
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the plan to a new status, enforcing the transition graph
    ///
    /// Activation additionally requires at least one step.
    pub fn transition(&mut self, to: PlanStatus) -> Result<(), EngineError> {
        if !self.status.can_transition(to) {
            return Err(EngineError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        if to == PlanStatus::Active && self.steps.is_empty() {
            return Err(EngineError::EmptyPlan);
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    /// Append a step, assigning the next ordinal
    pub fn add_step(&mut self, mut step: PlanStep) {
        step.ordinal = self.steps.len() as u32;
        step.plan_id = self.id.clone();
        self.steps.push(step);
        self.recompute();
    }

    /// Remove the step at `ordinal`, renumbering the remainder
    pub fn remove_step(&mut self, ordinal: u32) -> Result<PlanStep, EngineError> {
        let index = self.step_index(ordinal)?;
        let removed = self.steps.remove(index);
        self.recompute();
        Ok(removed)
    }

    /// Move the step at `from` to position `to`, renumbering atomically
    pub fn reorder_step(&mut self, from: u32, to: u32) -> Result<(), EngineError> {
        let from_index = self.step_index(from)?;
        let to_index = self.step_index(to)?;
        let step = self.steps.remove(from_index);
        self.steps.insert(to_index, step);
        self.recompute();
        Ok(())
    }

    /// Change a step's estimated duration
    pub fn change_duration(&mut self, ordinal: u32, minutes: u32) -> Result<(), EngineError> {
        if minutes == 0 {
            return Err(EngineError::InvalidDuration { minutes });
        }
        let index = self.step_index(ordinal)?;
        self.steps[index].duration_minutes = minutes;
        self.recompute();
        Ok(())
    }

    /// Total duration of steps assigned to the given block
    pub fn block_minutes(&self, block: TimeBlock) -> u32 {
        self.steps
            .iter()
            .filter(|s| s.schedule.block() == Some(block))
            .map(|s| s.duration_minutes)
            .sum()
    }

    /// Check if the plan is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, PlanStatus::Completed | PlanStatus::Abandoned)
    }

    /// Distinct calendar dates occupied by explicit-time steps, sorted
    pub fn scheduled_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .steps
            .iter()
            .filter_map(|s| s.schedule.start_time())
            .map(|t| t.date())
            .collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    fn step_index(&self, ordinal: u32) -> Result<usize, EngineError> {
        self.steps
            .iter()
            .position(|s| s.ordinal == ordinal)
            .ok_or(EngineError::StepNotFound { ordinal })
    }

    /// Renumber ordinals densely and refresh the duration total
    fn recompute(&mut self) {
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.ordinal = i as u32;
        }
        self.total_minutes = self.steps.iter().map(|s| s.duration_minutes).sum();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = now_ms();
    }
}

impl Record for Plan {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "plans"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("user".to_string(), IndexValue::Int(self.user_id));
        fields.insert("status".to_string(), IndexValue::String(self.status.to_string()));
        fields.insert("priority".to_string(), IndexValue::String(self.priority.to_string()));
        fields
    }
}
