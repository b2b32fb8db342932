//! Domain types for the plan analysis engine
//!
//! Everything a plan is made of: the plan itself, its steps, immutable
//! version snapshots, time slots for conflict detection, priorities,
//! and ID generation.

mod id;
mod plan;
mod priority;
mod timeslot;
mod version;

pub use id::{DomainId, generate_id};
pub use plan::{Plan, PlanStatus, PlanStep, StepSchedule, TimeBlock};
pub use priority::Priority;
pub use timeslot::TimeSlot;
pub use version::{ChangeSource, PlanVersion};
