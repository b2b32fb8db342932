//! TimeSlot - occupied intervals for conflict detection
//!
//! A derived view over steps that carry explicit start times. Slots are
//! never persisted on their own; they exist only while a resolve pass
//! runs. Interval comparison is half-open: [start, end) vs [start, end),
//! so a slot ending at 10:00 does not conflict with one starting at 10:00.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::plan::{Plan, PlanStep};

/// An occupied interval belonging to one plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Owning user
    pub user_id: i64,

    /// Plan the interval came from; slots from the same plan never conflict
    pub plan_id: String,

    /// Step title, carried for report readability
    pub label: String,

    /// Interval start (inclusive)
    pub start: NaiveDateTime,

    /// Interval end (exclusive)
    pub end: NaiveDateTime,
}

impl TimeSlot {
    /// Build the slot for a step, if it has an explicit start time
    pub fn from_step(plan: &Plan, step: &PlanStep) -> Option<Self> {
        let start = step.schedule.start_time()?;
        Some(Self {
            user_id: plan.user_id,
            plan_id: plan.id.clone(),
            label: step.title.clone(),
            start,
            end: start + Duration::minutes(step.duration_minutes as i64),
        })
    }

    /// Half-open overlap test
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Overlap test that ignores slots from the same plan
    pub fn conflicts_with(&self, other: &TimeSlot) -> bool {
        self.plan_id != other.plan_id && self.overlaps(other)
    }

    /// Block the slot's start hour falls in, if any
    pub fn block(&self) -> Option<super::plan::TimeBlock> {
        use chrono::Timelike;
        super::plan::TimeBlock::from_hour(self.start.hour())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn slot(plan_id: &str, start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeSlot {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        TimeSlot {
            user_id: 7,
            plan_id: plan_id.to_string(),
            label: "slot".to_string(),
            start: date.and_hms_opt(start_h, start_m, 0).unwrap(),
            end: date.and_hms_opt(end_h, end_m, 0).unwrap(),
        }
    }

    #[test]
    fn test_overlapping_slots() {
        let a = slot("p1", 9, 0, 10, 0);
        let b = slot("p2", 9, 30, 10, 30);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(a.conflicts_with(&b));
    }

    #[test]
    fn test_touching_boundary_is_not_overlap() {
        let a = slot("p1", 9, 0, 10, 0);
        let b = slot("p2", 10, 0, 11, 0);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_same_plan_never_conflicts() {
        let a = slot("p1", 9, 0, 10, 0);
        let b = slot("p1", 9, 30, 10, 30);
        assert!(a.overlaps(&b));
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn test_containment_is_overlap() {
        let outer = slot("p1", 9, 0, 12, 0);
        let inner = slot("p2", 10, 0, 11, 0);
        assert!(outer.conflicts_with(&inner));
        assert!(inner.conflicts_with(&outer));
    }

    #[test]
    fn test_from_step() {
        use crate::domain::{StepSchedule, TimeBlock};

        let mut plan = Plan::new(7, "Slots", "");
        let start = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap();
        plan.add_step(PlanStep::new("p", "timed", 90).with_schedule(StepSchedule::At(start)));
        plan.add_step(
            PlanStep::new("p", "blocked", 30).with_schedule(StepSchedule::Block(TimeBlock::Morning)),
        );

        let timed = TimeSlot::from_step(&plan, &plan.steps[0]).unwrap();
        assert_eq!(timed.start, start);
        assert_eq!(timed.end, start + Duration::minutes(90));
        assert_eq!(timed.plan_id, plan.id);

        assert!(TimeSlot::from_step(&plan, &plan.steps[1]).is_none());
    }
}
