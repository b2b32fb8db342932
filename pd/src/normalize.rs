//! Normalizer - draft to domain Plan
//!
//! Takes a validated StructuredPlanDraft and produces a Plan in draft
//! status at version 1. Scheduling falls back in order: a step's
//! explicit start time, then the draft's suggested block, then the
//! afternoon default. Overlong durations are preserved and flagged as
//! warnings, never truncated.

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::domain::{Plan, PlanStep, StepSchedule, TimeBlock};
use crate::draft::StructuredPlanDraft;
use crate::error::EngineError;

/// Non-fatal finding from normalization, reported alongside the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanWarning {
    /// A step's duration exceeds the configured per-step limit
    DurationExceedsLimit { ordinal: u32, minutes: u32, max: u32 },
    /// An explicit start time falls outside every block (23:00-06:00)
    OutsideBlocks { ordinal: u32, hour: u32 },
}

impl std::fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DurationExceedsLimit { ordinal, minutes, max } => {
                write!(
                    f,
                    "step {} takes {} minutes, above the {} minute limit",
                    ordinal, minutes, max
                )
            }
            Self::OutsideBlocks { ordinal, hour } => {
                write!(f, "step {} starts at hour {}, outside all time blocks", ordinal, hour)
            }
        }
    }
}

/// Convert a draft into a Plan, collecting warnings along the way
///
/// A draft with no steps is rejected. Step ordinals follow draft order.
pub fn normalize(
    draft: &StructuredPlanDraft,
    user_id: i64,
    description: &str,
    config: &EngineConfig,
) -> Result<(Plan, Vec<PlanWarning>), EngineError> {
    if draft.steps.is_empty() {
        warn!(%draft.title, "normalize: draft has no steps");
        return Err(EngineError::EmptyPlan);
    }

    let mut plan = Plan::new(user_id, &draft.title, description);
    plan.priority = draft.priority;

    let fallback_block = draft.optimal_time.unwrap_or_default();
    let mut warnings = Vec::new();

    for (i, draft_step) in draft.steps.iter().enumerate() {
        let schedule = match draft_step.start_time {
            Some(start) => StepSchedule::At(start),
            None => StepSchedule::Block(fallback_block),
        };

        if let StepSchedule::At(start) = schedule {
            use chrono::Timelike;
            if TimeBlock::from_hour(start.hour()).is_none() {
                warnings.push(PlanWarning::OutsideBlocks {
                    ordinal: i as u32,
                    hour: start.hour(),
                });
            }
        }

        if draft_step.duration_minutes > config.max_duration_minutes {
            warnings.push(PlanWarning::DurationExceedsLimit {
                ordinal: i as u32,
                minutes: draft_step.duration_minutes,
                max: config.max_duration_minutes,
            });
        }

        let step = PlanStep::new(&plan.id, &draft_step.title, draft_step.duration_minutes)
            .with_schedule(schedule)
            .with_priority(draft_step.priority);
        plan.add_step(step);
    }

    debug!(
        plan_id = %plan.id,
        steps = plan.steps.len(),
        total_minutes = plan.total_minutes,
        warnings = warnings.len(),
        "normalize: plan built"
    );

    Ok((plan, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlanStatus, Priority};
    use crate::draft::DraftStep;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn step(title: &str, minutes: u32) -> DraftStep {
        DraftStep {
            title: title.to_string(),
            duration_minutes: minutes,
            priority: Priority::Medium,
            start_time: None,
        }
    }

    fn draft_with(steps: Vec<DraftStep>) -> StructuredPlanDraft {
        StructuredPlanDraft {
            title: "Prepare presentation".to_string(),
            estimated_total_minutes: steps.iter().map(|s| s.duration_minutes).sum(),
            optimal_time: Some(TimeBlock::Morning),
            priority: Priority::High,
            steps,
        }
    }

    #[test]
    fn test_normalize_basic() {
        let draft = draft_with(vec![step("a", 30), step("b", 45)]);
        let (plan, warnings) = normalize(&draft, 7, "prep the talk", &EngineConfig::default()).unwrap();

        assert_eq!(plan.title, "Prepare presentation");
        assert_eq!(plan.description, "prep the talk");
        assert_eq!(plan.user_id, 7);
        assert_eq!(plan.version, 1);
        assert_eq!(plan.status, PlanStatus::Draft);
        assert_eq!(plan.priority, Priority::High);
        assert_eq!(plan.total_minutes, 75);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_empty_draft_rejected() {
        let draft = draft_with(vec![]);
        assert!(matches!(
            normalize(&draft, 7, "", &EngineConfig::default()),
            Err(EngineError::EmptyPlan)
        ));
    }

    #[test]
    fn test_block_fallback_chain() {
        let explicit = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(19, 0, 0)
            .unwrap();
        let mut timed = step("timed", 30);
        timed.start_time = Some(explicit);

        let draft = draft_with(vec![timed, step("untimed", 30)]);
        let (plan, _) = normalize(&draft, 7, "", &EngineConfig::default()).unwrap();

        // Explicit time wins over the draft's suggested block
        assert_eq!(plan.steps[0].schedule, StepSchedule::At(explicit));
        assert_eq!(plan.steps[0].schedule.block(), Some(TimeBlock::Evening));
        // No explicit time falls back to the draft's optimal_time
        assert_eq!(plan.steps[1].schedule, StepSchedule::Block(TimeBlock::Morning));
    }

    #[test]
    fn test_default_block_when_no_suggestion() {
        let mut draft = draft_with(vec![step("a", 30)]);
        draft.optimal_time = None;
        let (plan, _) = normalize(&draft, 7, "", &EngineConfig::default()).unwrap();
        assert_eq!(plan.steps[0].schedule, StepSchedule::Block(TimeBlock::Afternoon));
    }

    #[test]
    fn test_overlong_duration_warned_not_truncated() {
        let draft = draft_with(vec![step("marathon", 600)]);
        let (plan, warnings) = normalize(&draft, 7, "", &EngineConfig::default()).unwrap();

        // Value preserved
        assert_eq!(plan.steps[0].duration_minutes, 600);
        assert_eq!(
            warnings,
            vec![PlanWarning::DurationExceedsLimit {
                ordinal: 0,
                minutes: 600,
                max: 480
            }]
        );
    }

    #[test]
    fn test_start_outside_blocks_warned() {
        let late = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        let mut timed = step("night owl", 30);
        timed.start_time = Some(late);

        let draft = draft_with(vec![timed]);
        let (plan, warnings) = normalize(&draft, 7, "", &EngineConfig::default()).unwrap();

        assert_eq!(plan.steps[0].schedule.block(), None);
        assert_eq!(warnings, vec![PlanWarning::OutsideBlocks { ordinal: 0, hour: 23 }]);
    }

    proptest! {
        #[test]
        fn prop_ordinals_dense_and_total_consistent(durations in prop::collection::vec(1u32..500, 1..20)) {
            let steps: Vec<DraftStep> = durations
                .iter()
                .enumerate()
                .map(|(i, d)| step(&format!("s{}", i), *d))
                .collect();
            let draft = draft_with(steps);

            let (plan, _) = normalize(&draft, 7, "", &EngineConfig::default()).unwrap();

            for (i, s) in plan.steps.iter().enumerate() {
                prop_assert_eq!(s.ordinal, i as u32);
            }
            prop_assert_eq!(plan.total_minutes, durations.iter().sum::<u32>());
        }
    }
}
