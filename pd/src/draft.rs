//! StructuredPlanDraft - validated model output, pre-normalization
//!
//! The wire schema is parsed strictly: required fields must be present
//! with the right types, durations must be positive, priorities must be
//! one of low/medium/high. Anything else is a schema violation whose
//! message is fed back to the model as correction context.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Priority, TimeBlock};

/// Format accepted for explicit step start times
const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Unvalidated wire shape of the model output
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DraftWire {
    title: String,
    estimated_total_minutes: i64,
    #[serde(default)]
    optimal_time: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    steps: Vec<DraftStepWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DraftStepWire {
    title: String,
    duration_minutes: i64,
    priority: String,
    #[serde(default)]
    start_time: Option<String>,
}

/// One step of a validated draft
#[derive(Debug, Clone, PartialEq)]
pub struct DraftStep {
    pub title: String,
    pub duration_minutes: u32,
    pub priority: Priority,
    /// Explicit start time suggested by the model, if any
    pub start_time: Option<NaiveDateTime>,
}

/// Validated structured output from the inference step
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredPlanDraft {
    pub title: String,
    pub estimated_total_minutes: u32,
    /// Block the model suggests for the plan as a whole
    pub optimal_time: Option<TimeBlock>,
    pub priority: Priority,
    pub steps: Vec<DraftStep>,
}

/// Parse and validate raw model output into a draft
///
/// The error string doubles as correction context for the re-ask, so it
/// names the offending field precisely.
pub fn parse_draft(content: &str) -> Result<StructuredPlanDraft, String> {
    let stripped = strip_code_fences(content);

    let wire: DraftWire =
        serde_json::from_str(stripped).map_err(|e| format!("response is not valid draft JSON: {}", e))?;

    if wire.title.trim().is_empty() {
        return Err("field 'title' must be a non-empty string".to_string());
    }

    if wire.estimated_total_minutes <= 0 {
        return Err(format!(
            "field 'estimated_total_minutes' must be > 0, got {}",
            wire.estimated_total_minutes
        ));
    }
    let estimated_total_minutes = u32::try_from(wire.estimated_total_minutes).map_err(|_| {
        format!(
            "field 'estimated_total_minutes' is out of range, got {}",
            wire.estimated_total_minutes
        )
    })?;

    let optimal_time = match &wire.optimal_time {
        Some(s) => Some(
            s.parse::<TimeBlock>()
                .map_err(|_| format!("field 'optimal_time' must be morning/afternoon/evening, got '{}'", s))?,
        ),
        None => None,
    };

    let priority = match &wire.priority {
        Some(s) => s
            .parse::<Priority>()
            .map_err(|_| format!("field 'priority' must be low/medium/high, got '{}'", s))?,
        None => Priority::default(),
    };

    let mut steps = Vec::with_capacity(wire.steps.len());
    for (i, step) in wire.steps.iter().enumerate() {
        if step.title.trim().is_empty() {
            return Err(format!("steps[{}].title must be a non-empty string", i));
        }
        if step.duration_minutes <= 0 {
            return Err(format!(
                "steps[{}].duration_minutes must be > 0, got {}",
                i, step.duration_minutes
            ));
        }
        let duration_minutes = u32::try_from(step.duration_minutes)
            .map_err(|_| format!("steps[{}].duration_minutes is out of range, got {}", i, step.duration_minutes))?;
        let step_priority = step
            .priority
            .parse::<Priority>()
            .map_err(|_| format!("steps[{}].priority must be low/medium/high, got '{}'", i, step.priority))?;
        let start_time = match &step.start_time {
            Some(s) => Some(NaiveDateTime::parse_from_str(s, START_TIME_FORMAT).map_err(|_| {
                format!("steps[{}].start_time must match 'YYYY-MM-DD HH:MM', got '{}'", i, s)
            })?),
            None => None,
        };

        steps.push(DraftStep {
            title: step.title.trim().to_string(),
            duration_minutes,
            priority: step_priority,
            start_time,
        });
    }

    Ok(StructuredPlanDraft {
        title: wire.title.trim().to_string(),
        estimated_total_minutes,
        optimal_time,
        priority,
        steps,
    })
}

/// Strip markdown code fences the model sometimes wraps JSON in
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
