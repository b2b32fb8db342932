//! Edit session state machine
//!
//! States: Created -> AwaitingEditInput -> Analyzing ->
//! AwaitingConfirmation -> Committed, with Abandoned and Failed as the
//! other terminals. Structural deltas (remove, reorder, duration, add)
//! apply locally to the working copy; adding free text routes through a
//! full re-analysis. The working copy derives from the last committed
//! version and is discarded on abandon.

use tracing::{debug, info, warn};

use crate::domain::{ChangeSource, Plan, PlanStep};
use crate::error::EngineError;

use super::locks::PlanLockGuard;

/// Schema failures tolerated per analysis before the session fails
pub const MAX_ANALYZE_RETRIES: u32 = 2;

/// Where an edit session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Created,
    AwaitingEditInput,
    Analyzing,
    AwaitingConfirmation,
    Committed,
    Abandoned,
    Failed,
}

impl EditState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Abandoned | Self::Failed)
    }
}

impl std::fmt::Display for EditState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::AwaitingEditInput => "awaiting_edit_input",
            Self::Analyzing => "analyzing",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Committed => "committed",
            Self::Abandoned => "abandoned",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// One edit applied within a session
#[derive(Debug, Clone, PartialEq)]
pub enum EditDelta {
    AddStep { title: String, duration_minutes: u32 },
    RemoveStep { ordinal: u32 },
    Reorder { from: u32, to: u32 },
    ChangeDuration { ordinal: u32, minutes: u32 },
    /// Free text requiring a full re-analysis
    Describe(String),
}

impl EditDelta {
    /// Structural deltas apply locally without calling the model
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Describe(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AddStep { .. } => "add_step",
            Self::RemoveStep { .. } => "remove_step",
            Self::Reorder { .. } => "reorder",
            Self::ChangeDuration { .. } => "change_duration",
            Self::Describe(_) => "describe",
        }
    }
}

/// An in-progress edit of one plan
///
/// Holds the per-plan lock for its whole lifetime; dropping the session
/// releases the plan.
pub struct EditSession {
    plan_id: String,
    user_id: i64,
    state: EditState,
    /// Working copy, derived from the last committed version
    working: Plan,
    /// Free text queued for the next analysis round
    pending_text: Option<String>,
    analyze_failures: u32,
    /// Whether any applied change came from model analysis
    analyzed: bool,
    lock: PlanLockGuard,
}

impl EditSession {
    /// Open a session over a plan whose lock was just acquired
    pub fn new(plan: Plan, lock: PlanLockGuard) -> Self {
        info!(plan_id = %plan.id, version = plan.version, "new: edit session opened");
        Self {
            plan_id: plan.id.clone(),
            user_id: plan.user_id,
            state: EditState::Created,
            working: plan,
            pending_text: None,
            analyze_failures: 0,
            analyzed: false,
            lock,
        }
    }

    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    /// Current working copy
    pub fn working(&self) -> &Plan {
        &self.working
    }

    /// Apply a delta to the working copy
    ///
    /// Structural deltas mutate locally and land in AwaitingConfirmation.
    /// Describe queues text and lands in AwaitingEditInput; the caller
    /// then drives `begin_analysis`.
    pub fn apply(&mut self, delta: EditDelta) -> Result<EditState, EngineError> {
        if !matches!(
            self.state,
            EditState::Created | EditState::AwaitingEditInput | EditState::AwaitingConfirmation
        ) {
            return Err(self.invalid_event(delta.name()));
        }

        debug!(plan_id = %self.plan_id, delta = delta.name(), "apply: delta");
        match delta {
            EditDelta::AddStep { title, duration_minutes } => {
                if duration_minutes == 0 {
                    return Err(EngineError::InvalidDuration { minutes: 0 });
                }
                let step = PlanStep::new(&self.plan_id, title, duration_minutes);
                self.working.add_step(step);
                self.state = EditState::AwaitingConfirmation;
            }
            EditDelta::RemoveStep { ordinal } => {
                self.working.remove_step(ordinal)?;
                self.state = EditState::AwaitingConfirmation;
            }
            EditDelta::Reorder { from, to } => {
                self.working.reorder_step(from, to)?;
                self.state = EditState::AwaitingConfirmation;
            }
            EditDelta::ChangeDuration { ordinal, minutes } => {
                self.working.change_duration(ordinal, minutes)?;
                self.state = EditState::AwaitingConfirmation;
            }
            EditDelta::Describe(text) => {
                self.pending_text = Some(text);
                self.state = EditState::AwaitingEditInput;
            }
        }
        Ok(self.state)
    }

    /// Move into Analyzing, handing the caller the text to analyze
    ///
    /// The analysis prompt combines the plan's original description with
    /// the queued edit text so a full re-analysis sees both.
    pub fn begin_analysis(&mut self) -> Result<String, EngineError> {
        if self.state != EditState::AwaitingEditInput {
            return Err(self.invalid_event("begin_analysis"));
        }
        let edit_text = self.pending_text.take().ok_or_else(|| self.invalid_event("begin_analysis"))?;

        self.state = EditState::Analyzing;
        if self.working.description.is_empty() {
            Ok(edit_text)
        } else {
            Ok(format!("{}\n\nAdditional instructions: {}", self.working.description, edit_text))
        }
    }

    /// Record a successful analysis, adopting the re-analyzed plan
    ///
    /// Identity fields (id, user, version, timestamps of creation) stay
    /// with the working copy; content fields come from the new plan.
    pub fn complete_analysis(&mut self, analyzed: Plan) -> Result<EditState, EngineError> {
        if self.state != EditState::Analyzing {
            return Err(self.invalid_event("complete_analysis"));
        }

        self.working.title = analyzed.title;
        self.working.priority = analyzed.priority;
        self.working.description = analyzed.description;
        self.working.steps.clear();
        for step in analyzed.steps {
            self.working.add_step(step);
        }

        self.analyze_failures = 0;
        self.analyzed = true;
        self.state = EditState::AwaitingConfirmation;
        Ok(self.state)
    }

    /// Record a failed analysis round
    ///
    /// Bounded retries: within the budget the session returns to
    /// AwaitingEditInput (the caller re-queues text); beyond it the
    /// session fails terminally. Returns whether another try is allowed.
    pub fn fail_analysis(&mut self) -> Result<bool, EngineError> {
        if self.state != EditState::Analyzing {
            return Err(self.invalid_event("fail_analysis"));
        }

        self.analyze_failures += 1;
        if self.analyze_failures > MAX_ANALYZE_RETRIES {
            warn!(plan_id = %self.plan_id, failures = self.analyze_failures, "fail_analysis: retries exhausted");
            self.state = EditState::Failed;
            Ok(false)
        } else {
            self.state = EditState::AwaitingEditInput;
            Ok(true)
        }
    }

    /// Re-queue text for another analysis round after a failure
    pub fn requeue_text(&mut self, text: impl Into<String>) -> Result<(), EngineError> {
        if self.state != EditState::AwaitingEditInput {
            return Err(self.invalid_event("requeue_text"));
        }
        self.pending_text = Some(text.into());
        Ok(())
    }

    /// Who authored the pending change, for version attribution
    pub fn change_source(&self) -> ChangeSource {
        if self.analyzed {
            ChangeSource::Assistant
        } else {
            ChangeSource::User
        }
    }

    /// Accept the working copy; the caller persists and versions it
    ///
    /// Consumes the session. The returned guard keeps the plan locked
    /// until the caller finishes persisting.
    pub fn commit(self) -> Result<(Plan, PlanLockGuard), EngineError> {
        if self.state != EditState::AwaitingConfirmation {
            return Err(self.invalid_event("commit"));
        }
        info!(plan_id = %self.plan_id, "commit: session committed");
        Ok((self.working, self.lock))
    }

    /// Discard the working copy; allowed from any non-terminal state
    pub fn abandon(mut self) {
        if !self.state.is_terminal() {
            info!(plan_id = %self.plan_id, state = %self.state, "abandon: session abandoned");
            self.state = EditState::Abandoned;
        }
    }

    fn invalid_event(&self, event: &str) -> EngineError {
        EngineError::InvalidSessionEvent {
            state: self.state.to_string(),
            event: event.to_string(),
        }
    }
}
