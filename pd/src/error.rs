//! Engine error taxonomy
//!
//! Every fatal error carries a stable code for the transport layer to
//! map to user-facing messages. Warning-level findings (duration caps,
//! block capacity) are data in reports, not errors - see
//! [`crate::normalize::PlanWarning`] and [`crate::resolve::ConflictReport`].

use thiserror::Error;

use crate::llm::LlmError;
use planstore::StoreError;

/// Errors surfaced by the plan analysis engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Input too large: {chars} chars exceeds the {max} char limit")]
    InputTooLarge { chars: usize, max: usize },

    #[error("Input text is empty")]
    EmptyInput,

    #[error("Inference unavailable after {attempts} attempts: {last_error}")]
    InferenceUnavailable { attempts: u32, last_error: String },

    #[error("Model output failed schema validation: {0}")]
    SchemaValidation(String),

    #[error("Analysis produced a plan with no steps")]
    EmptyPlan,

    #[error("Plan {plan_id} is locked by another edit session")]
    PlanLocked { plan_id: String },

    #[error("Plan not found: {plan_id}")]
    PlanNotFound { plan_id: String },

    #[error("No step with ordinal {ordinal}")]
    StepNotFound { ordinal: u32 },

    #[error("Invalid step duration: {minutes} minutes")]
    InvalidDuration { minutes: u32 },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Edit session in state {state} cannot accept {event}")]
    InvalidSessionEvent { state: String, event: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

impl EngineError {
    /// Stable error code for transport-layer message mapping
    pub fn code(&self) -> &'static str {
        match self {
            Self::InputTooLarge { .. } => "input_too_large",
            Self::EmptyInput => "empty_input",
            Self::InferenceUnavailable { .. } => "inference_unavailable",
            Self::SchemaValidation(_) => "schema_validation",
            Self::EmptyPlan => "empty_plan",
            Self::PlanLocked { .. } => "plan_locked",
            Self::PlanNotFound { .. } => "plan_not_found",
            Self::StepNotFound { .. } => "step_not_found",
            Self::InvalidDuration { .. } => "invalid_duration",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidSessionEvent { .. } => "invalid_session_event",
            Self::Store(_) => "store",
            Self::Llm(_) => "llm",
        }
    }

    /// Whether retrying the same operation could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InferenceUnavailable { .. } | Self::PlanLocked { .. } => true,
            Self::Llm(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            EngineError::InputTooLarge { chars: 10, max: 5 }.code(),
            "input_too_large"
        );
        assert_eq!(EngineError::EmptyPlan.code(), "empty_plan");
        assert_eq!(
            EngineError::PlanLocked {
                plan_id: "p".to_string()
            }
            .code(),
            "plan_locked"
        );
        assert_eq!(
            EngineError::SchemaValidation("bad".to_string()).code(),
            "schema_validation"
        );
    }

    #[test]
    fn test_transience() {
        assert!(
            EngineError::InferenceUnavailable {
                attempts: 3,
                last_error: "timeout".to_string()
            }
            .is_transient()
        );
        assert!(
            EngineError::PlanLocked {
                plan_id: "p".to_string()
            }
            .is_transient()
        );
        assert!(!EngineError::EmptyPlan.is_transient());
        assert!(!EngineError::SchemaValidation("x".to_string()).is_transient());
    }
}
