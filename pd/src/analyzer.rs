//! Analyzer - the inference client boundary
//!
//! Wraps the LLM call for plan analysis: input limits, a
//! schema-constrained prompt, strict validation of the output, and a
//! single corrective re-ask when the model returns malformed JSON.
//! Transport-level retry (timeouts, 5xx, rate limits) lives in the
//! LLM client itself.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::config::{EngineConfig, LlmConfig};
use crate::domain::TimeBlock;
use crate::draft::{StructuredPlanDraft, parse_draft};
use crate::error::EngineError;
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, Message, StopReason};

/// Per-call context that shapes the analysis prompt
#[derive(Debug, Clone)]
pub struct PlanContext {
    /// Owning user
    pub user_id: i64,

    /// "Now" for resolving relative time language ("tomorrow", "3pm")
    pub now: NaiveDateTime,

    /// Blocks the user prefers work scheduled into, if any
    pub preferred_blocks: Vec<TimeBlock>,
}

impl PlanContext {
    /// Context with no preferences
    pub fn new(user_id: i64, now: NaiveDateTime) -> Self {
        Self {
            user_id,
            now,
            preferred_blocks: Vec::new(),
        }
    }

    /// Stable fingerprint of the preference fields that affect output
    ///
    /// Combined into the cache key so different preferences never share
    /// a cached analysis.
    pub fn preference_fingerprint(&self) -> String {
        let blocks: Vec<String> = self.preferred_blocks.iter().map(ToString::to_string).collect();
        blocks.join(",")
    }
}

/// Analyzer turns free text into a validated StructuredPlanDraft
pub struct Analyzer {
    llm: Arc<dyn LlmClient>,
    engine: EngineConfig,
    max_tokens: u32,
    max_retries: u32,
}

impl Analyzer {
    /// Create a new analyzer
    pub fn new(llm: Arc<dyn LlmClient>, engine: EngineConfig, llm_config: &LlmConfig) -> Self {
        Self {
            llm,
            engine,
            max_tokens: llm_config.max_tokens,
            max_retries: llm_config.max_retries,
        }
    }

    /// Analyze task text into a structured draft
    ///
    /// Malformed or truncated model output gets exactly one corrective
    /// re-ask with the validation error appended, then surfaces
    /// `SchemaValidation`.
    pub async fn analyze(&self, text: &str, context: &PlanContext) -> Result<StructuredPlanDraft, EngineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::EmptyInput);
        }
        if text.chars().count() > self.engine.max_input_chars {
            return Err(EngineError::InputTooLarge {
                chars: text.chars().count(),
                max: self.engine.max_input_chars,
            });
        }

        info!(user_id = context.user_id, text_len = text.len(), "analyze: called");

        let mut messages = vec![Message::user(text)];
        let response = self.request(context, messages.clone()).await?;

        match Self::validate(response) {
            Ok(draft) => Ok(draft),
            Err((raw, schema_error)) => {
                warn!(%schema_error, "analyze: schema violation, issuing correction retry");
                messages.push(Message::assistant(&raw));
                messages.push(Message::user(format!(
                    "Your previous response failed validation: {}. \
                     Respond again with only the corrected JSON object.",
                    schema_error
                )));

                let corrected = self.request(context, messages).await?;
                Self::validate(corrected).map_err(|(_, e)| EngineError::SchemaValidation(e))
            }
        }
    }

    /// Cheap connectivity probe for `pd check`
    pub async fn test_connection(&self) -> bool {
        let request = CompletionRequest {
            system_prompt: "Reply with the single word: ok".to_string(),
            messages: vec![Message::user("ping")],
            max_tokens: 10,
            json: false,
        };

        match self.llm.complete(request).await {
            Ok(response) => response.content.is_some(),
            Err(e) => {
                warn!(error = %e, "test_connection: failed");
                false
            }
        }
    }

    /// One completion round; maps transport errors to the engine taxonomy
    async fn request(&self, context: &PlanContext, messages: Vec<Message>) -> Result<CompletionResponse, EngineError> {
        let request = CompletionRequest {
            system_prompt: self.build_system_prompt(context),
            messages,
            max_tokens: self.max_tokens,
            json: true,
        };

        self.llm.complete(request).await.map_err(|e| {
            if e.is_retryable() {
                // The client already exhausted its retries internally
                EngineError::InferenceUnavailable {
                    attempts: self.max_retries + 1,
                    last_error: e.to_string(),
                }
            } else {
                EngineError::Llm(e)
            }
        })
    }

    /// Validate one response into a draft
    ///
    /// Truncation and missing content are schema failures like any
    /// other, so they get the same correction round. Failures carry the
    /// raw content back for the re-ask transcript.
    fn validate(response: CompletionResponse) -> Result<StructuredPlanDraft, (String, String)> {
        let raw = response.content.unwrap_or_default();
        if response.stop_reason == StopReason::MaxTokens {
            return Err((raw, "response truncated before the JSON object completed".to_string()));
        }
        if raw.is_empty() {
            return Err((raw, "response contained no content".to_string()));
        }
        match parse_draft(&raw) {
            Ok(draft) => Ok(draft),
            Err(e) => Err((raw, e)),
        }
    }

    /// Build the schema-constrained system prompt
    fn build_system_prompt(&self, context: &PlanContext) -> String {
        let mut prompt = format!(
            "{}\n\nCurrent date and time: {}\n",
            ANALYSIS_PROMPT,
            context.now.format("%Y-%m-%d %H:%M")
        );

        if !context.preferred_blocks.is_empty() {
            prompt.push_str("The user prefers work scheduled in these blocks:\n");
            for block in &context.preferred_blocks {
                prompt.push_str(&format!("- {}\n", block));
            }
        }

        prompt
    }
}

/// System prompt for plan analysis
///
/// The JSON shape here is the wire schema enforced by [`parse_draft`].
const ANALYSIS_PROMPT: &str = r#"You are an experienced task planner. Analyze the task description and break it into an ordered sequence of concrete steps with realistic durations.

When analyzing, consider:
1. Urgency and importance of the task
2. The best time of day to do the work (morning/afternoon/evening)
3. Decomposition into small, atomic steps
4. A realistic duration in minutes for each step

Respond with a single JSON object, nothing else:
{
  "title": "short plan title",
  "estimated_total_minutes": total duration in minutes,
  "optimal_time": "morning" | "afternoon" | "evening",
  "priority": "low" | "medium" | "high",
  "steps": [
    {
      "title": "step title",
      "duration_minutes": duration in minutes (> 0),
      "priority": "low" | "medium" | "high",
      "start_time": "YYYY-MM-DD HH:MM" (only when the task names an explicit time)
    }
  ]
}"#;
