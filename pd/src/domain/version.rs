//! PlanVersion - immutable snapshots of a plan's edit history
//!
//! A version is an append-only record: once written it is never
//! mutated, and its step set is an owned deep copy of the plan at
//! commit time, immune to later edits.

use std::collections::HashMap;

use planstore::{IndexValue, Record, now_ms};
use serde::{Deserialize, Serialize};

use super::plan::Plan;

/// Who authored the change captured by a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSource {
    /// Applied directly by the user (structural deltas)
    User,
    /// Produced by model analysis
    Assistant,
}

impl std::fmt::Display for ChangeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// An immutable snapshot of a Plan at a point in edit history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanVersion {
    /// Unique identifier: `{plan_id}:v{version}`
    pub id: String,

    /// Plan this version belongs to
    pub plan_id: String,

    /// Monotonic version counter per plan
    pub version: u32,

    /// Who authored this change
    pub source: ChangeSource,

    /// Deep copy of the plan and its steps at commit time
    pub snapshot: Plan,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl PlanVersion {
    /// Snapshot a plan at its current version
    ///
    /// The snapshot is cloned from the plan, so later step mutation on
    /// the live plan cannot reach it.
    pub fn snapshot_of(plan: &Plan, source: ChangeSource) -> Self {
        Self {
            id: format!("{}:v{}", plan.id, plan.version),
            plan_id: plan.id.clone(),
            version: plan.version,
            source,
            snapshot: plan.clone(),
            created_at: now_ms(),
        }
    }
}

impl Record for PlanVersion {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        // Versions are immutable; creation time is the only time
        self.created_at
    }

    fn collection_name() -> &'static str {
        "plan_versions"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("plan".to_string(), IndexValue::String(self.plan_id.clone()));
        fields.insert("version".to_string(), IndexValue::Int(self.version as i64));
        fields.insert("source".to_string(), IndexValue::String(self.source.to_string()));
        fields
    }
}
