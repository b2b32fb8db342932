//! Engine - the facade external collaborators call
//!
//! Wires the analyzer, cache, resolver, edit sessions, and repository
//! together. All collaborators are injected at construction; the engine
//! holds no hidden process-wide state. Commits are all-or-nothing:
//! plan record and version snapshot land together or not at all, so no
//! failure path leaves a partial plan or a dangling version behind.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::analyzer::{Analyzer, PlanContext};
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::domain::{ChangeSource, Plan, PlanVersion, TimeBlock};
use crate::edit::{EditDelta, EditSession, EditState, PlanLocks};
use crate::error::EngineError;
use crate::llm::LlmClient;
use crate::normalize::{self, PlanWarning};
use crate::repo::PlanRepository;
use crate::resolve::{self, Resolution};

/// Result of plan creation: the saved plan plus everything the caller
/// should surface to the user
#[derive(Debug)]
pub struct PlanCreation {
    pub plan: Plan,
    pub warnings: Vec<PlanWarning>,
    pub resolution: Resolution,
}

/// Result of applying one edit delta
///
/// Re-analysis can regenerate the working copy, so any normalization
/// warnings ride along for the caller to surface. Structural deltas
/// produce none.
#[derive(Debug)]
pub struct EditOutcome {
    pub state: EditState,
    pub warnings: Vec<PlanWarning>,
}

/// The plan analysis and scheduling engine
pub struct Engine {
    analyzer: Analyzer,
    cache: ResponseCache,
    repo: Arc<dyn PlanRepository>,
    locks: PlanLocks,
    config: Config,
}

impl Engine {
    /// Build an engine from injected collaborators
    pub fn new(llm: Arc<dyn LlmClient>, repo: Arc<dyn PlanRepository>, config: Config) -> Self {
        let analyzer = Analyzer::new(llm, config.engine.clone(), &config.llm);
        let cache = ResponseCache::new(config.cache.capacity);
        Self {
            analyzer,
            cache,
            repo,
            locks: PlanLocks::new(),
            config,
        }
    }

    /// Analyze raw text into a new draft plan and persist it
    ///
    /// Conflict and capacity findings ride along in the result; they
    /// never block creation.
    pub async fn create_plan(
        &self,
        user_id: i64,
        text: &str,
        preferred_blocks: Vec<TimeBlock>,
    ) -> Result<PlanCreation, EngineError> {
        self.create_plan_at(user_id, text, preferred_blocks, Local::now().naive_local())
            .await
    }

    /// `create_plan` with an explicit clock, for deterministic callers
    pub async fn create_plan_at(
        &self,
        user_id: i64,
        text: &str,
        preferred_blocks: Vec<TimeBlock>,
        now: NaiveDateTime,
    ) -> Result<PlanCreation, EngineError> {
        let mut context = PlanContext::new(user_id, now);
        context.preferred_blocks = preferred_blocks;

        let key = ResponseCache::key(text, &context);
        let draft = self
            .cache
            .get_or_compute(&key, || self.analyzer.analyze(text, &context))
            .await?;

        let (plan, warnings) = normalize::normalize(&draft, user_id, text, &self.config.engine)?;

        // Resolve against every date the plan touches, not just today
        let mut dates = plan.scheduled_dates();
        if !dates.contains(&now.date()) {
            dates.push(now.date());
        }
        let commitments = self.repo.load_commitments(user_id, &dates, None).await?;
        let resolution = resolve::resolve(&plan, &commitments, &self.config.engine);

        let version = PlanVersion::snapshot_of(&plan, ChangeSource::Assistant);
        self.repo.save_commit(&plan, &version).await?;

        info!(
            plan_id = %plan.id,
            user_id,
            steps = plan.steps.len(),
            clear = resolution.is_clear(),
            "create_plan: created"
        );
        Ok(PlanCreation {
            plan,
            warnings,
            resolution,
        })
    }

    /// Open an edit session on a plan
    ///
    /// Fails with `PlanLocked` while another session holds the plan.
    /// The working copy derives from the last committed state.
    pub async fn begin_edit(&self, plan_id: &str, user_id: i64) -> Result<EditSession, EngineError> {
        let lock = self.locks.try_acquire(plan_id)?;

        let plan = self.repo.load_plan(plan_id).await?;
        if plan.user_id != user_id {
            // Existence of other users' plans is not disclosed
            return Err(EngineError::PlanNotFound {
                plan_id: plan_id.to_string(),
            });
        }

        Ok(EditSession::new(plan, lock))
    }

    /// Apply one delta inside an edit session
    ///
    /// Structural deltas mutate the working copy directly. Free text
    /// triggers a full re-analysis, retried within the session's budget
    /// on schema failures. Any failure leaves the session ready for
    /// another delta until the budget is spent.
    pub async fn apply_edit(&self, session: &mut EditSession, delta: EditDelta) -> Result<EditOutcome, EngineError> {
        let is_describe = !delta.is_structural();
        let state = session.apply(delta)?;
        if !is_describe {
            return Ok(EditOutcome {
                state,
                warnings: Vec::new(),
            });
        }

        let mut context = PlanContext::new(session.user_id(), Local::now().naive_local());
        let user_id = session.user_id();

        loop {
            let text = session.begin_analysis()?;
            context.now = Local::now().naive_local();

            match self.analyzer.analyze(&text, &context).await {
                Ok(draft) => match normalize::normalize(&draft, user_id, &text, &self.config.engine) {
                    Ok((plan, warnings)) => {
                        let state = session.complete_analysis(plan)?;
                        return Ok(EditOutcome { state, warnings });
                    }
                    Err(e) => {
                        warn!(plan_id = %session.plan_id(), error = %e, "apply_edit: analysis produced no usable plan");
                        let _ = session.fail_analysis()?;
                        return Err(e);
                    }
                },
                Err(e @ EngineError::SchemaValidation(_)) => {
                    warn!(plan_id = %session.plan_id(), error = %e, "apply_edit: analysis round failed");
                    if session.fail_analysis()? {
                        session.requeue_text(text)?;
                        continue;
                    }
                    return Err(e);
                }
                Err(e) => {
                    // Non-schema failures spend the same retry budget
                    let _ = session.fail_analysis()?;
                    return Err(e);
                }
            }
        }
    }

    /// Commit the session's working copy as the next plan version
    ///
    /// Bumps the version by exactly 1 and persists the immutable
    /// snapshot and the live plan record together.
    pub async fn commit_edit(&self, session: EditSession) -> Result<PlanVersion, EngineError> {
        let source = session.change_source();
        let (mut plan, lock) = session.commit()?;
        plan.version += 1;

        let version = PlanVersion::snapshot_of(&plan, source);
        self.repo.save_commit(&plan, &version).await?;

        info!(plan_id = %plan.id, version = plan.version, "commit_edit: committed");
        drop(lock);
        Ok(version)
    }

    /// Discard an edit session without committing
    pub fn abandon_edit(&self, session: EditSession) {
        session.abandon();
    }

    /// Re-run conflict resolution for a saved plan on a given date
    pub async fn check_conflicts(
        &self,
        plan_id: &str,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Resolution, EngineError> {
        let plan = self.repo.load_plan(plan_id).await?;
        if plan.user_id != user_id {
            return Err(EngineError::PlanNotFound {
                plan_id: plan_id.to_string(),
            });
        }

        let mut dates = plan.scheduled_dates();
        if !dates.contains(&date) {
            dates.push(date);
        }
        let commitments = self.repo.load_commitments(user_id, &dates, Some(plan_id)).await?;
        Ok(resolve::resolve(&plan, &commitments, &self.config.engine))
    }

    /// Fetch a plan for display
    pub async fn load_plan(&self, plan_id: &str) -> Result<Plan, EngineError> {
        self.repo.load_plan(plan_id).await
    }

    /// Saved version history of a plan, oldest first
    pub async fn list_versions(&self, plan_id: &str) -> Result<Vec<PlanVersion>, EngineError> {
        self.repo.list_versions(plan_id).await
    }

    /// Connectivity probe against the configured model
    pub async fn test_connection(&self) -> bool {
        self.analyzer.test_connection().await
    }

    /// Cache (hits, misses) since startup
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }
}
