//! Plan repository
//!
//! Persistence boundary for plans, versions, and the commitments view.
//! The trait is the seam; `MemoryRepository` backs it with a planstore
//! `MemoryStore` for tests and single-process use.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use planstore::{Filter, IndexValue, MemoryStore, StoreError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Plan, PlanVersion, TimeSlot};
use crate::error::EngineError;
use crate::resolve::Commitments;

/// Storage operations the engine needs
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Fetch a plan by id
    async fn load_plan(&self, plan_id: &str) -> Result<Plan, EngineError>;

    /// Insert or replace a plan
    async fn save_plan(&self, plan: &Plan) -> Result<(), EngineError>;

    /// Persist an immutable version snapshot
    ///
    /// Versions of one plan must arrive in strictly increasing order;
    /// anything else is a version conflict.
    async fn save_version(&self, version: &PlanVersion) -> Result<(), EngineError>;

    /// Persist a plan and its version snapshot together
    ///
    /// Either both land or neither does: if the plan write fails after
    /// the version was recorded, the version is removed again so the
    /// history never runs ahead of the stored plan.
    async fn save_commit(&self, plan: &Plan, version: &PlanVersion) -> Result<(), EngineError>;

    /// All saved versions of a plan, oldest first
    async fn list_versions(&self, plan_id: &str) -> Result<Vec<PlanVersion>, EngineError>;

    /// The user's existing schedule on the given dates
    ///
    /// Covers non-terminal plans only: explicit-time steps on one of the
    /// dates become slots, block-level steps contribute to per-block
    /// minute totals. The excluded plan (the one under resolution, when
    /// already saved) does not count against itself.
    async fn load_commitments(
        &self,
        user_id: i64,
        dates: &[NaiveDate],
        exclude_plan: Option<&str>,
    ) -> Result<Commitments, EngineError>;
}

/// In-memory repository over a planstore `MemoryStore`
#[derive(Default)]
pub struct MemoryRepository {
    store: MemoryStore,
}

/// Serialized form of the repository for snapshot files
#[derive(Debug, Default, Serialize, Deserialize)]
struct RepositorySnapshot {
    plans: Vec<Plan>,
    versions: Vec<PlanVersion>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a repository from a JSON snapshot file
    ///
    /// A missing file yields an empty repository.
    pub fn load_from(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            debug!(path = %path.display(), "load_from: no snapshot, starting empty");
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(StoreError::from)?;
        let snapshot: RepositorySnapshot = serde_json::from_str(&content).map_err(StoreError::from)?;

        let repo = Self::new();
        for plan in &snapshot.plans {
            repo.store.put(plan)?;
        }
        for version in &snapshot.versions {
            repo.store.put(version)?;
        }

        debug!(
            path = %path.display(),
            plans = snapshot.plans.len(),
            versions = snapshot.versions.len(),
            "load_from: snapshot loaded"
        );
        Ok(repo)
    }

    /// Write the repository to a JSON snapshot file
    pub fn save_to(&self, path: &Path) -> Result<(), EngineError> {
        let snapshot = RepositorySnapshot {
            plans: self.store.list(&[])?,
            versions: self.store.list(&[])?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(StoreError::from)?;
        }
        let content = serde_json::to_string_pretty(&snapshot).map_err(StoreError::from)?;
        fs::write(path, content).map_err(StoreError::from)?;
        Ok(())
    }

    fn highest_version(&self, plan_id: &str) -> Result<u32, StoreError> {
        let versions: Vec<PlanVersion> = self
            .store
            .list(&[Filter::eq("plan", IndexValue::String(plan_id.to_string()))])?;
        Ok(versions.iter().map(|v| v.version).max().unwrap_or(0))
    }
}

#[async_trait]
impl PlanRepository for MemoryRepository {
    async fn load_plan(&self, plan_id: &str) -> Result<Plan, EngineError> {
        self.store.get(plan_id).map_err(|e| {
            if e.is_not_found() {
                EngineError::PlanNotFound {
                    plan_id: plan_id.to_string(),
                }
            } else {
                EngineError::Store(e)
            }
        })
    }

    async fn save_plan(&self, plan: &Plan) -> Result<(), EngineError> {
        debug!(plan_id = %plan.id, version = plan.version, "save_plan: called");
        self.store.put(plan)?;
        Ok(())
    }

    async fn save_version(&self, version: &PlanVersion) -> Result<(), EngineError> {
        let have = self.highest_version(&version.plan_id)?;
        if version.version != have + 1 {
            return Err(EngineError::Store(StoreError::VersionConflict {
                collection: "plan_versions".to_string(),
                id: version.plan_id.clone(),
                have,
                got: version.version,
            }));
        }

        debug!(plan_id = %version.plan_id, version = version.version, "save_version: called");
        self.store.put(version)?;
        Ok(())
    }

    async fn save_commit(&self, plan: &Plan, version: &PlanVersion) -> Result<(), EngineError> {
        self.save_version(version).await?;
        if let Err(e) = self.save_plan(plan).await {
            let _ = self.store.delete::<PlanVersion>(&version.id);
            return Err(e);
        }
        Ok(())
    }

    async fn list_versions(&self, plan_id: &str) -> Result<Vec<PlanVersion>, EngineError> {
        let mut versions: Vec<PlanVersion> = self
            .store
            .list(&[Filter::eq("plan", IndexValue::String(plan_id.to_string()))])?;
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    async fn load_commitments(
        &self,
        user_id: i64,
        dates: &[NaiveDate],
        exclude_plan: Option<&str>,
    ) -> Result<Commitments, EngineError> {
        let plans: Vec<Plan> = self.store.list(&[Filter::eq("user", IndexValue::Int(user_id))])?;

        let mut commitments = Commitments::default();
        for plan in plans
            .iter()
            .filter(|p| !p.is_terminal() && Some(p.id.as_str()) != exclude_plan)
        {
            for step in &plan.steps {
                match TimeSlot::from_step(plan, step) {
                    Some(slot) if dates.contains(&slot.start.date()) => commitments.slots.push(slot),
                    Some(_) => {}
                    None => {
                        if let Some(block) = step.schedule.block() {
                            *commitments.block_minutes.entry(block).or_insert(0) += step.duration_minutes;
                        }
                    }
                }
            }
        }

        debug!(
            user_id,
            dates = dates.len(),
            slots = commitments.slots.len(),
            "load_commitments: loaded"
        );
        Ok(commitments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChangeSource, PlanStatus, PlanStep, StepSchedule, TimeBlock};
    use chrono::NaiveDate;

    fn plan_for(user_id: i64, title: &str) -> Plan {
        let mut plan = Plan::new(user_id, title, "");
        plan.add_step(PlanStep::new(&plan.id.clone(), "work", 60));
        plan
    }

    #[tokio::test]
    async fn test_save_and_load_plan() {
        let repo = MemoryRepository::new();
        let plan = plan_for(7, "Saved Plan");

        repo.save_plan(&plan).await.unwrap();
        let loaded = repo.load_plan(&plan.id).await.unwrap();
        assert_eq!(loaded, plan);
    }

    #[tokio::test]
    async fn test_missing_plan_is_plan_not_found() {
        let repo = MemoryRepository::new();
        let result = repo.load_plan("absent").await;
        assert!(matches!(result, Err(EngineError::PlanNotFound { .. })));
    }

    #[tokio::test]
    async fn test_versions_must_be_monotonic() {
        let repo = MemoryRepository::new();
        let plan = plan_for(7, "Versioned");

        let v1 = PlanVersion::snapshot_of(&plan, ChangeSource::Assistant);
        repo.save_version(&v1).await.unwrap();

        // Same version again is rejected
        let result = repo.save_version(&v1).await;
        assert!(matches!(
            result,
            Err(EngineError::Store(StoreError::VersionConflict { have: 1, got: 1, .. }))
        ));

        // Skipping ahead is rejected
        let mut plan_v3 = plan.clone();
        plan_v3.version = 3;
        let v3 = PlanVersion::snapshot_of(&plan_v3, ChangeSource::User);
        let result = repo.save_version(&v3).await;
        assert!(matches!(
            result,
            Err(EngineError::Store(StoreError::VersionConflict { have: 1, got: 3, .. }))
        ));

        // The next version lands
        let mut plan_v2 = plan.clone();
        plan_v2.version = 2;
        let v2 = PlanVersion::snapshot_of(&plan_v2, ChangeSource::User);
        repo.save_version(&v2).await.unwrap();

        let versions = repo.list_versions(&plan.id).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, 1);
        assert_eq!(versions[1].version, 2);
    }

    #[tokio::test]
    async fn test_commitments_split_by_schedule_kind() {
        let repo = MemoryRepository::new();
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        let mut plan = Plan::new(7, "Existing", "");
        plan.add_step(
            PlanStep::new("", "standup", 30)
                .with_schedule(StepSchedule::At(date.and_hms_opt(9, 0, 0).unwrap())),
        );
        plan.add_step(
            PlanStep::new("", "reading", 90).with_schedule(StepSchedule::Block(TimeBlock::Evening)),
        );
        // A slot on another day is out of scope
        plan.add_step(PlanStep::new("", "later", 30).with_schedule(StepSchedule::At(
            NaiveDate::from_ymd_opt(2025, 3, 20).unwrap().and_hms_opt(9, 0, 0).unwrap(),
        )));
        repo.save_plan(&plan).await.unwrap();

        let commitments = repo.load_commitments(7, &[date], None).await.unwrap();
        assert_eq!(commitments.slots.len(), 1);
        assert_eq!(commitments.slots[0].label, "standup");
        assert_eq!(commitments.minutes_in(TimeBlock::Evening), 90);

        // Asking for both days surfaces both slots
        let later = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let commitments = repo.load_commitments(7, &[date, later], None).await.unwrap();
        assert_eq!(commitments.slots.len(), 2);
    }

    #[tokio::test]
    async fn test_terminal_plans_excluded_from_commitments() {
        let repo = MemoryRepository::new();
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        let mut plan = Plan::new(7, "Done", "");
        plan.add_step(
            PlanStep::new("", "old work", 60)
                .with_schedule(StepSchedule::At(date.and_hms_opt(9, 0, 0).unwrap())),
        );
        plan.transition(PlanStatus::Active).unwrap();
        plan.transition(PlanStatus::Completed).unwrap();
        repo.save_plan(&plan).await.unwrap();

        let commitments = repo.load_commitments(7, &[date], None).await.unwrap();
        assert!(commitments.slots.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plans.json");

        let repo = MemoryRepository::new();
        let plan = plan_for(7, "Snapshotted");
        repo.save_plan(&plan).await.unwrap();
        repo.save_version(&PlanVersion::snapshot_of(&plan, ChangeSource::Assistant))
            .await
            .unwrap();
        repo.save_to(&path).unwrap();

        let restored = MemoryRepository::load_from(&path).unwrap();
        assert_eq!(restored.load_plan(&plan.id).await.unwrap(), plan);
        assert_eq!(restored.list_versions(&plan.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = MemoryRepository::load_from(&dir.path().join("absent.json")).unwrap();
        assert!(repo.load_plan("anything").await.is_err());
    }

    #[tokio::test]
    async fn test_commitments_scoped_to_user() {
        let repo = MemoryRepository::new();
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        let mut other = Plan::new(8, "Someone Else", "");
        other.add_step(
            PlanStep::new("", "their work", 60)
                .with_schedule(StepSchedule::At(date.and_hms_opt(9, 0, 0).unwrap())),
        );
        repo.save_plan(&other).await.unwrap();

        let commitments = repo.load_commitments(7, &[date], None).await.unwrap();
        assert!(commitments.slots.is_empty());
    }

    #[tokio::test]
    async fn test_save_commit_keeps_plan_and_history_in_step() {
        let repo = MemoryRepository::new();
        let plan = plan_for(7, "Committed");

        let v1 = PlanVersion::snapshot_of(&plan, ChangeSource::Assistant);
        repo.save_commit(&plan, &v1).await.unwrap();
        assert_eq!(repo.load_plan(&plan.id).await.unwrap(), plan);
        assert_eq!(repo.list_versions(&plan.id).await.unwrap().len(), 1);

        // A stale version is rejected and the stored plan stays put
        let mut stale = plan.clone();
        stale.title = "Stale".to_string();
        let dup = PlanVersion::snapshot_of(&stale, ChangeSource::User);
        let result = repo.save_commit(&stale, &dup).await;
        assert!(matches!(
            result,
            Err(EngineError::Store(StoreError::VersionConflict { have: 1, got: 1, .. }))
        ));
        assert_eq!(repo.load_plan(&plan.id).await.unwrap().title, "Committed");
        assert_eq!(repo.list_versions(&plan.id).await.unwrap().len(), 1);
    }
}
