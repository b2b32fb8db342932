//! Plan edit sessions
//!
//! An edit session is a bounded interactive sequence of deltas applied
//! to a working copy of a plan, ending in a single commit (or not).
//! Sessions on the same plan id are mutually exclusive via [`PlanLocks`].

mod locks;
mod session;

pub use locks::{PlanLockGuard, PlanLocks};
pub use session::{EditDelta, EditSession, EditState, MAX_ANALYZE_RETRIES};
