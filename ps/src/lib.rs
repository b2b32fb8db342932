//! PlanStore - generic record persistence contract for PlanD
//!
//! Provides the `Record` trait plus an in-memory `MemoryStore` used by
//! the engine's repository layer and by tests. Durable relational
//! storage lives behind the same contract in a separate deployment
//! concern and is not part of this crate.

pub mod error;
pub mod record;
pub mod store;

pub use error::StoreError;
pub use record::{Filter, FilterOp, IndexValue, Record, now_ms};
pub use store::MemoryStore;
