//! PlanD - plan analysis and scheduling engine
//!
//! PlanD turns free-text task descriptions into time-blocked,
//! prioritized plans via a language model, detects scheduling conflicts
//! against existing commitments, and supports multi-turn editing with
//! versioned history.
//!
//! # Core Concepts
//!
//! - **Strict inference boundary**: model output is schema-validated
//!   before anything downstream touches it
//! - **Immutable history**: every commit snapshots the plan as a new
//!   version; old versions are never rewritten
//! - **Pure resolution**: conflict checking never mutates; it reports
//!   and the caller decides
//! - **Injected state**: cache, locks, and repository are constructor
//!   arguments, not process-wide singletons
//!
//! # Modules
//!
//! - [`llm`] - LLM client trait and OpenAI implementation
//! - [`analyzer`] - inference boundary with schema validation
//! - [`normalize`] - draft to domain Plan conversion
//! - [`resolve`] - conflict and capacity resolution
//! - [`edit`] - edit session state machine and per-plan locks
//! - [`engine`] - the facade external collaborators call
//! - [`config`] - configuration types and loading

pub mod analyzer;
pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod draft;
pub mod edit;
pub mod engine;
pub mod error;
pub mod llm;
pub mod normalize;
pub mod repo;
pub mod resolve;

pub use config::Config;
pub use engine::{EditOutcome, Engine, PlanCreation};
pub use error::EngineError;
