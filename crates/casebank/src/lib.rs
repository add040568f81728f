//! # Casebank
//!
//! Case bank memory engine for agent fleets.
//!
//! Agents record decision episodes as cases: the state they observed,
//! the action they took, and the scalar reward they obtained. Before
//! acting, an agent can retrieve the most similar past cases and bias
//! its decision toward what worked; a monitoring dashboard polls the
//! same bank for rolling success-rate telemetry.
//!
//! ## Key Concepts
//!
//! - **Case**: one (state, action, reward) episode plus store-assigned
//!   id and timestamp
//! - **Similarity retrieval**: top-K nearest cases under a pluggable
//!   metric over fixed-dimension state vectors
//! - **Aggregates**: incrementally maintained count, mean reward, and
//!   success rate, all-time and over a trailing window
//! - **Eviction**: a value score (reward minus an age penalty) bounds
//!   the bank's size without discarding rare successes first
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        CaseBank                           │
//! │  ┌────────────┐  ┌─────────────┐  ┌───────────────────┐   │
//! │  │   Ingest   │  │ QueryTopK   │  │  Stats / Pages    │   │
//! │  └─────┬──────┘  └──────┬──────┘  └────────┬──────────┘   │
//! │        │                │                  │              │
//! │  ┌─────┴────────────────┴──────────────────┴──────────┐   │
//! │  │ InMemoryStore   SimilarityIndex   RewardAggregator │   │
//! │  │        (eviction policy keeps them in sync)        │   │
//! │  └────────────────────────────────────────────────────┘   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! The HTTP layer in [`http`] exposes the read-only telemetry surface
//! the dashboard polls; producers and reasoning agents call the
//! [`CaseBank`] API directly.

pub mod bank;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod infra;

// Re-export core types
pub use bank::{CaseBank, RetrievedCase};
pub use config::CaseBankConfig;
pub use domain::case::{Case, CaseDraft, CaseId, StateVector};
pub use domain::index::{ScoredCase, SimilarityIndex};
pub use domain::similarity::{
    CosineSimilarity, EuclideanSimilarity, SimilarityMetric, StateSimilarity,
};
pub use domain::stats::{StatsSnapshot, WindowSnapshot};
pub use error::{CaseBankError, Result};
pub use infra::case_store::{CaseStore, InMemoryStore};
pub use infra::journal::{CaseJournal, MemoryJournal, NullJournal};

/// Casebank version
pub const CASEBANK_VERSION: &str = "0.1.0";

/// Default capacity bound enforced by eviction
pub const DEFAULT_MAX_CASES: usize = 10_000;

/// Default success threshold (reward at or above counts as success)
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 0.7;

/// Default weight of rank-order age in the eviction value score
pub const DEFAULT_AGE_PENALTY: f64 = 0.3;

/// Default trailing-window length, in cases
pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// Default page size for recent-case reads
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Default mutation count between full aggregate recomputes
pub const DEFAULT_RECOMPUTE_INTERVAL: u64 = 10_000;
