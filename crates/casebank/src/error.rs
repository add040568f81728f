//! Error types for the case bank
//!
//! No variant here is fatal to the process: ingest favors availability
//! for producers, retrieval degrades instead of failing, and capacity
//! maintenance retries on the next write.

use thiserror::Error;

use crate::domain::case::CaseId;

/// Result type alias using CaseBankError
pub type Result<T> = std::result::Result<T, CaseBankError>;

/// Unified error type for case bank operations
#[derive(Debug, Error)]
pub enum CaseBankError {
    /// Rejected at ingest validation; the case never enters the store.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Unknown case id on a point lookup.
    #[error("case not found: {0}")]
    NotFound(CaseId),

    /// Transient index trouble. Retrieval callers receive degraded
    /// (empty or partial) results instead of this error; it is surfaced
    /// only on maintenance paths.
    #[error("similarity index unavailable: {reason}")]
    IndexUnavailable { reason: String },

    /// Eviction could not complete; retried on the next ingest.
    #[error("capacity maintenance failed: {reason}")]
    CapacityMaintenance { reason: String },

    /// Durable-log append or retract failure.
    #[error("journal error: {0}")]
    Journal(String),
}

impl CaseBankError {
    /// Shorthand for an ingest validation failure.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}
