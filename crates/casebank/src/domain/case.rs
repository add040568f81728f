//! Case record types
//!
//! A [`Case`] is one recorded decision episode: the state an agent
//! observed, the action it took, and the scalar reward it obtained.
//! Cases are immutable once ingested; a correction is a new case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CaseBankError, Result};

/// Unique case identifier.
///
/// UUID v7 (time-sortable), assigned by the store at ingest. Never
/// reassigned, even after the case is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(Uuid);

impl CaseId {
    /// Mint a fresh identifier.
    pub(crate) fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for CaseId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Fixed-dimensionality numeric encoding of a decision context.
///
/// Opaque to the engine: the producing agent owns the semantics, the
/// engine only compares vectors through the similarity contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateVector(pub Vec<f32>);

impl StateVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for StateVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// A single decision episode plus store-assigned metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Case {
    /// Store-assigned identifier, unique for the life of the process.
    pub case_id: CaseId,
    /// Commit sequence number assigned by the store; total order and
    /// recency tie-breaker. Not part of the wire contract.
    #[serde(skip)]
    pub seq: u64,
    /// Identifier of the producing agent.
    pub agent: String,
    /// Encoded decision context, never interpreted by the engine.
    pub state: StateVector,
    /// Opaque action descriptor, stored verbatim.
    pub action: serde_json::Value,
    /// Finite reward scalar, higher is better.
    pub reward: f64,
    /// Store-assigned, non-decreasing in commit order.
    pub timestamp: DateTime<Utc>,
}

impl Case {
    /// Whether this case counts as a success at the given threshold.
    pub fn is_success(&self, threshold: f64) -> bool {
        self.reward >= threshold
    }
}

/// Caller-supplied fields for one ingest, validated before a record
/// is created.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseDraft {
    pub agent: String,
    pub state: StateVector,
    pub action: serde_json::Value,
    pub reward: f64,
}

impl CaseDraft {
    pub fn new(
        agent: impl Into<String>,
        state: impl Into<StateVector>,
        action: serde_json::Value,
        reward: f64,
    ) -> Self {
        Self {
            agent: agent.into(),
            state: state.into(),
            action,
            reward,
        }
    }

    /// Ingest validation fast path. A draft that fails here never
    /// enters the store.
    pub fn validate(&self) -> Result<()> {
        if !self.reward.is_finite() {
            return Err(CaseBankError::invalid_input("reward must be finite"));
        }
        if self.agent.trim().is_empty() {
            return Err(CaseBankError::invalid_input("agent must be non-empty"));
        }
        if self.state.dim() == 0 {
            return Err(CaseBankError::invalid_input("state must be non-empty"));
        }
        match &self.action {
            serde_json::Value::Null => {
                Err(CaseBankError::invalid_input("action must be non-empty"))
            }
            serde_json::Value::String(s) if s.trim().is_empty() => {
                Err(CaseBankError::invalid_input("action must be non-empty"))
            }
            _ => Ok(()),
        }
    }
}
