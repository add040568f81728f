//! Durable-log contract
//!
//! Durability is behind an abstract seam: the bank appends every
//! ingested case and retracts every eviction, and a backend decides
//! what durable means. Journal failures are logged by the caller and
//! never fail a well-formed ingest.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::case::{Case, CaseId};
use crate::error::Result;

/// Append-only durability contract for case records.
#[async_trait]
pub trait CaseJournal: Send + Sync {
    /// Record an ingested case.
    async fn append(&self, case: &Case) -> Result<()>;

    /// Record an eviction.
    async fn retract(&self, id: &CaseId) -> Result<()>;
}

/// Discards everything; the default when no durability backend is
/// wired in.
pub struct NullJournal;

#[async_trait]
impl CaseJournal for NullJournal {
    async fn append(&self, _case: &Case) -> Result<()> {
        Ok(())
    }

    async fn retract(&self, _id: &CaseId) -> Result<()> {
        Ok(())
    }
}

/// One replayable journal record.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalRecord {
    Appended { case_id: CaseId, reward: f64 },
    Retracted { case_id: CaseId },
}

/// Keeps records in memory; used by tests to check replayability.
#[derive(Default)]
pub struct MemoryJournal {
    records: RwLock<Vec<JournalRecord>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<JournalRecord> {
        self.records.read().clone()
    }
}

#[async_trait]
impl CaseJournal for MemoryJournal {
    async fn append(&self, case: &Case) -> Result<()> {
        self.records.write().push(JournalRecord::Appended {
            case_id: case.case_id,
            reward: case.reward,
        });
        Ok(())
    }

    async fn retract(&self, id: &CaseId) -> Result<()> {
        self.records
            .write()
            .push(JournalRecord::Retracted { case_id: *id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::case::StateVector;
    use chrono::Utc;
    use serde_json::json;

    fn case(reward: f64) -> Case {
        Case {
            case_id: CaseId::generate(),
            seq: 0,
            agent: "qa_agent".into(),
            state: StateVector::new(vec![1.0]),
            action: json!("noop"),
            reward,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_journal_replays_in_order() {
        let journal = MemoryJournal::new();
        let a = case(0.9);
        let b = case(0.2);

        journal.append(&a).await.unwrap();
        journal.append(&b).await.unwrap();
        journal.retract(&b.case_id).await.unwrap();

        let records = journal.records();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            JournalRecord::Appended {
                case_id: a.case_id,
                reward: 0.9
            }
        );
        assert_eq!(
            records[2],
            JournalRecord::Retracted {
                case_id: b.case_id
            }
        );
    }

    #[tokio::test]
    async fn test_null_journal_accepts_everything() {
        let journal = NullJournal;
        assert!(journal.append(&case(0.5)).await.is_ok());
        assert!(journal.retract(&CaseId::generate()).await.is_ok());
    }
}
