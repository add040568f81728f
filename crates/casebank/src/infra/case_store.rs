//! In-memory case storage
//!
//! Append-only record of ingested cases with O(1) point lookup and
//! descending-timestamp pagination. The commit log's write lock is the
//! single serialization point: sequence numbers and timestamps are
//! assigned inside it, so every committed case has a unique sequence
//! and a timestamp that never goes backwards, regardless of how many
//! producers race on ingest.
//!
//! Readers take short read locks and clone `Arc`s out, so a page is a
//! consistent snapshot for the duration of one call and is unaffected
//! by later ingests or evictions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::domain::case::{Case, CaseDraft, CaseId};
use crate::error::{CaseBankError, Result};

/// Storage contract for case records.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Append a validated draft; assigns id, sequence, and timestamp.
    /// Returns only once the case is visible to readers.
    async fn append(&self, draft: CaseDraft) -> Result<Arc<Case>>;

    /// Point lookup by id.
    async fn get(&self, id: &CaseId) -> Option<Arc<Case>>;

    /// Most recent cases in descending timestamp order. `before`
    /// restricts to cases strictly older than the given instant;
    /// `agent` restricts to one producer.
    async fn recent_page(
        &self,
        limit: usize,
        before: Option<DateTime<Utc>>,
        agent: Option<&str>,
    ) -> Vec<Arc<Case>>;

    /// Live case count.
    async fn count(&self) -> usize;

    /// Live case count for one producing agent.
    async fn count_for_agent(&self, agent: &str) -> usize;

    /// Number of distinct producing agents with live cases.
    async fn unique_agents(&self) -> usize;

    /// Remove a case. Eviction path only; there is no caller-facing
    /// delete.
    async fn remove(&self, id: &CaseId) -> Result<Arc<Case>>;

    /// Live cases in ascending commit order.
    async fn snapshot_ordered(&self) -> Vec<Arc<Case>>;
}

struct CommitLog {
    /// Ascending commit order.
    order: Vec<Arc<Case>>,
    next_seq: u64,
    last_timestamp: DateTime<Utc>,
}

/// In-memory storage implementation.
pub struct InMemoryStore {
    /// Point lookups by id.
    cases: DashMap<CaseId, Arc<Case>>,
    /// Live case counts per producing agent.
    by_agent: DashMap<String, u64>,
    log: RwLock<CommitLog>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            cases: DashMap::new(),
            by_agent: DashMap::new(),
            log: RwLock::new(CommitLog {
                order: Vec::new(),
                next_seq: 0,
                last_timestamp: DateTime::<Utc>::MIN_UTC,
            }),
        }
    }

}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaseStore for InMemoryStore {
    async fn append(&self, draft: CaseDraft) -> Result<Arc<Case>> {
        draft.validate()?;

        let case = {
            let mut log = self.log.write();

            let seq = log.next_seq;
            log.next_seq += 1;

            // Clamp so timestamps never decrease in commit order even
            // if the wall clock steps backwards.
            let now = Utc::now();
            let timestamp = if now > log.last_timestamp {
                now
            } else {
                log.last_timestamp
            };
            log.last_timestamp = timestamp;

            let case = Arc::new(Case {
                case_id: CaseId::generate(),
                seq,
                agent: draft.agent,
                state: draft.state,
                action: draft.action,
                reward: draft.reward,
                timestamp,
            });

            // Publish to the point-lookup map before the ordered log so
            // a reader that sees the case in a page can also `get` it.
            self.cases.insert(case.case_id, case.clone());
            *self.by_agent.entry(case.agent.clone()).or_insert(0) += 1;
            log.order.push(case.clone());

            case
        };

        Ok(case)
    }

    async fn get(&self, id: &CaseId) -> Option<Arc<Case>> {
        self.cases.get(id).map(|c| c.clone())
    }

    async fn recent_page(
        &self,
        limit: usize,
        before: Option<DateTime<Utc>>,
        agent: Option<&str>,
    ) -> Vec<Arc<Case>> {
        let log = self.log.read();
        log.order
            .iter()
            .rev()
            .filter(|c| before.map_or(true, |b| c.timestamp < b))
            .filter(|c| agent.map_or(true, |a| c.agent == a))
            .take(limit)
            .cloned()
            .collect()
    }

    async fn count(&self) -> usize {
        self.cases.len()
    }

    async fn count_for_agent(&self, agent: &str) -> usize {
        self.by_agent.get(agent).map(|n| *n as usize).unwrap_or(0)
    }

    async fn unique_agents(&self) -> usize {
        self.by_agent.len()
    }

    async fn remove(&self, id: &CaseId) -> Result<Arc<Case>> {
        let removed = {
            let mut log = self.log.write();
            let position = log
                .order
                .iter()
                .position(|c| &c.case_id == id)
                .ok_or(CaseBankError::NotFound(*id))?;
            let removed = log.order.remove(position);
            self.cases.remove(id);
            removed
        };

        if let Some(mut count) = self.by_agent.get_mut(&removed.agent) {
            *count = count.saturating_sub(1);
        }
        self.by_agent
            .remove_if(&removed.agent, |_, count| *count == 0);

        Ok(removed)
    }

    async fn snapshot_ordered(&self) -> Vec<Arc<Case>> {
        self.log.read().order.clone()
    }
}
