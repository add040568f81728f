//! The case bank facade
//!
//! [`CaseBank`] wires the store, similarity index, reward aggregator,
//! eviction policy, and journal into the operations producers and
//! readers actually call. The ingest pipeline is:
//!
//! ```text
//! validate -> store append -> journal -> aggregator observe
//!          -> index insert -> capacity sweep -> drift valve
//! ```
//!
//! A case is visible to readers as soon as the store append returns;
//! index and journal trouble degrade with a warning instead of
//! rejecting the producer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::CaseBankConfig;
use crate::domain::case::{Case, CaseDraft, CaseId, StateVector};
use crate::domain::eviction::EvictionPolicy;
use crate::domain::index::SimilarityIndex;
use crate::domain::similarity::StateSimilarity;
use crate::domain::stats::{RewardAggregator, StatsSnapshot};
use crate::error::{CaseBankError, Result};
use crate::infra::case_store::{CaseStore, InMemoryStore};
use crate::infra::journal::{CaseJournal, NullJournal};

/// A case returned from similarity retrieval, with its score and rank.
///
/// Holds its own reference to the case, so a result set stays valid
/// even if the case is evicted right after the query returns.
#[derive(Debug, Clone)]
pub struct RetrievedCase {
    pub case: Arc<Case>,
    pub score: f32,
    pub rank: usize,
}

/// One case bank instance: store, index, aggregates, and eviction
/// behind a single handle. Cheap to share via `Arc`.
pub struct CaseBank {
    store: Arc<dyn CaseStore>,
    index: SimilarityIndex,
    aggregator: RewardAggregator,
    eviction: EvictionPolicy,
    journal: Arc<dyn CaseJournal>,
    max_cases: usize,
    recompute_interval: u64,
    retrievals_served: AtomicU64,
}

impl CaseBank {
    /// Build a bank from configuration with the default in-memory
    /// store, the configured metric, and no durability backend.
    pub fn new(config: &CaseBankConfig) -> Self {
        Self::with_parts(
            Arc::new(InMemoryStore::new()),
            config.retrieval.metric.build(),
            Arc::new(NullJournal),
            config,
        )
    }

    /// Build a bank from explicit parts. This is the seam for a custom
    /// similarity scorer, an alternative store, or a real journal.
    pub fn with_parts(
        store: Arc<dyn CaseStore>,
        metric: Arc<dyn StateSimilarity>,
        journal: Arc<dyn CaseJournal>,
        config: &CaseBankConfig,
    ) -> Self {
        Self {
            store,
            index: SimilarityIndex::new(metric, config.retrieval.state_dim),
            aggregator: RewardAggregator::new(
                config.stats.success_threshold,
                config.stats.window_size,
            ),
            eviction: EvictionPolicy::new(config.storage.age_penalty),
            journal,
            max_cases: config.storage.max_cases,
            recompute_interval: config.stats.recompute_interval,
            retrievals_served: AtomicU64::new(0),
        }
    }

    /// Ingest one decision episode. Returns the assigned id once the
    /// case is visible to readers. Fails only on validation; never on
    /// contention.
    pub async fn ingest(&self, draft: CaseDraft) -> Result<CaseId> {
        let case = self.store.append(draft).await?;

        if let Err(err) = self.journal.append(&case).await {
            warn!(case_id = %case.case_id, %err, "journal append failed");
        }

        self.aggregator.observe(case.case_id, case.reward);
        self.index
            .insert(case.case_id, case.seq, case.state.clone());

        debug!(
            case_id = %case.case_id,
            agent = %case.agent,
            reward = case.reward,
            "case ingested"
        );

        self.enforce_capacity().await;
        self.maybe_rebuild().await;

        Ok(case.case_id)
    }

    /// Point lookup by id.
    pub async fn get(&self, id: &CaseId) -> Result<Arc<Case>> {
        self.store
            .get(id)
            .await
            .ok_or(CaseBankError::NotFound(*id))
    }

    /// Most recent cases, descending timestamp. A consistent snapshot
    /// for the duration of the call; calling twice with no intervening
    /// ingest returns identical pages.
    pub async fn recent_page(
        &self,
        limit: usize,
        before: Option<DateTime<Utc>>,
        agent: Option<&str>,
    ) -> Vec<Arc<Case>> {
        self.store.recent_page(limit, before, agent).await
    }

    /// Top-k most similar known cases for a query state, descending by
    /// score with recency breaking ties. Empty bank or degraded index
    /// yields an empty result, never an error.
    pub async fn query_top_k(&self, state: &StateVector, k: usize) -> Vec<RetrievedCase> {
        let hits = self.index.query_top_k(state, k);

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            // A case evicted between the index scan and this lookup is
            // simply dropped from the result set.
            if let Some(case) = self.store.get(&hit.case_id).await {
                results.push((case, hit.score));
            }
        }

        self.retrievals_served
            .fetch_add(results.len() as u64, Ordering::Relaxed);

        results
            .into_iter()
            .enumerate()
            .map(|(rank, (case, score))| RetrievedCase { case, score, rank })
            .collect()
    }

    /// Current aggregate statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.aggregator.snapshot()
    }

    /// Live case count.
    pub async fn count(&self) -> usize {
        self.store.count().await
    }

    /// Live case count for one producing agent.
    pub async fn count_for_agent(&self, agent: &str) -> usize {
        self.store.count_for_agent(agent).await
    }

    /// Number of distinct producing agents with live cases.
    pub async fn unique_agents(&self) -> usize {
        self.store.unique_agents().await
    }

    /// Total retrieval results served since startup.
    pub fn retrievals_served(&self) -> u64 {
        self.retrievals_served.load(Ordering::Relaxed)
    }

    /// Evict lowest-value cases until the capacity bound holds. Runs at
    /// the end of every ingest; a failed sweep leaves the bound
    /// transiently exceeded and is retried on the next ingest.
    async fn enforce_capacity(&self) {
        while self.store.count().await > self.max_cases {
            let ordered = self.store.snapshot_ordered().await;
            let Some(victim) = self.eviction.select_victim(&ordered) else {
                break;
            };
            if let Err(err) = self.evict_one(&victim).await {
                warn!(case_id = %victim, %err, "eviction failed, will retry on next ingest");
                break;
            }
        }
    }

    async fn evict_one(&self, id: &CaseId) -> Result<()> {
        let removed = self
            .store
            .remove(id)
            .await
            .map_err(|err| CaseBankError::CapacityMaintenance {
                reason: err.to_string(),
            })?;

        self.index.remove(id);
        self.aggregator.unobserve(removed.case_id, removed.reward);
        if let Err(err) = self.journal.retract(id).await {
            warn!(case_id = %id, %err, "journal retract failed");
        }

        info!(
            case_id = %removed.case_id,
            agent = %removed.agent,
            reward = removed.reward,
            "case evicted"
        );
        Ok(())
    }

    /// Periodic full recompute of the aggregates from the live store,
    /// cancelling incremental drift.
    async fn maybe_rebuild(&self) {
        if self.aggregator.rebuild_due(self.recompute_interval) {
            let ordered = self.store.snapshot_ordered().await;
            self.aggregator.rebuild(ordered.iter().map(|c| c.as_ref()));
            debug!(live = ordered.len(), "aggregates rebuilt from live store");
        }
    }
}
