//! Brute-force top-K similarity index
//!
//! Linear scan over the live entries, which the eviction policy bounds
//! to a manageable working set. An approximate nearest-neighbor
//! structure can replace this without changing the external contract.
//!
//! The index is eventually consistent with the store: inserts never
//! fail the ingest path, and problems degrade queries to empty results
//! with a warning rather than erroring at the caller.

use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;

use super::case::{CaseId, StateVector};
use super::similarity::StateSimilarity;

/// One scored hit from [`SimilarityIndex::query_top_k`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCase {
    pub case_id: CaseId,
    pub score: f32,
}

struct IndexEntry {
    case_id: CaseId,
    seq: u64,
    state: StateVector,
}

struct IndexInner {
    entries: Vec<IndexEntry>,
    /// Expected vector dimensionality; 0 until the first insert fixes it.
    dim: usize,
}

/// Secondary index over encoded case states.
pub struct SimilarityIndex {
    metric: Arc<dyn StateSimilarity>,
    inner: RwLock<IndexInner>,
}

impl SimilarityIndex {
    /// Create an index. `expected_dim` of 0 adopts the dimensionality
    /// of the first inserted state.
    pub fn new(metric: Arc<dyn StateSimilarity>, expected_dim: usize) -> Self {
        Self {
            metric,
            inner: RwLock::new(IndexInner {
                entries: Vec::new(),
                dim: expected_dim,
            }),
        }
    }

    /// Insert an encoded state. Called right after a successful ingest;
    /// must not fail the producer, so unindexable entries are skipped
    /// with a warning.
    pub fn insert(&self, case_id: CaseId, seq: u64, state: StateVector) {
        let mut inner = self.inner.write();
        if inner.dim == 0 {
            inner.dim = state.dim();
        }
        if state.dim() != inner.dim {
            warn!(
                %case_id,
                got = state.dim(),
                expected = inner.dim,
                "state dimensionality mismatch, case left unindexed"
            );
            return;
        }
        inner.entries.push(IndexEntry {
            case_id,
            seq,
            state,
        });
    }

    /// Drop a case from the index (eviction sync).
    pub fn remove(&self, case_id: &CaseId) {
        self.inner.write().entries.retain(|e| &e.case_id != case_id);
    }

    /// Number of indexed states.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-k most similar known cases, descending by score. Equal
    /// scores prefer the more recent case. Length is
    /// `min(k, indexed entries)`; an empty index yields an empty vec.
    pub fn query_top_k(&self, state: &StateVector, k: usize) -> Vec<ScoredCase> {
        if k == 0 {
            return Vec::new();
        }

        let inner = self.inner.read();
        if inner.entries.is_empty() {
            return Vec::new();
        }
        if state.dim() != inner.dim {
            warn!(
                got = state.dim(),
                expected = inner.dim,
                metric = self.metric.name(),
                "query dimensionality mismatch, returning no neighbors"
            );
            return Vec::new();
        }

        let mut scored: Vec<(OrderedFloat<f32>, u64, CaseId)> = inner
            .entries
            .iter()
            .map(|e| {
                let score = self.metric.score(e.state.as_slice(), state.as_slice());
                (OrderedFloat(score), e.seq, e.case_id)
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(score, _, case_id)| ScoredCase {
                case_id,
                score: score.into_inner(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::similarity::{CosineSimilarity, SimilarityMetric};

    fn index() -> SimilarityIndex {
        SimilarityIndex::new(Arc::new(CosineSimilarity), 0)
    }

    fn unit(dim: usize, axis: usize) -> StateVector {
        let mut v = vec![0.0f32; dim];
        v[axis] = 1.0;
        StateVector::new(v)
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let idx = index();
        assert!(idx.query_top_k(&unit(4, 0), 5).is_empty());
    }

    #[test]
    fn test_identical_state_ranks_first() {
        let idx = index();
        let a = CaseId::generate();
        let b = CaseId::generate();
        idx.insert(a, 1, unit(4, 0));
        idx.insert(b, 2, unit(4, 1));

        let hits = idx.query_top_k(&unit(4, 0), 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].case_id, a);
        assert!((hits[0].score - 1.0).abs() < 0.001);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_ties_prefer_more_recent() {
        let idx = index();
        let older = CaseId::generate();
        let newer = CaseId::generate();
        // Same vector, so identical scores for any query.
        idx.insert(older, 1, unit(4, 0));
        idx.insert(newer, 2, unit(4, 0));

        let hits = idx.query_top_k(&unit(4, 0), 2);
        assert_eq!(hits[0].case_id, newer);
        assert_eq!(hits[1].case_id, older);
    }

    #[test]
    fn test_k_caps_result_length() {
        let idx = index();
        for i in 0..10 {
            idx.insert(CaseId::generate(), i, unit(4, (i % 4) as usize));
        }
        assert_eq!(idx.query_top_k(&unit(4, 0), 3).len(), 3);
        assert_eq!(idx.query_top_k(&unit(4, 0), 100).len(), 10);
        assert!(idx.query_top_k(&unit(4, 0), 0).is_empty());
    }

    #[test]
    fn test_dimension_mismatch_skips_insert() {
        let idx = SimilarityIndex::new(SimilarityMetric::Cosine.build(), 4);
        idx.insert(CaseId::generate(), 1, unit(4, 0));
        idx.insert(CaseId::generate(), 2, StateVector::new(vec![1.0, 0.0]));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_dimension_mismatch_degrades_query() {
        let idx = index();
        idx.insert(CaseId::generate(), 1, unit(4, 0));
        assert!(idx.query_top_k(&StateVector::new(vec![1.0]), 3).is_empty());
    }

    #[test]
    fn test_remove_keeps_index_in_sync() {
        let idx = index();
        let a = CaseId::generate();
        idx.insert(a, 1, unit(4, 0));
        idx.insert(CaseId::generate(), 2, unit(4, 1));

        idx.remove(&a);
        assert_eq!(idx.len(), 1);
        let hits = idx.query_top_k(&unit(4, 0), 5);
        assert!(hits.iter().all(|h| h.case_id != a));
    }

    #[test]
    fn test_scores_non_increasing() {
        let idx = index();
        for i in 0..6 {
            let mut v = vec![0.0f32; 3];
            v[0] = 1.0;
            v[1] = i as f32 * 0.2;
            idx.insert(CaseId::generate(), i, StateVector::new(v));
        }
        let hits = idx.query_top_k(&unit(3, 0), 6);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
