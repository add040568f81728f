//! Capacity eviction policy
//!
//! When the store exceeds its capacity bound, the case with the lowest
//! value score is removed: `value = reward - age_penalty * normalized_age`,
//! where normalized age is rank order over the live set (oldest 1.0,
//! newest 0.0). High-reward cases survive longer than pure FIFO would
//! allow, while stale low-value cases still age out. Ties go to the
//! oldest case.

use std::sync::Arc;

use ordered_float::OrderedFloat;

use super::case::{Case, CaseId};

/// Value-scored eviction over a rank-ordered live set.
pub struct EvictionPolicy {
    age_penalty: f64,
}

impl EvictionPolicy {
    pub fn new(age_penalty: f64) -> Self {
        Self { age_penalty }
    }

    pub fn age_penalty(&self) -> f64 {
        self.age_penalty
    }

    /// Value score for the case at rank `position` of `len` live cases
    /// in ascending commit order (position 0 is the oldest).
    pub fn value_score(&self, reward: f64, position: usize, len: usize) -> f64 {
        let normalized_age = if len <= 1 {
            1.0
        } else {
            1.0 - position as f64 / (len - 1) as f64
        };
        reward - self.age_penalty * normalized_age
    }

    /// Pick the eviction victim among live cases given in ascending
    /// commit order. Returns `None` for an empty set.
    pub fn select_victim(&self, ordered: &[Arc<Case>]) -> Option<CaseId> {
        let len = ordered.len();
        ordered
            .iter()
            .enumerate()
            .map(|(position, case)| {
                let value = self.value_score(case.reward, position, len);
                (OrderedFloat(value), position, case.case_id)
            })
            .min_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, _, case_id)| case_id)
    }
}
