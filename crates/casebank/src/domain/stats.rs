//! Incremental reward statistics
//!
//! Maintains running aggregates without rescanning case history:
//! all-time count, mean reward (Welford-style incremental update), and
//! success rate at a configured threshold, plus the same trio over a
//! trailing window of the most recent ingests still live.
//!
//! Everything here is derived state. [`RewardAggregator::rebuild`]
//! recomputes it from the live case set, which the owner runs
//! periodically to cancel any drift from long add/subtract sequences.

use std::collections::VecDeque;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::warn;

use super::case::{Case, CaseId};

/// Point-in-time aggregate view, served on the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Live case count.
    pub count: u64,
    /// Arithmetic mean of live rewards; 0.0 when empty, never NaN.
    pub mean_reward: f64,
    /// Fraction of live cases at or above the success threshold;
    /// 0.0 when empty, never NaN.
    pub success_rate: f64,
    /// Trailing-window variant of the same statistics.
    pub window: WindowSnapshot,
}

/// Aggregates over the last N ingested cases that are still live.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub count: u64,
    pub mean_reward: f64,
    pub success_rate: f64,
}

struct WindowEntry {
    case_id: CaseId,
    reward: f64,
}

struct AggState {
    count: u64,
    mean: f64,
    success_count: u64,
    window: VecDeque<WindowEntry>,
    window_sum: f64,
    window_success: u64,
    /// Mutations since the last rebuild; drives the drift valve.
    mutations: u64,
}

impl AggState {
    fn zero() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            success_count: 0,
            window: VecDeque::new(),
            window_sum: 0.0,
            window_success: 0,
            mutations: 0,
        }
    }
}

/// Incrementally maintained reward statistics for one case bank.
///
/// Explicitly owned state: each bank instance carries its own
/// aggregator, so multiple banks can coexist without cross-talk.
pub struct RewardAggregator {
    success_threshold: f64,
    window_size: usize,
    state: RwLock<AggState>,
}

impl RewardAggregator {
    pub fn new(success_threshold: f64, window_size: usize) -> Self {
        Self {
            success_threshold,
            window_size,
            state: RwLock::new(AggState::zero()),
        }
    }

    pub fn success_threshold(&self) -> f64 {
        self.success_threshold
    }

    /// Record one ingested reward. O(1).
    pub fn observe(&self, case_id: CaseId, reward: f64) {
        let mut s = self.state.write();

        s.count += 1;
        s.mean += (reward - s.mean) / s.count as f64;
        if reward >= self.success_threshold {
            s.success_count += 1;
        }

        s.window.push_back(WindowEntry { case_id, reward });
        s.window_sum += reward;
        if reward >= self.success_threshold {
            s.window_success += 1;
        }
        if s.window.len() > self.window_size {
            if let Some(dropped) = s.window.pop_front() {
                s.window_sum -= dropped.reward;
                if dropped.reward >= self.success_threshold {
                    s.window_success -= 1;
                }
            }
        }

        s.mutations += 1;
    }

    /// Remove one evicted reward; the algebraic inverse of
    /// [`Self::observe`]. O(window) worst case when the evicted case is
    /// still inside the trailing window.
    pub fn unobserve(&self, case_id: CaseId, reward: f64) {
        let mut s = self.state.write();

        if s.count == 0 {
            warn!(%case_id, "unobserve on empty aggregator ignored");
            return;
        }

        let prior = s.count;
        s.count -= 1;
        if s.count == 0 {
            s.mean = 0.0;
        } else {
            s.mean = (s.mean * prior as f64 - reward) / s.count as f64;
        }
        if reward >= self.success_threshold {
            s.success_count = s.success_count.saturating_sub(1);
        }

        if let Some(pos) = s.window.iter().position(|e| e.case_id == case_id) {
            if let Some(dropped) = s.window.remove(pos) {
                s.window_sum -= dropped.reward;
                if dropped.reward >= self.success_threshold {
                    s.window_success -= 1;
                }
            }
        }

        s.mutations += 1;
    }

    /// Whether the periodic full-recompute valve is due.
    pub fn rebuild_due(&self, interval: u64) -> bool {
        interval > 0 && self.state.read().mutations >= interval
    }

    /// Recompute every statistic from the live case set, given in
    /// ascending commit order.
    pub fn rebuild<'a>(&self, live: impl Iterator<Item = &'a Case>) {
        let mut fresh = AggState::zero();

        for case in live {
            fresh.count += 1;
            fresh.mean += (case.reward - fresh.mean) / fresh.count as f64;
            if case.reward >= self.success_threshold {
                fresh.success_count += 1;
            }
            fresh.window.push_back(WindowEntry {
                case_id: case.case_id,
                reward: case.reward,
            });
            if fresh.window.len() > self.window_size {
                fresh.window.pop_front();
            }
        }

        fresh.window_sum = fresh.window.iter().map(|e| e.reward).sum();
        fresh.window_success = fresh
            .window
            .iter()
            .filter(|e| e.reward >= self.success_threshold)
            .count() as u64;

        *self.state.write() = fresh;
    }

    /// Cheap consistent read of the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        let s = self.state.read();

        let mean_reward = if s.count > 0 { s.mean } else { 0.0 };
        let success_rate = if s.count > 0 {
            s.success_count as f64 / s.count as f64
        } else {
            0.0
        };

        let wcount = s.window.len() as u64;
        let window = WindowSnapshot {
            count: wcount,
            mean_reward: if wcount > 0 {
                s.window_sum / wcount as f64
            } else {
                0.0
            },
            success_rate: if wcount > 0 {
                s.window_success as f64 / wcount as f64
            } else {
                0.0
            },
        };

        StatsSnapshot {
            count: s.count,
            mean_reward,
            success_rate,
            window,
        }
    }
}
