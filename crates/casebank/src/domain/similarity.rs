//! Pluggable state similarity
//!
//! The engine never interprets state vectors; it only compares them
//! through [`StateSimilarity`]. Two metrics ship with the crate and a
//! custom implementation can be injected at construction time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Scores how alike two encoded states are. Higher is more similar.
///
/// Implementations must be symmetric and must score identical inputs
/// at their maximum.
pub trait StateSimilarity: Send + Sync {
    fn score(&self, a: &[f32], b: &[f32]) -> f32;

    /// Short name for logging.
    fn name(&self) -> &'static str;
}

/// Cosine similarity, clamped to `[-1, 1]`.
///
/// Length mismatches and zero-norm vectors score 0.
pub struct CosineSimilarity;

impl StateSimilarity for CosineSimilarity {
    fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "cosine"
    }
}

/// Euclidean distance mapped onto `(0, 1]` via `1 / (1 + d)`.
///
/// Identical vectors score 1.0; length mismatches score 0.
pub struct EuclideanSimilarity;

impl StateSimilarity for EuclideanSimilarity {
    fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dist: f32 = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt();

        1.0 / (1.0 + dist)
    }

    fn name(&self) -> &'static str {
        "euclidean"
    }
}

/// Metric selection recognized by configuration.
///
/// Custom metrics bypass this enum and are injected directly as an
/// `Arc<dyn StateSimilarity>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    Cosine,
    Euclidean,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
        }
    }

    /// Build the corresponding scorer.
    pub fn build(self) -> Arc<dyn StateSimilarity> {
        match self {
            Self::Cosine => Arc::new(CosineSimilarity),
            Self::Euclidean => Arc::new(EuclideanSimilarity),
        }
    }
}

impl std::fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            _ => Err(format!("unknown similarity metric: {s}")),
        }
    }
}
