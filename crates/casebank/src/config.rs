//! Case bank configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::similarity::SimilarityMetric;

/// Case bank service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseBankConfig {
    /// Service host
    pub host: String,
    /// Service port
    pub port: u16,
    /// Storage and eviction configuration
    pub storage: StorageSettings,
    /// Aggregate statistics configuration
    pub stats: StatsSettings,
    /// Similarity retrieval configuration
    pub retrieval: RetrievalSettings,
}

impl Default for CaseBankConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8086,
            storage: StorageSettings::default(),
            stats: StatsSettings::default(),
            retrieval: RetrievalSettings::default(),
        }
    }
}

impl CaseBankConfig {
    /// Load configuration from environment variables and an optional
    /// .env file.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        // Hosting platforms inject a bare PORT variable; it takes
        // priority over the prefixed one.
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse::<u16>() {
                cfg.port = p;
            }
        }

        if let Ok(host) = std::env::var("CASEBANK_HOST") {
            cfg.host = host;
        }
        if let Ok(port) = std::env::var("CASEBANK_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                cfg.port = p;
            }
        }

        // Storage settings
        if let Ok(val) = std::env::var("CASEBANK_MAX_CASES") {
            if let Ok(v) = val.parse() {
                cfg.storage.max_cases = v;
            }
        }
        if let Ok(val) = std::env::var("CASEBANK_AGE_PENALTY") {
            if let Ok(v) = val.parse() {
                cfg.storage.age_penalty = v;
            }
        }
        if let Ok(val) = std::env::var("CASEBANK_PAGE_SIZE") {
            if let Ok(v) = val.parse() {
                cfg.storage.page_size = v;
            }
        }

        // Stats settings
        if let Ok(val) = std::env::var("CASEBANK_SUCCESS_THRESHOLD") {
            if let Ok(v) = val.parse() {
                cfg.stats.success_threshold = v;
            }
        }
        if let Ok(val) = std::env::var("CASEBANK_WINDOW_SIZE") {
            if let Ok(v) = val.parse() {
                cfg.stats.window_size = v;
            }
        }
        if let Ok(val) = std::env::var("CASEBANK_RECOMPUTE_INTERVAL") {
            if let Ok(v) = val.parse() {
                cfg.stats.recompute_interval = v;
            }
        }

        // Retrieval settings
        if let Ok(val) = std::env::var("CASEBANK_SIMILARITY_METRIC") {
            if let Ok(v) = val.parse() {
                cfg.retrieval.metric = v;
            }
        }
        if let Ok(val) = std::env::var("CASEBANK_STATE_DIM") {
            if let Ok(v) = val.parse() {
                cfg.retrieval.state_dim = v;
            }
        }

        Ok(cfg)
    }
}

/// Storage and eviction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Capacity bound enforced by eviction
    pub max_cases: usize,
    /// Weight of rank-order age in the eviction value score
    pub age_penalty: f64,
    /// Default page size for recent-case reads
    pub page_size: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            max_cases: crate::DEFAULT_MAX_CASES,
            age_penalty: crate::DEFAULT_AGE_PENALTY,
            page_size: crate::DEFAULT_PAGE_SIZE,
        }
    }
}

/// Aggregate statistics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSettings {
    /// Reward at or above this counts as a success
    pub success_threshold: f64,
    /// Trailing window length, in cases
    pub window_size: usize,
    /// Mutations between full recomputes of the aggregates
    pub recompute_interval: u64,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            success_threshold: crate::DEFAULT_SUCCESS_THRESHOLD,
            window_size: crate::DEFAULT_WINDOW_SIZE,
            recompute_interval: crate::DEFAULT_RECOMPUTE_INTERVAL,
        }
    }
}

/// Similarity retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Built-in metric used unless a custom scorer is injected
    pub metric: SimilarityMetric,
    /// Expected state dimensionality; 0 adopts the first ingested
    /// state's dimensionality
    pub state_dim: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            metric: SimilarityMetric::Cosine,
            state_dim: 0,
        }
    }
}
