//! Case bank domain logic
//!
//! Core types and algorithms: case records, the similarity contract,
//! top-K retrieval, incremental reward statistics, and the eviction
//! policy.

pub mod case;
pub mod eviction;
pub mod index;
pub mod similarity;
pub mod stats;
