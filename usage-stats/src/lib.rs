//! # Usage Statistics
//!
//! Derives per-user statistics from stored execution history and starred
//! snippets. Nothing is cached; every call rescans the store.

mod aggregator;
mod error;

pub use aggregator::{
    language_frequency, most_frequent, StatsAggregator, UsageStats, NOT_AVAILABLE,
};
pub use error::StatsError;

/// Result type for statistics queries
pub type Result<T> = std::result::Result<T, StatsError>;
