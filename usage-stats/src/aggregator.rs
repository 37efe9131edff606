use chrono::TimeDelta;
use exec_store::{Clock, ExecutionStore, SnippetLookup, StarStore, SystemClock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::StatsError;

/// Placeholder for a favorite language when there is nothing to rank
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_executions: usize,
    pub languages_count: usize,
    /// Distinct languages executed, sorted
    pub languages: Vec<String>,
    #[serde(rename = "last24Hours")]
    pub last_24_hours: usize,
    pub favorite_language: String,
    pub language_stats: BTreeMap<String, usize>,
    pub most_starred_language: String,
}

/// Count occurrences of each language
pub fn language_frequency<'a>(
    languages: impl IntoIterator<Item = &'a str>,
) -> BTreeMap<String, usize> {
    let mut frequency = BTreeMap::new();
    for language in languages {
        *frequency.entry(language.to_string()).or_insert(0) += 1;
    }
    frequency
}

/// Language with the highest count. Ties go to the lexicographically smallest
/// tag, which is the first one a `BTreeMap` yields.
pub fn most_frequent(frequency: &BTreeMap<String, usize>) -> Option<&str> {
    let mut best: Option<(&str, usize)> = None;
    for (language, &count) in frequency {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((language.as_str(), count));
        }
    }
    best.map(|(language, _)| language)
}

/// Computes [`UsageStats`] on demand from the stores.
#[derive(Clone)]
pub struct StatsAggregator {
    executions: Arc<dyn ExecutionStore>,
    stars: Arc<dyn StarStore>,
    snippets: Arc<dyn SnippetLookup>,
    clock: Arc<dyn Clock>,
}

impl StatsAggregator {
    pub fn new(
        executions: Arc<dyn ExecutionStore>,
        stars: Arc<dyn StarStore>,
        snippets: Arc<dyn SnippetLookup>,
    ) -> Self {
        Self {
            executions,
            stars,
            snippets,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn compute_stats(&self, user_id: &str) -> Result<UsageStats, StatsError> {
        let window_start = self.clock.now() - TimeDelta::hours(24);

        let executions = self.executions.all_by_user(user_id).await?;

        let mut starred_languages = Vec::new();
        for star in self.stars.stars_by_user(user_id).await? {
            match self.snippets.get_snippet(star.snippet_id).await? {
                Some(snippet) => starred_languages.push(snippet.language),
                None => debug!(user_id, snippet_id = star.snippet_id.0, "Skipping dangling star"),
            }
        }

        let language_stats =
            language_frequency(executions.iter().map(|record| record.language.as_str()));
        let star_stats = language_frequency(starred_languages.iter().map(String::as_str));

        let last_24_hours = executions
            .iter()
            .filter(|record| record.created_at > window_start)
            .count();

        let stats = UsageStats {
            total_executions: executions.len(),
            languages_count: language_stats.len(),
            languages: language_stats.keys().cloned().collect(),
            last_24_hours,
            favorite_language: most_frequent(&language_stats)
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            most_starred_language: most_frequent(&star_stats)
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            language_stats,
        };

        debug!(
            user_id,
            total = stats.total_executions,
            recent = stats.last_24_hours,
            "Computed usage stats"
        );
        Ok(stats)
    }
}
