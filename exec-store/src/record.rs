use chrono::{DateTime, Utc};
use code_exec::ExecutionOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned identifier, increasing with insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub u64);

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated caller, as vouched for by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity {
    pub subject: String,
}

impl CallerIdentity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// Execution attempt awaiting insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExecution {
    pub language: String,
    pub code: String,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl NewExecution {
    /// Output is kept only for successful runs, error only for failed ones.
    pub fn from_outcome(language: impl Into<String>, outcome: &ExecutionOutcome) -> Self {
        Self {
            language: language.into(),
            code: outcome.code.clone(),
            output: outcome.is_success().then(|| outcome.output.clone()),
            error: if outcome.is_success() {
                None
            } else {
                outcome.error.clone()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub user_id: String,
    pub language: String,
    pub code: String,
    pub output: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Newest-first ordering key; ties on time fall back to the id
    pub fn sort_key(&self) -> (i64, ExecutionId) {
        (self.created_at.timestamp_millis(), self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnippetId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: SnippetId,
    pub user_id: String,
    pub title: String,
    pub language: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarRecord {
    pub user_id: String,
    pub snippet_id: SnippetId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_exec::ExecutionStatus;

    #[test]
    fn test_from_success_keeps_output_only() {
        let outcome = ExecutionOutcome::succeeded("console.log(1)", "1");
        let new = NewExecution::from_outcome("javascript", &outcome);
        assert_eq!(new.output.as_deref(), Some("1"));
        assert_eq!(new.error, None);
        assert_eq!(new.code, "console.log(1)");
    }

    #[test]
    fn test_from_failure_keeps_error_only() {
        let outcome =
            ExecutionOutcome::failed("x", ExecutionStatus::CompilationError, "syntax error");
        let new = NewExecution::from_outcome("rust", &outcome);
        assert_eq!(new.output, None);
        assert_eq!(new.error.as_deref(), Some("syntax error"));
    }
}
