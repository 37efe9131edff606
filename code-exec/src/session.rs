use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{ExecutionOutcome, Language};

/// Persistable editor preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPreferences {
    pub language: Language,
    pub theme: String,
    pub font_size: u16,
}

impl Default for SessionPreferences {
    fn default() -> Self {
        Self {
            language: Language::JavaScript,
            theme: "vs-dark".to_string(),
            font_size: 16,
        }
    }
}

/// Editor state for one user session.
///
/// Holds the active language, per-language drafts and the result of the most
/// recent run. Passed explicitly to the orchestrator instead of living in a
/// process-wide store.
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    preferences: SessionPreferences,
    drafts: HashMap<Language, String>,
    output: String,
    error: Option<String>,
    running: bool,
    last_result: Option<ExecutionOutcome>,
}

impl EditorSession {
    pub fn preferences(&self) -> &SessionPreferences {
        &self.preferences
    }

    pub fn language(&self) -> Language {
        self.preferences.language
    }

    /// Switch language, keeping the current draft for later and clearing the
    /// previous run's output.
    pub fn set_language(&mut self, language: Language) {
        self.preferences.language = language;
        self.drafts.entry(language).or_default();
        self.output.clear();
        self.error = None;
    }

    pub fn theme(&self) -> &str {
        &self.preferences.theme
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.preferences.theme = theme.into();
    }

    pub fn font_size(&self) -> u16 {
        self.preferences.font_size
    }

    pub fn set_font_size(&mut self, font_size: u16) {
        self.preferences.font_size = font_size;
    }

    /// Draft for the active language
    pub fn code(&self) -> &str {
        self.drafts
            .get(&self.preferences.language)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.drafts.insert(self.preferences.language, code.into());
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn execution_result(&self) -> Option<&ExecutionOutcome> {
        self.last_result.as_ref()
    }

    pub(crate) fn begin_run(&mut self) {
        self.running = true;
        self.output.clear();
        self.error = None;
    }

    pub(crate) fn finish_run(&mut self, outcome: ExecutionOutcome) {
        self.running = false;
        self.output = outcome.output.clone();
        self.error = outcome.error.clone();
        self.last_result = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExecutionStatus;

    #[test]
    fn test_defaults_match_editor_defaults() {
        let session = EditorSession::default();
        assert_eq!(session.language(), Language::JavaScript);
        assert_eq!(session.theme(), "vs-dark");
        assert_eq!(session.font_size(), 16);
        assert_eq!(session.code(), "");
        assert!(!session.is_running());
        assert!(session.execution_result().is_none());
    }

    #[test]
    fn test_switching_language_keeps_drafts() {
        let mut session = EditorSession::default();
        session.set_code("console.log(1)");

        session.set_language(Language::Python);
        assert_eq!(session.code(), "");
        session.set_code("print(1)");

        session.set_language(Language::JavaScript);
        assert_eq!(session.code(), "console.log(1)");
        session.set_language(Language::Python);
        assert_eq!(session.code(), "print(1)");
    }

    #[test]
    fn test_switching_language_clears_output() {
        let mut session = EditorSession::default();
        session.begin_run();
        session.finish_run(ExecutionOutcome::failed(
            "x",
            ExecutionStatus::RuntimeError,
            "boom",
        ));
        assert_eq!(session.error(), Some("boom"));

        session.set_language(Language::Go);
        assert_eq!(session.error(), None);
        assert_eq!(session.output(), "");
        // The last result survives so it can still be saved
        assert!(session.execution_result().is_some());
    }

    #[test]
    fn test_preferences_serialize_camel_case() {
        let mut session = EditorSession::default();
        session.set_theme("github-dark");
        session.set_font_size(18);

        let json = serde_json::to_value(session.preferences()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "language": "javascript", "theme": "github-dark", "fontSize": 18 })
        );

        let restored: SessionPreferences = serde_json::from_value(json).unwrap();
        assert_eq!(&restored, session.preferences());
    }
}
