use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Languages the editor can submit to the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Java,
    Go,
    Rust,
    Cpp,
    CSharp,
    Ruby,
    Swift,
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::JavaScript,
        Language::TypeScript,
        Language::Python,
        Language::Java,
        Language::Go,
        Language::Rust,
        Language::Cpp,
        Language::CSharp,
        Language::Ruby,
        Language::Swift,
    ];

    /// Tag stored on execution records and snippets
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Swift => "swift",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| language.as_str() == s)
            .ok_or_else(|| Error::UnsupportedLanguage(s.to_string()))
    }
}

/// Runtime identifier and version understood by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSpec {
    pub runtime: String,
    pub version: String,
}

/// Single source file in a runtime request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub content: String,
}

/// Request body sent to the remote runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeRequest {
    pub language: String,
    pub version: String,
    pub files: Vec<SourceFile>,
}

impl RuntimeRequest {
    pub fn single_file(spec: &RuntimeSpec, content: impl Into<String>) -> Self {
        Self {
            language: spec.runtime.clone(),
            version: spec.version.clone(),
            files: vec![SourceFile {
                content: content.into(),
            }],
        }
    }
}

/// Diagnostic for a failed phase that reported neither text, signal nor code
const PHASE_FAILED: &str = "process failed without output";

/// Result of one phase (compile or run) as reported by the runtime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseResult {
    /// Exit code, absent when the process was killed by a signal
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub signal: Option<String>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// Interleaved stdout and stderr
    #[serde(default)]
    pub output: Option<String>,
}

impl PhaseResult {
    pub fn failed(&self) -> bool {
        match self.code {
            Some(code) => code != 0,
            None => self.signal.is_some(),
        }
    }

    /// Combined output, falling back to stdout when the runtime omits it
    pub fn combined_output(&self) -> &str {
        self.output.as_deref().unwrap_or(&self.stdout)
    }

    /// First non-empty of stderr, combined output and stdout. A silent failure
    /// falls back to the signal or exit code.
    pub fn diagnostic(&self) -> String {
        [
            self.stderr.as_str(),
            self.output.as_deref().unwrap_or_default(),
            self.stdout.as_str(),
        ]
        .into_iter()
        .find(|text| !text.is_empty())
        .map(str::to_string)
        .or_else(|| {
            self.signal
                .as_ref()
                .map(|signal| format!("terminated by signal {}", signal))
        })
        .or_else(|| self.code.map(|code| format!("exited with code {}", code)))
        .unwrap_or_else(|| PHASE_FAILED.to_string())
    }
}

/// Response body returned by the remote runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeResponse {
    /// Top-level API error
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub compile: Option<PhaseResult>,
    #[serde(default)]
    pub run: Option<PhaseResult>,
}

/// Terminal classification of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    ApiError,
    CompilationError,
    RuntimeError,
    TransportError,
    Timeout,
    Cancelled,
    InputError,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::ApiError => "api_error",
            ExecutionStatus::CompilationError => "compilation_error",
            ExecutionStatus::RuntimeError => "runtime_error",
            ExecutionStatus::TransportError => "transport_error",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::Cancelled => "cancelled",
            ExecutionStatus::InputError => "input_error",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized result of one run attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Submitted source
    pub code: String,
    /// Trimmed program output, empty on failure
    pub output: String,
    /// Diagnostic text, present on every failure
    pub error: Option<String>,
    pub status: ExecutionStatus,
}

impl ExecutionOutcome {
    pub fn succeeded(code: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            output: output.into(),
            error: None,
            status: ExecutionStatus::Success,
        }
    }

    pub fn failed(
        code: impl Into<String>,
        status: ExecutionStatus,
        error: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            output: String::new(),
            error: Some(error.into()),
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Whether this outcome is an execution attempt worth recording
    pub fn is_persistable(&self) -> bool {
        self.status != ExecutionStatus::InputError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_round_trips_through_tag() {
        for language in Language::ALL {
            assert_eq!(language.as_str().parse::<Language>().unwrap(), language);
        }
        assert!(matches!(
            "cobol".parse::<Language>(),
            Err(Error::UnsupportedLanguage(tag)) if tag == "cobol"
        ));
    }

    #[test]
    fn test_phase_diagnostic_fallbacks() {
        let phase = PhaseResult {
            code: Some(1),
            stderr: String::new(),
            output: Some("combined".to_string()),
            stdout: "out".to_string(),
            signal: None,
        };
        assert_eq!(phase.diagnostic(), "combined");

        let phase = PhaseResult {
            code: None,
            signal: Some("SIGKILL".to_string()),
            ..PhaseResult::default()
        };
        assert!(phase.failed());
        assert_eq!(phase.diagnostic(), "terminated by signal SIGKILL");

        let phase = PhaseResult {
            code: Some(2),
            output: Some(String::new()),
            ..PhaseResult::default()
        };
        assert_eq!(phase.diagnostic(), "exited with code 2");

        assert_eq!(PhaseResult::default().diagnostic(), PHASE_FAILED);
    }

    #[test]
    fn test_response_tolerates_missing_phases() {
        let response: RuntimeResponse =
            serde_json::from_str(r#"{"message":"runtime is unknown"}"#).unwrap();
        assert_eq!(response.message.as_deref(), Some("runtime is unknown"));
        assert!(response.compile.is_none());
        assert!(response.run.is_none());
    }
}
