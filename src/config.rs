use code_exec::{Language, LanguageTable, DEFAULT_RUNTIME_URL};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Error;

/// Service configuration, read from a TOML file. Every key is optional.
///
/// ```toml
/// listen_addr = "0.0.0.0:3000"
/// runtime_url = "https://emkc.org/api/v2/piston"
/// run_timeout_secs = 30
/// free_tier_language = "javascript"
/// languages_file = "languages.toml"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub runtime_url: String,
    pub run_timeout_secs: u64,
    pub free_tier_language: Language,
    /// Optional runtime version overrides, see [`LanguageTable::merge_toml`]
    pub languages_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            runtime_url: DEFAULT_RUNTIME_URL.to_string(),
            run_timeout_secs: code_exec::DEFAULT_TIMEOUT.as_secs(),
            free_tier_language: Language::JavaScript,
            languages_file: None,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let document = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&document)
    }

    pub fn from_toml_str(document: &str) -> Result<Self, Error> {
        let config: AppConfig =
            toml::from_str(document).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    pub fn with_runtime_url(mut self, url: impl Into<String>) -> Self {
        self.runtime_url = url.into();
        self
    }

    pub fn with_run_timeout_secs(mut self, secs: u64) -> Self {
        self.run_timeout_secs = secs;
        self
    }

    pub fn with_free_tier_language(mut self, language: Language) -> Self {
        self.free_tier_language = language;
        self
    }

    pub fn with_languages_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.languages_file = Some(path.into());
        self
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Built-in runtime table with the overrides file applied on top
    pub fn language_table(&self) -> Result<LanguageTable, Error> {
        let mut table = LanguageTable::default();
        if let Some(path) = &self.languages_file {
            table.load_overrides(path)?;
        }
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.run_timeout_secs == 0 {
            return Err(Error::Config(
                "run_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.runtime_url.trim().is_empty() {
            return Err(Error::Config("runtime_url must not be empty".to_string()));
        }
        Ok(())
    }
}
