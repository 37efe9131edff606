//! Runtime identifiers for each editor language

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::{
    error::Error,
    types::{Language, RuntimeSpec},
};

/// Maps editor languages to the runtime identifier and version the remote
/// service expects.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    runtimes: HashMap<Language, RuntimeSpec>,
}

#[derive(Debug, Deserialize)]
struct LanguageFile {
    #[serde(default)]
    languages: HashMap<String, RuntimeSpec>,
}

impl LanguageTable {
    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self {
            runtimes: HashMap::new(),
        }
    }

    pub fn resolve(&self, language: Language) -> Result<&RuntimeSpec, Error> {
        self.runtimes
            .get(&language)
            .ok_or_else(|| Error::UnsupportedLanguage(language.to_string()))
    }

    /// Apply overrides from a TOML document of the form
    ///
    /// ```toml
    /// [languages.python]
    /// runtime = "python"
    /// version = "3.12.0"
    /// ```
    pub fn merge_toml(&mut self, document: &str) -> Result<(), Error> {
        let file: LanguageFile =
            toml::from_str(document).map_err(|e| Error::Configuration(e.to_string()))?;

        for (tag, spec) in file.languages {
            let language: Language = tag.parse()?;
            debug!(%language, runtime = %spec.runtime, version = %spec.version, "Overriding runtime");
            self.runtimes.insert(language, spec);
        }
        Ok(())
    }

    pub fn load_overrides(&mut self, path: &Path) -> Result<(), Error> {
        let document = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.merge_toml(&document)
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        let defaults = [
            (Language::JavaScript, "javascript", "18.15.0"),
            (Language::TypeScript, "typescript", "5.0.3"),
            (Language::Python, "python", "3.10.0"),
            (Language::Java, "java", "15.0.2"),
            (Language::Go, "go", "1.16.2"),
            (Language::Rust, "rust", "1.68.2"),
            (Language::Cpp, "cpp", "10.2.0"),
            (Language::CSharp, "csharp", "6.12.0"),
            (Language::Ruby, "ruby", "3.0.1"),
            (Language::Swift, "swift", "5.3.3"),
        ];

        Self {
            runtimes: defaults
                .into_iter()
                .map(|(language, runtime, version)| {
                    (
                        language,
                        RuntimeSpec {
                            runtime: runtime.to_string(),
                            version: version.to_string(),
                        },
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_covers_every_language() {
        let table = LanguageTable::default();
        for language in Language::ALL {
            assert!(table.resolve(language).is_ok(), "{} missing", language);
        }
    }

    #[test]
    fn test_toml_overrides_replace_versions() {
        let mut table = LanguageTable::default();
        table
            .merge_toml(
                r#"
                [languages.python]
                runtime = "python"
                version = "3.12.0"
                "#,
            )
            .unwrap();

        assert_eq!(table.resolve(Language::Python).unwrap().version, "3.12.0");
        assert_eq!(
            table.resolve(Language::JavaScript).unwrap().version,
            "18.15.0"
        );
    }

    #[test]
    fn test_toml_rejects_unknown_language() {
        let mut table = LanguageTable::empty();
        let result = table.merge_toml(
            r#"
            [languages.cobol]
            runtime = "cobol"
            version = "1.0"
            "#,
        );
        assert!(matches!(result, Err(Error::UnsupportedLanguage(_))));
    }

    #[test]
    fn test_empty_table_resolves_nothing() {
        let table = LanguageTable::empty();
        assert!(matches!(
            table.resolve(Language::Go),
            Err(Error::UnsupportedLanguage(tag)) if tag == "go"
        ));
    }
}
