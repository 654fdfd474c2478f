use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::config::MatchingConfig;

use super::super::domain::LanguageCode;
use super::template::CompiledTemplate;
use super::LocalizationError;

/// Template key for the "new job matched" message.
pub const JOB_MATCH_TEMPLATE: &str = "job_match";

const BUILTIN_TEMPLATES: &str = include_str!("../../../templates/notifications.json");

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    fallback_language: String,
    templates: BTreeMap<String, BTreeMap<String, String>>,
}

/// Language → template table, loaded once at startup. Adding a language is a data change.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    fallback: LanguageCode,
    templates: BTreeMap<String, BTreeMap<LanguageCode, String>>,
}

/// A template chosen for a requested language, with the language actually used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub language: LanguageCode,
    pub fell_back: bool,
    pub template: CompiledTemplate,
}

impl TemplateCatalog {
    pub fn builtin() -> Result<Self, LocalizationError> {
        Self::from_json(BUILTIN_TEMPLATES)
    }

    /// Templates from `MATCH_TEMPLATES_PATH` when set, the built-in table otherwise, with the
    /// configured default language as fallback.
    pub fn from_config(config: &MatchingConfig) -> Result<Self, LocalizationError> {
        let catalog = match &config.templates_path {
            Some(path) => Self::from_path(path)?,
            None => Self::builtin()?,
        };
        catalog.with_fallback(LanguageCode::new(&config.default_language))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LocalizationError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|error| {
            LocalizationError::Io {
                path: path.as_ref().display().to_string(),
                reason: error.to_string(),
            }
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, LocalizationError> {
        let document: CatalogDocument = serde_json::from_str(raw)
            .map_err(|source| LocalizationError::Malformed(source.to_string()))?;

        let templates = document
            .templates
            .into_iter()
            .map(|(key, by_language)| {
                let by_language = by_language
                    .into_iter()
                    .map(|(language, source)| (LanguageCode::new(&language), source))
                    .collect();
                (key, by_language)
            })
            .collect();

        let catalog = Self {
            fallback: LanguageCode::new(&document.fallback_language),
            templates,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Swaps the fallback language, which must have a template for every key.
    pub fn with_fallback(mut self, language: LanguageCode) -> Result<Self, LocalizationError> {
        self.fallback = language;
        self.validate()?;
        Ok(self)
    }

    pub fn fallback(&self) -> &LanguageCode {
        &self.fallback
    }

    pub fn languages(&self, key: &str) -> Vec<LanguageCode> {
        self.templates
            .get(key)
            .map(|by_language| by_language.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn resolve(
        &self,
        key: &str,
        language: &LanguageCode,
    ) -> Result<ResolvedTemplate, LocalizationError> {
        let by_language = self
            .templates
            .get(key)
            .ok_or_else(|| LocalizationError::UnknownTemplate(key.to_string()))?;

        let (chosen, source) = match by_language.get(language) {
            Some(source) => (language, source),
            None => {
                let source = by_language.get(&self.fallback).ok_or_else(|| {
                    LocalizationError::MissingFallback {
                        key: key.to_string(),
                        language: self.fallback.clone(),
                    }
                })?;
                (&self.fallback, source)
            }
        };

        Ok(ResolvedTemplate {
            language: chosen.clone(),
            fell_back: chosen != language,
            template: CompiledTemplate::compile(source)?,
        })
    }

    fn validate(&self) -> Result<(), LocalizationError> {
        for (key, by_language) in &self.templates {
            if !by_language.contains_key(&self.fallback) {
                return Err(LocalizationError::MissingFallback {
                    key: key.clone(),
                    language: self.fallback.clone(),
                });
            }
            for source in by_language.values() {
                CompiledTemplate::compile(source)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads_with_hindi_fallback() {
        let catalog = TemplateCatalog::builtin().expect("builtin templates are valid");
        assert_eq!(catalog.fallback().as_str(), "hi");
        let languages = catalog.languages(JOB_MATCH_TEMPLATE);
        assert!(languages.contains(&LanguageCode::new("en")));
        assert!(languages.contains(&LanguageCode::new("ta")));
    }

    #[test]
    fn unsupported_language_resolves_to_fallback() {
        let catalog = TemplateCatalog::builtin().expect("builtin templates are valid");
        let resolved = catalog
            .resolve(JOB_MATCH_TEMPLATE, &LanguageCode::new("ur"))
            .expect("fallback available");
        assert_eq!(resolved.language.as_str(), "hi");
        assert!(resolved.fell_back);
    }

    #[test]
    fn fallback_must_cover_every_template() {
        let raw = r#"{"fallback_language":"hi","templates":{"job_match":{"en":"Hello {worker_name}"}}}"#;
        assert!(matches!(
            TemplateCatalog::from_json(raw),
            Err(LocalizationError::MissingFallback { .. })
        ));
    }

    #[test]
    fn with_fallback_switches_default_language() {
        let catalog = TemplateCatalog::builtin()
            .and_then(|catalog| catalog.with_fallback(LanguageCode::new("en")))
            .expect("english templates exist");
        let resolved = catalog
            .resolve(JOB_MATCH_TEMPLATE, &LanguageCode::new("xx"))
            .expect("fallback available");
        assert_eq!(resolved.language.as_str(), "en");
    }

    #[test]
    fn missing_template_file_reports_path_and_reason() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.json");
        match TemplateCatalog::from_path(&path) {
            Err(error @ LocalizationError::Io { .. }) => {
                let message = error.to_string();
                assert!(message.contains("absent.json"));
                assert!(std::error::Error::source(&error).is_none());
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_template_key_is_an_error() {
        let catalog = TemplateCatalog::builtin().expect("builtin templates are valid");
        assert_eq!(
            catalog.resolve("job_closed", &LanguageCode::new("hi")),
            Err(LocalizationError::UnknownTemplate("job_closed".to_string()))
        );
    }
}
