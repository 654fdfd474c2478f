//! Localized rendering of match notices and the dispatcher that persists them.

mod cache;
mod catalog;
mod dispatcher;
mod template;

pub use cache::{CacheStats, LruCache};
pub use catalog::{ResolvedTemplate, TemplateCatalog, JOB_MATCH_TEMPLATE};
pub use dispatcher::{NotificationDispatcher, NotificationError};
pub use template::{CompiledTemplate, NotificationFields, TemplateField};

use std::sync::Arc;

use super::domain::LanguageCode;

/// Compiled templates keyed by template key and requested language.
pub type TemplateCache = LruCache<(String, LanguageCode), ResolvedTemplate>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocalizationError {
    #[error("no template registered under '{0}'")]
    UnknownTemplate(String),
    #[error("template '{key}' has no text for fallback language '{language}'")]
    MissingFallback { key: String, language: LanguageCode },
    #[error("unknown placeholder '{{{0}}}'")]
    UnknownPlaceholder(String),
    #[error("unclosed placeholder in template: {0}")]
    UnclosedPlaceholder(String),
    #[error("template file is not valid JSON: {0}")]
    Malformed(String),
    #[error("failed to read template file {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Message text and the language it was actually rendered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub language: LanguageCode,
    pub text: String,
}

/// Localization table front-end. Compiled templates are memoized in an injected cache.
#[derive(Debug, Clone)]
pub struct Localizer {
    catalog: Arc<TemplateCatalog>,
    cache: Arc<TemplateCache>,
}

impl Localizer {
    pub fn new(catalog: TemplateCatalog, cache: Arc<TemplateCache>) -> Self {
        Self {
            catalog: Arc::new(catalog),
            cache,
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<TemplateCache> {
        &self.cache
    }

    pub fn render(
        &self,
        template_key: &str,
        language: &LanguageCode,
        fields: &NotificationFields,
    ) -> Result<RenderedMessage, LocalizationError> {
        let resolved = self
            .cache
            .get_or_try_insert_with((template_key.to_string(), language.clone()), || {
                self.catalog.resolve(template_key, language)
            })?;

        Ok(RenderedMessage {
            language: resolved.language.clone(),
            text: resolved.template.render(fields),
        })
    }
}
