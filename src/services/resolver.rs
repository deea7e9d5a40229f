use std::collections::BTreeMap;

use tracing::warn;

use crate::model::entry::Language;
use crate::model::snapshot::Snapshot;
use crate::services::cache::MicrocopyCache;
use crate::services::template::{self, Variables};

/// The text shown in place of a key that has no entry.
pub fn fallback_marker(key: &str) -> String {
    format!("[{key}]")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    NotFound { key: String },
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    /// The resolved text, or the `[key]` marker when the key is unknown.
    pub fn text(&self) -> String {
        match self {
            Resolution::Found(text) => text.clone(),
            Resolution::NotFound { key } => fallback_marker(key),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Resolution::Found(text) => text,
            Resolution::NotFound { key } => fallback_marker(&key),
        }
    }
}

/// Looks a key up in a snapshot and fills its placeholders.
pub fn resolve_in(
    snapshot: &Snapshot,
    key: &str,
    variables: &Variables,
    language: Language,
) -> Resolution {
    match snapshot.get(key) {
        Some(entry) => Resolution::Found(template::render(
            entry.content(language),
            &entry.variables,
            variables,
        )),
        None => {
            warn!(key, %language, "microcopy key not found");
            Resolution::NotFound {
                key: key.to_string(),
            }
        }
    }
}

#[derive(Clone)]
pub struct TextResolver {
    cache: MicrocopyCache,
}

impl TextResolver {
    pub fn new(cache: MicrocopyCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &MicrocopyCache {
        &self.cache
    }

    pub async fn resolve(&self, key: &str, variables: &Variables, language: Language) -> Resolution {
        let snapshot = self.cache.snapshot().await;
        resolve_in(&snapshot, key, variables, language)
    }

    pub async fn resolve_text(&self, key: &str, variables: &Variables, language: Language) -> String {
        self.resolve(key, variables, language).await.into_text()
    }

    /// Resolves every key against one snapshot.
    pub async fn resolve_many<I, S>(
        &self,
        keys: I,
        variables: &Variables,
        language: Language,
    ) -> BTreeMap<String, Resolution>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let snapshot = self.cache.snapshot().await;
        keys.into_iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_string(), resolve_in(&snapshot, key, variables, language))
            })
            .collect()
    }

    pub async fn resolve_texts<I, S>(
        &self,
        keys: I,
        variables: &Variables,
        language: Language,
    ) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.resolve_many(keys, variables, language)
            .await
            .into_iter()
            .map(|(key, resolution)| (key, resolution.into_text()))
            .collect()
    }
}
