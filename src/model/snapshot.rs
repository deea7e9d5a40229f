use std::collections::{hash_map::Entry, HashMap};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::entry::{Language, TextEntry};

/// Normalized record for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedText {
    pub nl: String,
    pub en: Option<String>,
    pub variables: Vec<String>,
}

impl LocalizedText {
    /// English falls back to Dutch when the English text is absent or blank.
    pub fn content(&self, language: Language) -> &str {
        match language {
            Language::Nl => &self.nl,
            Language::En => match self.en.as_deref() {
                Some(en) if !en.trim().is_empty() => en,
                _ => &self.nl,
            },
        }
    }
}

/// A complete copy of the text table from one fetch. Never partially updated.
#[derive(Debug, Clone)]
pub struct Snapshot {
    entries: HashMap<String, LocalizedText>,
    fetched_at: DateTime<Utc>,
    fingerprint: String,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            fetched_at: DateTime::<Utc>::default(),
            fingerprint: String::new(),
        }
    }

    pub fn from_entries(rows: Vec<TextEntry>, fetched_at: DateTime<Utc>) -> Self {
        let mut entries: HashMap<String, LocalizedText> = HashMap::with_capacity(rows.len());

        for row in rows {
            let key = row.key.trim().to_string();
            if key.is_empty() {
                warn!("skipping microcopy row with an empty key");
                continue;
            }

            let text = LocalizedText {
                nl: row.content_nl,
                en: row.content_en,
                variables: row.variables,
            };

            match entries.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(text);
                }
                Entry::Occupied(mut slot) => {
                    warn!(key = %slot.key(), "duplicate microcopy key, keeping the last row");
                    slot.insert(text);
                }
            }
        }

        let fingerprint = fingerprint(&entries);

        Self {
            entries,
            fetched_at,
            fingerprint,
        }
    }

    pub fn get(&self, key: &str) -> Option<&LocalizedText> {
        self.entries.get(key.trim())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// SHA-256 over the sorted content; empty for an empty snapshot.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

fn fingerprint(entries: &HashMap<String, LocalizedText>) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();

    let mut hasher = Sha256::new();
    for key in keys {
        let text = &entries[key];
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.nl.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.en.as_deref().unwrap_or("").as_bytes());
        hasher.update([u8::from(text.en.is_some())]);
        for name in &text.variables {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update([0xffu8]);
    }

    hex::encode(hasher.finalize())
}
