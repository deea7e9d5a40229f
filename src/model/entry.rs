use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

/// One row of the hosted `microcopy` table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub key: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content_nl: String,

    #[serde(default)]
    pub content_en: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: Vec<String>,
}

impl TextEntry {
    pub fn new(key: impl Into<String>, content_nl: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content_nl: content_nl.into(),
            content_en: None,
            variables: Vec::new(),
        }
    }

    pub fn with_en(mut self, content_en: impl Into<String>) -> Self {
        self.content_en = Some(content_en.into());
        self
    }

    pub fn with_variables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = names.into_iter().map(Into::into).collect();
        self
    }
}

// PostgREST returns `null` for unset text and array columns.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Nl,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Nl => "nl",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    /// Accepts bare codes and region tags (`nl`, `NL`, `en-GB`, `nl_NL`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let primary = lower.split(['-', '_']).next().unwrap_or("");

        match primary {
            "nl" => Ok(Language::Nl),
            "en" => Ok(Language::En),
            _ => Err(format!("unsupported language: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_from_the_backend_become_defaults() {
        let entry: TextEntry = serde_json::from_str(
            r#"{"key":"homepage.headline","content_nl":null,"content_en":null,"variables":null}"#,
        )
        .unwrap();

        assert_eq!(entry.key, "homepage.headline");
        assert_eq!(entry.content_nl, "");
        assert_eq!(entry.content_en, None);
        assert!(entry.variables.is_empty());
    }

    #[test]
    fn missing_optional_columns_are_accepted() {
        let entry: TextEntry =
            serde_json::from_str(r#"{"key":"a","content_nl":"Hallo"}"#).unwrap();
        assert_eq!(entry, TextEntry::new("a", "Hallo"));
    }

    #[test]
    fn language_parses_codes_and_region_tags() {
        assert_eq!("nl".parse::<Language>(), Ok(Language::Nl));
        assert_eq!("EN".parse::<Language>(), Ok(Language::En));
        assert_eq!("nl-NL".parse::<Language>(), Ok(Language::Nl));
        assert_eq!("en_GB".parse::<Language>(), Ok(Language::En));
        assert!("de".parse::<Language>().is_err());
        assert_eq!(Language::default(), Language::Nl);
    }
}
