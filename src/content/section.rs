//! Section content types and the `t` lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ContentError;
use crate::i18n::LanguageCode;

/// Section keys the site ships with. Any other well-formed key is accepted.
pub const KNOWN_SECTIONS: &[&str] = &[
    "hero",
    "navigation",
    "footer",
    "podcast",
    "contact",
    "advertisements",
];

fn section_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,63}$").expect("section key pattern is valid")
    })
}

/// Identifier of a page section (`hero`, `footer`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionKey(String);

impl SectionKey {
    /// Validate a section key. Keys are case-sensitive and trimmed.
    pub fn parse(key: &str) -> Result<Self, ContentError> {
        let trimmed = key.trim();
        if section_pattern().is_match(trimmed) {
            Ok(SectionKey(trimmed.to_string()))
        } else {
            Err(ContentError::InvalidSectionKey(key.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SectionKey {
    type Error = ContentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SectionKey::parse(&value)
    }
}

impl From<SectionKey> for String {
    fn from(key: SectionKey) -> Self {
        key.0
    }
}

/// One row of the `content` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub section_key: SectionKey,
    pub language_code: LanguageCode,
    pub content_key: String,
    pub content_value: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// The two columns a store returns for an active-content query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRow {
    pub content_key: String,
    pub content_value: String,
}

impl ContentRow {
    pub fn new(content_key: impl Into<String>, content_value: impl Into<String>) -> Self {
        Self {
            content_key: content_key.into(),
            content_value: content_value.into(),
        }
    }
}

impl From<(String, String)> for ContentRow {
    fn from((content_key, content_value): (String, String)) -> Self {
        Self {
            content_key,
            content_value,
        }
    }
}

/// Every active `content_key → content_value` pair of one section in one
/// language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionBundle {
    entries: HashMap<String, String>,
}

impl SectionBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bundle from store rows.
    ///
    /// A key that appears more than once keeps the value of its last row.
    /// That means the store holds more than one active row for the key, so
    /// it is logged.
    pub fn from_rows(section: &SectionKey, language: &LanguageCode, rows: Vec<ContentRow>) -> Self {
        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows {
            if let Some(previous) = entries.insert(row.content_key.clone(), row.content_value) {
                warn!(
                    section = %section,
                    language = %language,
                    content_key = %row.content_key,
                    "Duplicate active content key, replacing {:?}",
                    previous
                );
            }
        }
        Self { entries }
    }

    pub fn get(&self, content_key: &str) -> Option<&str> {
        self.entries.get(content_key).map(String::as_str)
    }

    pub fn contains_key(&self, content_key: &str) -> bool {
        self.entries.contains_key(content_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Look up `content_key`, falling back to the key itself.
    pub fn t<'a>(&'a self, content_key: &'a str) -> &'a str {
        t(self, content_key, None)
    }

    /// Look up `content_key`, falling back to `fallback_text`.
    pub fn t_or<'a>(&'a self, content_key: &'a str, fallback_text: &'a str) -> &'a str {
        t(self, content_key, Some(fallback_text))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SectionBundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Render text for `content_key`.
///
/// Returns the bundle's value when the key is present (an empty string is
/// a present value), else `fallback_text`, else `content_key` itself so the
/// page shows something recognizable instead of a blank.
pub fn t<'a>(bundle: &'a SectionBundle, content_key: &'a str, fallback_text: Option<&'a str>) -> &'a str {
    match bundle.get(content_key) {
        Some(value) => value,
        None => fallback_text.unwrap_or(content_key),
    }
}
