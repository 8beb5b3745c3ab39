use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::content::{ContentEntry, ContentRow, SectionKey};
use crate::error::StoreError;
use crate::i18n::LanguageCode;
use crate::store::ContentStore;

/// Content rows held in memory.
///
/// Rows are returned in insertion order, which makes duplicate handling
/// deterministic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<Vec<ContentEntry>>,
    queries: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<ContentEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            queries: AtomicUsize::new(0),
        }
    }

    /// Load rows from a JSON file holding an array of content entries.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let entries: Vec<ContentEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse seed file {}", path.display()))?;
        Ok(Self::with_entries(entries))
    }

    /// Add an active row.
    pub fn insert(&self, section: &str, language: &str, content_key: &str, content_value: &str) -> Result<()> {
        let entry = ContentEntry {
            section_key: SectionKey::parse(section)?,
            language_code: LanguageCode::parse(language)?,
            content_key: content_key.to_string(),
            content_value: content_value.to_string(),
            is_active: true,
        };
        self.write().push(entry);
        Ok(())
    }

    /// Mark every row of `section` in `language` inactive. Returns how many
    /// rows changed.
    pub fn deactivate(&self, section: &SectionKey, language: &LanguageCode) -> usize {
        let mut entries = self.write();
        let mut changed = 0;
        for entry in entries.iter_mut() {
            if &entry.section_key == section && &entry.language_code == language && entry.is_active {
                entry.is_active = false;
                changed += 1;
            }
        }
        changed
    }

    /// Number of queries served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<ContentEntry>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<ContentEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn fetch_active_content(
        &self,
        section: &SectionKey,
        language: &LanguageCode,
    ) -> Result<Vec<ContentRow>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let rows = self
            .read()
            .iter()
            .filter(|e| e.is_active && &e.section_key == section && &e.language_code == language)
            .map(|e| ContentRow::new(e.content_key.clone(), e.content_value.clone()))
            .collect();
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
