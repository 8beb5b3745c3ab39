//! Multilingual section content for the site.
//!
//! Page sections (hero, navigation, footer, ...) read their text from a
//! `content` table keyed by section, language and content key. This crate
//! fetches those rows, caches one bundle per section and language,
//! coalesces concurrent fetches and falls back to the default language
//! when a translation is missing.

pub mod config;
pub mod content;
pub mod error;
pub mod i18n;
pub mod retry;
pub mod security;
pub mod server;
pub mod store;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Config, StoreConfig};
use crate::content::{SectionCache, TranslationService};
use crate::store::{ContentStore, InMemoryStore, PgContentStore, RestContentStore};

/// Connect the configured content store.
pub async fn build_store(config: &Config) -> Result<Arc<dyn ContentStore>> {
    let store: Arc<dyn ContentStore> = match &config.store {
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => Arc::new(
            PgContentStore::connect(database_url, *max_connections, config.store_timeout).await?,
        ),
        StoreConfig::Rest { api_url, api_key } => {
            Arc::new(RestContentStore::new(api_url, api_key, config.store_timeout)?)
        }
        StoreConfig::Memory { seed_file } => match seed_file {
            Some(path) => Arc::new(
                InMemoryStore::from_json_file(path).context("Failed to load content seed file")?,
            ),
            None => Arc::new(InMemoryStore::new()),
        },
    };
    Ok(store)
}

/// Build the translation service described by `config` on top of `store`.
pub fn build_service(config: &Config, store: Arc<dyn ContentStore>) -> Result<TranslationService> {
    Ok(TranslationService::with_cache(
        store,
        config.language_registry()?,
        SectionCache::with_ttl(config.cache_ttl),
    ))
}
