//! Read access to the remote content store.
//!
//! The translation service only needs one query: the active rows of a
//! section in a language. Adapters:
//!
//! - `postgres`: direct SQL through a `sqlx` pool
//! - `rest`: PostgREST-style HTTP API (Supabase and friends)
//! - `memory`: rows held in process, for local development and tests

mod memory;
mod postgres;
mod rest;

pub use memory::InMemoryStore;
pub use postgres::PgContentStore;
pub use rest::RestContentStore;

use async_trait::async_trait;

use crate::content::{ContentRow, SectionKey};
use crate::error::StoreError;
use crate::i18n::LanguageCode;

/// Source of section content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the active rows for `section` in `language`.
    ///
    /// Filtering on `is_active` happens in the store. An empty vector means
    /// the language has no content for the section; it is not an error.
    async fn fetch_active_content(
        &self,
        section: &SectionKey,
        language: &LanguageCode,
    ) -> Result<Vec<ContentRow>, StoreError>;

    /// Short adapter name for logs.
    fn name(&self) -> &'static str;
}
