use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::content::{ContentRow, SectionKey};
use crate::error::StoreError;
use crate::i18n::LanguageCode;
use crate::store::ContentStore;

const ACTIVE_CONTENT_QUERY: &str = "SELECT content_key, content_value
     FROM content
     WHERE section_key = $1 AND language_code = $2 AND is_active = true";

/// Content store backed by the `content` table in PostgreSQL.
#[derive(Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    /// Connect to the database at `database_url`.
    ///
    /// `acquire_timeout` bounds how long a query waits for a connection;
    /// running out surfaces as a transport error.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .context("Failed to connect to content database")?;

        info!("Connected to content database (max {} connections)", max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn fetch_active_content(
        &self,
        section: &SectionKey,
        language: &LanguageCode,
    ) -> Result<Vec<ContentRow>, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(ACTIVE_CONTENT_QUERY)
            .bind(section.as_str())
            .bind(language.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ContentRow::from).collect())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

impl std::fmt::Debug for PgContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgContentStore")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}
