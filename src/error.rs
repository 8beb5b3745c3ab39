//! Error types for content retrieval.
//!
//! `StoreError` describes what went wrong inside a store adapter.
//! `ContentError` is what callers of the translation service see: invalid
//! input, or a store that could not be reached. A missing translation is
//! never an error.

use std::sync::Arc;

use thiserror::Error;

/// Failure reported by a [`ContentStore`](crate::store::ContentStore) adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced a response (connect, TLS, timeout).
    #[error("content store transport error: {0}")]
    Transport(String),

    /// The store answered with a non-success HTTP status.
    #[error("content store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The store rejected or failed the query itself.
    #[error("content store query failed: {0}")]
    Query(String),

    /// The response could not be decoded into content rows.
    #[error("failed to decode content store response: {0}")]
    Decode(String),

    /// The fetch task panicked or was cancelled before the store answered.
    #[error("content fetch aborted: {0}")]
    Aborted(String),
}

impl StoreError {
    /// Whether repeating the same request could plausibly succeed.
    ///
    /// Transport errors, rate limiting (429) and server errors (5xx) are
    /// retryable; other statuses and decode failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Transport(_) => true,
            StoreError::Status { status, .. } => *status == 429 || *status >= 500,
            StoreError::Query(_) | StoreError::Decode(_) | StoreError::Aborted(_) => false,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Transport(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Decode(err.to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// Error returned by the translation service.
///
/// Cloneable so that a single failed fetch can be fanned out to every
/// caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ContentError {
    #[error("invalid section key: {0:?}")]
    InvalidSectionKey(String),

    #[error("invalid language code: {0:?}")]
    InvalidLanguageCode(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The store could not be reached or failed the query. Never cached.
    #[error("failed to fetch content for section '{section}' ({language})")]
    FetchFailed {
        section: String,
        language: String,
        #[source]
        source: Arc<StoreError>,
    },
}

impl ContentError {
    pub fn fetch_failed(section: &str, language: &str, source: StoreError) -> Self {
        ContentError::FetchFailed {
            section: section.to_string(),
            language: language.to_string(),
            source: Arc::new(source),
        }
    }

    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, ContentError::FetchFailed { .. })
    }
}
