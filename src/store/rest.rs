use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::content::{ContentRow, SectionKey};
use crate::error::StoreError;
use crate::i18n::LanguageCode;
use crate::retry::{with_retry_if, RetryConfig};
use crate::store::ContentStore;

/// Content store reached through a PostgREST-style HTTP API.
///
/// Issues `GET {base_url}/rest/v1/content` with equality filters on
/// section, language and `is_active`, authenticating with the API key in
/// both the `apikey` and `Authorization` headers.
#[derive(Clone)]
pub struct RestContentStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    retry: RetryConfig,
}

impl RestContentStore {
    /// Build a store for `base_url` with a per-request `timeout`.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for content store")?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/content", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            retry: RetryConfig::store_query(),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn query_once(
        &self,
        section: &SectionKey,
        language: &LanguageCode,
    ) -> Result<Vec<ContentRow>, StoreError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("select", "content_key,content_value".to_string()),
                ("section_key", format!("eq.{}", section)),
                ("language_code", format!("eq.{}", language)),
                ("is_active", "eq.true".to_string()),
            ])
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Vec<ContentRow>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ContentStore for RestContentStore {
    async fn fetch_active_content(
        &self,
        section: &SectionKey,
        language: &LanguageCode,
    ) -> Result<Vec<ContentRow>, StoreError> {
        with_retry_if(
            &self.retry,
            &format!("Content query {}/{}", section, language),
            || self.query_once(section, language),
            StoreError::is_retryable,
        )
        .await
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

impl std::fmt::Debug for RestContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestContentStore")
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn hero() -> SectionKey {
        SectionKey::parse("hero").unwrap()
    }

    fn en() -> LanguageCode {
        LanguageCode::parse("en").unwrap()
    }

    fn test_store(server: &MockServer) -> RestContentStore {
        RestContentStore::new(&server.uri(), "anon-key", Duration::from_secs(5))
            .unwrap()
            .with_retry(RetryConfig::new(3, Duration::from_millis(5)))
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let store =
            RestContentStore::new("https://db.example.com/", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(store.endpoint(), "https://db.example.com/rest/v1/content");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let store =
            RestContentStore::new("https://db.example.com", "secret-key", Duration::from_secs(1))
                .unwrap();
        assert!(!format!("{:?}", store).contains("secret-key"));
    }

    #[tokio::test]
    async fn test_fetch_sends_filters_and_auth() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/content"))
            .and(query_param("select", "content_key,content_value"))
            .and(query_param("section_key", "eq.hero"))
            .and(query_param("language_code", "eq.en"))
            .and(query_param("is_active", "eq.true"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "content_key": "title", "content_value": "Welcome" },
                { "content_key": "subtitle", "content_value": "" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = test_store(&server)
            .fetch_active_content(&hero(), &en())
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![ContentRow::new("title", "Welcome"), ContentRow::new("subtitle", "")]
        );
    }

    #[tokio::test]
    async fn test_fetch_empty_array() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/content"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let rows = test_store(&server)
            .fetch_active_content(&hero(), &en())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_retries_on_503_then_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/content"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/content"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "content_key": "title", "content_value": "Welcome" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = test_store(&server)
            .fetch_active_content(&hero(), &en())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_exhausts_retries_on_persistent_500() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/content"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let err = test_store(&server)
            .fetch_active_content(&hero(), &en())
            .await
            .unwrap_err();

        match err {
            StoreError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_no_retry_on_401() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/content"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_store(&server)
            .fetch_active_content(&hero(), &en())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/content"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"not\": \"an array\"}"))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_store(&server)
            .fetch_active_content(&hero(), &en())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Bind and release a port so nothing is listening on it.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let store = RestContentStore::new(
            &format!("http://127.0.0.1:{}", port),
            "anon-key",
            Duration::from_secs(2),
        )
        .unwrap()
        .with_retry(RetryConfig::none());

        let err = store.fetch_active_content(&hero(), &en()).await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
