//! Integration tests for the site content service
//!
//! These tests drive the translation service through real store adapters
//! (a mocked REST backend, a seeded in-memory store) and the HTTP router
//! bound to a local port. PostgreSQL tests live in src/store/postgres.rs
//! since they need a database.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use site_content::{
    build_service, build_store,
    config::Config,
    content::{t, Resolution, TranslationService},
    error::ContentError,
    i18n::LanguageRegistry,
    retry::RetryConfig,
    server::{create_router, AppState},
    store::{InMemoryStore, RestContentStore},
};

// ==================== Test Helpers ====================

fn rest_service(server: &MockServer, retry: RetryConfig) -> TranslationService {
    let store = RestContentStore::new(&server.uri(), "anon-key", Duration::from_secs(5))
        .expect("Failed to build store")
        .with_retry(retry);
    TranslationService::new(Arc::new(store), LanguageRegistry::default())
}

/// Mock the rows PostgREST returns for one section and language
async fn mount_rows(server: &MockServer, section: &str, language: &str, rows: Value, times: u64) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/content"))
        .and(query_param("section_key", format!("eq.{}", section)))
        .and(query_param("language_code", format!("eq.{}", language)))
        .and(query_param("is_active", "eq.true"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .expect(times)
        .mount(server)
        .await;
}

fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.insert("hero", "en", "title", "Welcome").unwrap();
    store.insert("hero", "en", "subtitle", "Hand-made furniture").unwrap();
    store.insert("hero", "de", "title", "Willkommen").unwrap();
    store.insert("navigation", "sr", "home", "Početna").unwrap();
    store.insert("navigation", "en", "home", "Home").unwrap();
    store
}

/// Serve the router on an ephemeral port and return its base URL
async fn spawn_server(service: TranslationService, admin_api_key: Option<&str>) -> String {
    let app = create_router(AppState::new(service, admin_api_key.map(str::to_string)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

// ==================== REST Store Tests ====================

#[tokio::test]
async fn test_missing_translation_falls_back_to_default_language() {
    let server = MockServer::start().await;
    mount_rows(&server, "hero", "sr", json!([]), 1).await;
    mount_rows(
        &server,
        "hero",
        "en",
        json!([{"content_key": "title", "content_value": "Welcome"}]),
        1,
    )
    .await;

    let service = rest_service(&server, RetryConfig::none());

    let bundle = service.get_section_content("hero", "sr").await.unwrap();
    assert_eq!(bundle.get("title"), Some("Welcome"));
    assert_eq!(bundle.len(), 1);

    // Both pairs are cached now; the mock expectations fail on a second query.
    let again = service.get_section_content("hero", "sr").await.unwrap();
    assert!(Arc::ptr_eq(&bundle, &again));
    let english = service.get_section_content("hero", "en").await.unwrap();
    assert_eq!(english.get("title"), Some("Welcome"));

    let key = service.key("hero", "sr").unwrap();
    match service.resolve(&key).await.unwrap() {
        Resolution::FellBack { language, .. } => assert_eq!(language.as_str(), "en"),
        other => panic!("expected fallback, got {:?}", other),
    }
}

#[tokio::test]
async fn test_section_without_rows_is_empty() {
    let server = MockServer::start().await;
    mount_rows(&server, "contact", "en", json!([]), 1).await;

    let service = rest_service(&server, RetryConfig::none());

    let bundle = service.get_section_content("contact", "en").await.unwrap();
    assert!(bundle.is_empty());
    assert_eq!(t(&bundle, "email", None), "email");
    assert_eq!(t(&bundle, "email", Some("info@example.com")), "info@example.com");

    let key = service.key("contact", "en").unwrap();
    assert_eq!(service.resolve(&key).await.unwrap(), Resolution::Empty);
}

#[tokio::test]
async fn test_duplicate_keys_keep_last_row() {
    let server = MockServer::start().await;
    mount_rows(
        &server,
        "footer",
        "de",
        json!([
            {"content_key": "copyright", "content_value": "Alt"},
            {"content_key": "copyright", "content_value": "Neu"},
            {"content_key": "note", "content_value": ""}
        ]),
        1,
    )
    .await;

    let service = rest_service(&server, RetryConfig::none());
    let bundle = service.get_section_content("footer", "de").await.unwrap();

    assert_eq!(bundle.get("copyright"), Some("Neu"));
    // Empty values are present, not missing.
    assert_eq!(t(&bundle, "note", Some("fallback")), "");
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/content"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_rows(
        &server,
        "navigation",
        "de",
        json!([{"content_key": "home", "content_value": "Startseite"}]),
        1,
    )
    .await;

    let service = rest_service(&server, RetryConfig::none());

    let err = service
        .get_section_content("navigation", "de")
        .await
        .unwrap_err();
    assert!(err.is_fetch_failure());
    match &err {
        ContentError::FetchFailed { section, language, .. } => {
            assert_eq!(section, "navigation");
            assert_eq!(language, "de");
        }
        other => panic!("expected FetchFailed, got {:?}", other),
    }
    assert!(service.cached("navigation", "de").is_none());

    // The next call goes back to the store.
    let bundle = service.get_section_content("navigation", "de").await.unwrap();
    assert_eq!(bundle.get("home"), Some("Startseite"));
    assert_eq!(service.metrics().store_failures, 1);
}

#[tokio::test]
async fn test_transient_errors_are_retried_inside_one_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/content"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_rows(
        &server,
        "hero",
        "en",
        json!([{"content_key": "title", "content_value": "Welcome"}]),
        1,
    )
    .await;

    let service = rest_service(&server, RetryConfig::new(3, Duration::from_millis(5)));
    let bundle = service.get_section_content("hero", "en").await.unwrap();
    assert_eq!(bundle.get("title"), Some("Welcome"));
}

#[tokio::test]
async fn test_concurrent_requests_share_one_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/content"))
        .and(query_param("section_key", "eq.hero"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"content_key": "title", "content_value": "Welcome"}]))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = rest_service(&server, RetryConfig::none());

    let requests = (0..8).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.get_section_content("hero", "en").await })
    });
    let bundles: Vec<_> = futures::future::join_all(requests)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert!(bundles.iter().all(|b| Arc::ptr_eq(b, &bundles[0])));
    assert_eq!(service.metrics().store_queries, 1);
}

#[tokio::test]
async fn test_invalidation_refetches() {
    let server = MockServer::start().await;
    mount_rows(
        &server,
        "hero",
        "en",
        json!([{"content_key": "title", "content_value": "Welcome"}]),
        2,
    )
    .await;

    let service = rest_service(&server, RetryConfig::none());

    service.get_section_content("hero", "en").await.unwrap();
    assert_eq!(service.invalidate("hero", Some("en")).unwrap(), 1);
    assert_eq!(service.invalidate("hero", Some("en")).unwrap(), 0);
    service.get_section_content("hero", "en").await.unwrap();
}

// ==================== Configuration Tests ====================

#[tokio::test]
async fn test_service_from_config_with_seed_file() {
    let temp_dir = TempDir::new().unwrap();
    let seed_path = temp_dir.path().join("content.json");
    std::fs::write(
        &seed_path,
        json!([
            {"section_key": "hero", "language_code": "en", "content_key": "title", "content_value": "Welcome"},
            {"section_key": "hero", "language_code": "de", "content_key": "title", "content_value": "Entwurf", "is_active": false}
        ])
        .to_string(),
    )
    .unwrap();

    let seed = seed_path.to_str().unwrap().to_string();
    let config = Config::from_lookup(|name| match name {
        "CONTENT_STORE" => Some("memory".to_string()),
        "CONTENT_SEED_FILE" => Some(seed.clone()),
        "CONTENT_CACHE_TTL_SECS" => Some("60".to_string()),
        _ => None,
    })
    .unwrap();

    let store = build_store(&config).await.unwrap();
    assert_eq!(store.name(), "memory");
    let service = build_service(&config, store).unwrap();

    // The inactive German row is ignored, so German falls back to English.
    let bundle = service.get_section_content("hero", "de").await.unwrap();
    assert_eq!(bundle.get("title"), Some("Welcome"));
}

// ==================== HTTP Tests ====================

#[tokio::test]
async fn test_http_content_endpoint() {
    let service = TranslationService::new(Arc::new(seeded_store()), LanguageRegistry::default());
    let base = spawn_server(service, None).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(format!("{}/api/content/hero?lang=sr", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["section"], "hero");
    assert_eq!(body["language"], "sr");
    assert_eq!(body["resolved_language"], "en");
    assert_eq!(body["status"], "fell_back");
    assert_eq!(body["content"]["title"], "Welcome");

    let body: Value = client
        .get(format!("{}/api/content/hero?lang=DE", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["language"], "de");
    assert_eq!(body["status"], "found");
    assert_eq!(body["content"], json!({"title": "Willkommen"}));

    let body: Value = client
        .get(format!("{}/api/content/contact", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["language"], "en");
    assert_eq!(body["status"], "empty");
    assert_eq!(body["content"], json!({}));
}

#[tokio::test]
async fn test_http_rejects_invalid_input() {
    let service = TranslationService::new(Arc::new(seeded_store()), LanguageRegistry::default());
    let base = spawn_server(service, None).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/content/hero?lang=fr", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("fr"));

    let response = client
        .get(format!("{}/api/content/hero?lang=not a language", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_http_store_failure_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let base = spawn_server(rest_service(&server, RetryConfig::none()), None).await;
    let response = reqwest::get(format!("{}/api/content/hero?lang=en", base))
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn test_http_invalidate_requires_admin_key() {
    let service = TranslationService::new(Arc::new(seeded_store()), LanguageRegistry::default());
    service.get_section_content("navigation", "sr").await.unwrap();
    service.get_section_content("navigation", "en").await.unwrap();

    let base = spawn_server(service.clone(), Some("admin-secret")).await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/content/navigation/invalidate", base);

    let response = client.post(&url).send().await.unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .post(&url)
        .header("x-api-key", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert!(service.cached("navigation", "sr").is_some());

    let response = client
        .post(&url)
        .header("x-api-key", "admin-secret")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["removed"], 2);
    assert!(service.cached("navigation", "sr").is_none());
    assert!(service.cached("navigation", "en").is_none());
}

#[tokio::test]
async fn test_http_invalidate_disabled_without_admin_key() {
    let service = TranslationService::new(Arc::new(seeded_store()), LanguageRegistry::default());
    let base = spawn_server(service, None).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/content/hero/invalidate?lang=en", base))
        .header("x-api-key", "anything")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn test_http_languages_health_and_metrics() {
    let service = TranslationService::new(Arc::new(seeded_store()), LanguageRegistry::default());
    service.get_section_content("hero", "en").await.unwrap();
    service.get_section_content("hero", "en").await.unwrap();
    let base = spawn_server(service, None).await;

    let health = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(health.text().await.unwrap(), "ok");

    let languages: Value = reqwest::get(format!("{}/api/languages", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(languages["default"], "en");
    let codes: Vec<&str> = languages["languages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["sr", "en", "de"]);

    let metrics: Value = reqwest::get(format!("{}/api/metrics", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metrics["cache_hits"], 1);
    assert_eq!(metrics["store_queries"], 1);
}
