//! HTTP surface for page components and the admin panel.
//!
//! - `GET  /health`                          - liveness
//! - `GET  /api/languages`                   - served languages and the default
//! - `GET  /api/content/:section?lang=xx`    - section bundle (lang defaults to the default language)
//! - `POST /api/content/:section/invalidate` - drop cached content (admin key required)
//! - `GET  /api/metrics`                     - cache and store counters

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::content::{Resolution, SectionBundle, TranslationService};
use crate::error::ContentError;
use crate::i18n::{LanguageConfig, MetricsReport};
use crate::security;

#[derive(Clone)]
pub struct AppState {
    pub service: TranslationService,
    pub admin_api_key: Option<String>,
}

impl AppState {
    pub fn new(service: TranslationService, admin_api_key: Option<String>) -> Self {
        Self {
            service,
            admin_api_key,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/languages", get(list_languages))
        .route("/api/content/:section", get(get_content))
        .route("/api/content/:section/invalidate", post(invalidate_content))
        .route("/api/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct LanguageQuery {
    pub lang: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub default: String,
    pub languages: Vec<LanguageConfig>,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub section: String,
    pub language: String,
    /// Language the content is actually in
    pub resolved_language: Option<String>,
    /// `found`, `fell_back` or `empty`
    pub status: &'static str,
    pub content: SectionBundle,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub removed: usize,
}

async fn health() -> &'static str {
    "ok"
}

async fn list_languages(State(state): State<AppState>) -> Json<LanguagesResponse> {
    let registry = state.service.languages();
    Json(LanguagesResponse {
        default: registry.default_language().to_string(),
        languages: registry.list().to_vec(),
    })
}

async fn get_content(
    State(state): State<AppState>,
    Path(section): Path<String>,
    Query(query): Query<LanguageQuery>,
) -> Result<Json<ContentResponse>, ApiError> {
    let language = query
        .lang
        .unwrap_or_else(|| state.service.default_language().to_string());
    let key = state.service.key(&section, &language)?;
    let resolution = state.service.resolve(&key).await?;

    let resolved_language = match &resolution {
        Resolution::Found(_) => Some(key.language.to_string()),
        Resolution::FellBack { language, .. } => Some(language.to_string()),
        Resolution::Empty => None,
    };

    Ok(Json(ContentResponse {
        section: key.section.to_string(),
        language: key.language.to_string(),
        resolved_language,
        status: resolution.status(),
        content: resolution.bundle().as_ref().clone(),
    }))
}

async fn invalidate_content(
    State(state): State<AppState>,
    Path(section): Path<String>,
    Query(query): Query<LanguageQuery>,
    headers: HeaderMap,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let Some(expected) = state.admin_api_key.as_deref() else {
        return Err(ApiError::AdminDisabled);
    };
    if !security::is_authorized(&headers, expected) {
        warn!(section = %section, "Rejected invalidation with bad admin key");
        return Err(ApiError::Unauthorized);
    }

    let removed = state.service.invalidate(&section, query.lang.as_deref())?;
    Ok(Json(InvalidateResponse { removed }))
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsReport> {
    Json(state.service.metrics())
}

/// Errors returned by the HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    Content(ContentError),
    Unauthorized,
    AdminDisabled,
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        ApiError::Content(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Content(err @ ContentError::FetchFailed { .. }) => {
                error!("Content fetch failed: {:#}", anyhow::Error::new(err.clone()));
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            ApiError::Content(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid admin key".to_string()),
            ApiError::AdminDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "cache invalidation is disabled".to_string(),
            ),
        };

        let body: HashMap<&str, String> = HashMap::from([("error", message)]);
        (status, Json(body)).into_response()
    }
}
