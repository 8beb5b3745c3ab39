//! Translation service: cached, coalesced section lookups with fallback to
//! the default language.

use std::sync::Arc;

use futures::future::{join_all, FutureExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::content::cache::{CacheKey, Claim, FetchResult, Resolution, SectionCache, SharedFetch};
use crate::content::section::{SectionBundle, SectionKey};
use crate::error::{ContentError, StoreError};
use crate::i18n::{ContentMetrics, LanguageCode, LanguageRegistry, MetricsReport};
use crate::store::ContentStore;

/// Resolves section bundles for the site.
///
/// Cloning is cheap; clones share the cache, the store and the metrics.
///
/// # Example
///
/// ```
/// # tokio_test::block_on(async {
/// use std::sync::Arc;
/// use site_content::content::TranslationService;
/// use site_content::i18n::LanguageRegistry;
/// use site_content::store::InMemoryStore;
///
/// let store = InMemoryStore::new();
/// store.insert("hero", "en", "title", "Welcome").unwrap();
///
/// let service = TranslationService::new(Arc::new(store), LanguageRegistry::default());
/// let bundle = service.get_section_content("hero", "sr").await.unwrap();
/// assert_eq!(bundle.t("title"), "Welcome");
/// # });
/// ```
#[derive(Clone)]
pub struct TranslationService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    store: Arc<dyn ContentStore>,
    cache: SectionCache,
    languages: LanguageRegistry,
    metrics: ContentMetrics,
}

/// Outcome of [`TranslationService::preload`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreloadReport {
    pub loaded: usize,
    pub failed: usize,
}

impl TranslationService {
    /// A service with a cache whose entries never expire.
    pub fn new(store: Arc<dyn ContentStore>, languages: LanguageRegistry) -> Self {
        Self::with_cache(store, languages, SectionCache::new())
    }

    /// A service that owns `cache`.
    pub fn with_cache(
        store: Arc<dyn ContentStore>,
        languages: LanguageRegistry,
        cache: SectionCache,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                store,
                cache,
                languages,
                metrics: ContentMetrics::new(),
            }),
        }
    }

    /// Validate a section key and a served language into a cache key.
    pub fn key(&self, section: &str, language: &str) -> Result<CacheKey, ContentError> {
        let section = SectionKey::parse(section)?;
        let language = self.inner.languages.resolve(language)?;
        Ok(CacheKey::new(section, language))
    }

    /// Get every active content value of `section` in `language`.
    ///
    /// Served from cache when possible, without suspending. When the
    /// language has no active content the default language's bundle is
    /// returned; an empty bundle means neither had any. Only a store
    /// failure is an error, and it is not cached.
    pub async fn get_section_content(
        &self,
        section: &str,
        language: &str,
    ) -> Result<Arc<SectionBundle>, ContentError> {
        let key = self.key(section, language)?;
        Ok(self.resolve(&key).await?.bundle())
    }

    /// Like [`get_section_content`](Self::get_section_content), but reports
    /// which path produced the bundle.
    pub async fn resolve(&self, key: &CacheKey) -> Result<Resolution, ContentError> {
        let claim = self
            .inner
            .cache
            .claim(key, |ticket| self.spawn_fetch(key.clone(), ticket));

        let fetch = match claim {
            Claim::Hit(resolution) => {
                self.inner.metrics.record_cache_hit();
                debug!(section = %key.section, language = %key.language, "Cache hit");
                return Ok(resolution);
            }
            Claim::Join(fetch) => {
                self.inner.metrics.record_coalesced();
                debug!(section = %key.section, language = %key.language, "Joining fetch in flight");
                fetch
            }
            Claim::Started(fetch) => {
                self.inner.metrics.record_cache_miss();
                debug!(section = %key.section, language = %key.language, "Cache miss");
                fetch
            }
        };

        fetch.await
    }

    /// Run the fetch for `key` as its own task so it completes even if every
    /// caller stops waiting, and settle the cache slot when it ends.
    fn spawn_fetch(&self, key: CacheKey, ticket: u64) -> SharedFetch {
        let service = self.clone();
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let result = service.fetch_uncached(&task_key).await;
            service.inner.cache.complete(&task_key, ticket, &result);
            result
        });

        let inner = Arc::clone(&self.inner);
        async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    error!(
                        section = %key.section,
                        language = %key.language,
                        "Content fetch task failed: {}",
                        join_error
                    );
                    let result = Err(ContentError::fetch_failed(
                        key.section.as_str(),
                        key.language.as_str(),
                        StoreError::Aborted(join_error.to_string()),
                    ));
                    inner.cache.complete(&key, ticket, &result);
                    result
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn fetch_uncached(&self, key: &CacheKey) -> FetchResult {
        if let Some(bundle) = self.try_requested_language(key).await? {
            return Ok(Resolution::Found(bundle));
        }

        if &key.language == self.inner.languages.default_language() {
            debug!(section = %key.section, language = %key.language, "No active content");
            return Ok(Resolution::Empty);
        }

        self.try_default_language(key).await
    }

    /// Stage one: query the store for the requested language. `None` means
    /// no active rows.
    async fn try_requested_language(
        &self,
        key: &CacheKey,
    ) -> Result<Option<Arc<SectionBundle>>, ContentError> {
        let store = &self.inner.store;
        self.inner.metrics.record_store_query();
        debug!(
            store = store.name(),
            section = %key.section,
            language = %key.language,
            "Querying content store"
        );

        let rows = store
            .fetch_active_content(&key.section, &key.language)
            .await
            .map_err(|e| {
                self.inner.metrics.record_store_failure();
                warn!(
                    section = %key.section,
                    language = %key.language,
                    "Content query failed: {}",
                    e
                );
                ContentError::fetch_failed(key.section.as_str(), key.language.as_str(), e)
            })?;

        if rows.is_empty() {
            return Ok(None);
        }

        let bundle = SectionBundle::from_rows(&key.section, &key.language, rows);
        info!(
            section = %key.section,
            language = %key.language,
            "Loaded {} content entries",
            bundle.len()
        );
        Ok(Some(Arc::new(bundle)))
    }

    /// Stage two: resolve the default language for the same section, through
    /// the cache so its slot is shared with direct requests.
    async fn try_default_language(&self, key: &CacheKey) -> FetchResult {
        let default = self.inner.languages.default_language().clone();
        let default_key = CacheKey::new(key.section.clone(), default.clone());

        match self.resolve(&default_key).await? {
            Resolution::Found(bundle) => {
                self.inner.metrics.record_fallback();
                info!(
                    section = %key.section,
                    language = %key.language,
                    fallback = %default,
                    "No active content, falling back to default language"
                );
                Ok(Resolution::FellBack {
                    language: default,
                    bundle,
                })
            }
            // The default language never falls back, but keep the answer intact.
            fell_back @ Resolution::FellBack { .. } => Ok(fell_back),
            Resolution::Empty => {
                debug!(
                    section = %key.section,
                    language = %key.language,
                    "No active content in requested or default language"
                );
                Ok(Resolution::Empty)
            }
        }
    }

    /// Drop cached content for `section`, in every language when `language`
    /// is `None`. Returns the number of cache slots removed; invalidating
    /// something that is not cached is a no-op.
    pub fn invalidate(&self, section: &str, language: Option<&str>) -> Result<usize, ContentError> {
        let section = SectionKey::parse(section)?;
        let language = language.map(LanguageCode::parse).transpose()?;

        let removed = self.inner.cache.invalidate(
            &section,
            language.as_ref(),
            self.inner.languages.default_language(),
        );
        self.inner.metrics.record_invalidated(removed);

        match &language {
            Some(language) => info!(section = %section, language = %language, "Invalidated {} cache slots", removed),
            None => info!(section = %section, "Invalidated {} cache slots", removed),
        }
        Ok(removed)
    }

    /// Drop every cached section.
    pub fn invalidate_all(&self) -> usize {
        let removed = self.inner.cache.clear();
        self.inner.metrics.record_invalidated(removed);
        info!("Invalidated all {} cache slots", removed);
        removed
    }

    /// The cached bundle for `(section, language)`, if populated. Never
    /// touches the store.
    pub fn cached(&self, section: &str, language: &str) -> Option<Arc<SectionBundle>> {
        let key = self.key(section, language).ok()?;
        self.inner.cache.get(&key).map(|resolution| resolution.bundle())
    }

    /// Resolve every section in every served language concurrently.
    ///
    /// Failures are logged and counted, not returned; anything that failed
    /// is simply fetched again on first use.
    pub async fn preload(&self, sections: &[SectionKey]) -> PreloadReport {
        let keys: Vec<CacheKey> = sections
            .iter()
            .flat_map(|section| {
                self.inner
                    .languages
                    .list()
                    .iter()
                    .map(move |lang| CacheKey::new(section.clone(), lang.code.clone()))
            })
            .collect();

        let results = join_all(keys.iter().map(|key| self.resolve(key))).await;

        let mut report = PreloadReport::default();
        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(_) => report.loaded += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        section = %key.section,
                        language = %key.language,
                        "Preload failed: {}",
                        e
                    );
                }
            }
        }

        info!(
            "Preloaded {} section bundles ({} failed)",
            report.loaded, report.failed
        );
        report
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.inner.languages
    }

    pub fn default_language(&self) -> &LanguageCode {
        self.inner.languages.default_language()
    }

    pub fn metrics(&self) -> MetricsReport {
        self.inner.metrics.report()
    }

    pub fn store_name(&self) -> &'static str {
        self.inner.store.name()
    }
}

impl std::fmt::Debug for TranslationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationService")
            .field("store", &self.inner.store.name())
            .field("cache", &self.inner.cache)
            .field("default_language", self.inner.languages.default_language())
            .finish()
    }
}
