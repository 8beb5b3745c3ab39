//! Section cache: one slot per `(section, language)` pair.
//!
//! A slot is either `Pending` (a fetch is in flight and callers can join it)
//! or `Ready` (a resolved bundle). A missing slot is the `Absent` state.
//! Keeping both states in one table under one lock means a caller can never
//! observe a key as neither cached nor in flight while a fetch is finishing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use tokio::time::Instant;
use tracing::debug;

use crate::content::section::{SectionBundle, SectionKey};
use crate::error::ContentError;
use crate::i18n::LanguageCode;

/// Cache key: the section and the language that was requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub section: SectionKey,
    pub language: LanguageCode,
}

impl CacheKey {
    pub fn new(section: SectionKey, language: LanguageCode) -> Self {
        Self { section, language }
    }
}

/// Which path produced a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The requested language had active rows.
    Found(Arc<SectionBundle>),
    /// The requested language had none; this is the default language's bundle.
    FellBack {
        language: LanguageCode,
        bundle: Arc<SectionBundle>,
    },
    /// Neither the requested nor the default language had active rows.
    Empty,
}

impl Resolution {
    pub fn bundle(&self) -> Arc<SectionBundle> {
        match self {
            Resolution::Found(bundle) | Resolution::FellBack { bundle, .. } => Arc::clone(bundle),
            Resolution::Empty => Arc::new(SectionBundle::new()),
        }
    }

    /// Whether this result was derived from the default language.
    pub fn depends_on_default(&self) -> bool {
        !matches!(self, Resolution::Found(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            Resolution::Found(_) => "found",
            Resolution::FellBack { .. } => "fell_back",
            Resolution::Empty => "empty",
        }
    }
}

pub(crate) type FetchResult = Result<Resolution, ContentError>;

/// A fetch that any number of callers can await.
pub(crate) type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

#[derive(Debug, Clone)]
struct CacheEntry {
    resolution: Resolution,
    stored_at: Instant,
}

enum Slot {
    Pending { ticket: u64, fetch: SharedFetch },
    Ready(CacheEntry),
}

/// Outcome of [`SectionCache::claim`].
pub(crate) enum Claim {
    /// A fresh populated slot.
    Hit(Resolution),
    /// A fetch for this key is already running.
    Join(SharedFetch),
    /// No slot existed; the caller's fetch was registered.
    Started(SharedFetch),
}

/// Process-local cache of resolved sections.
///
/// Owned by one [`TranslationService`](crate::content::TranslationService);
/// pass a fresh instance per service to keep tests isolated.
pub struct SectionCache {
    ttl: Option<Duration>,
    slots: Mutex<HashMap<CacheKey, Slot>>,
    next_ticket: AtomicU64,
}

impl SectionCache {
    /// A cache whose entries never expire.
    pub fn new() -> Self {
        Self::with_ttl(None)
    }

    /// A cache whose entries expire `ttl` after they were stored.
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(1),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<CacheKey, Slot>> {
        // Slot updates never panic midway, so a poisoned table is still consistent.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match self.ttl {
            Some(ttl) => entry.stored_at.elapsed() < ttl,
            None => true,
        }
    }

    /// Return the cached resolution, join the fetch in flight, or register
    /// a new fetch built by `start`.
    ///
    /// `start` receives the ticket that identifies the new pending slot and
    /// must be passed back to [`complete`](Self::complete). It runs under
    /// the slot lock and must not block.
    pub(crate) fn claim<F>(&self, key: &CacheKey, start: F) -> Claim
    where
        F: FnOnce(u64) -> SharedFetch,
    {
        let mut slots = self.slots();

        match slots.get(key) {
            Some(Slot::Ready(entry)) if self.is_fresh(entry) => {
                return Claim::Hit(entry.resolution.clone());
            }
            Some(Slot::Ready(_)) => {
                debug!(section = %key.section, language = %key.language, "Cache entry expired");
            }
            Some(Slot::Pending { fetch, .. }) => return Claim::Join(fetch.clone()),
            None => {}
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let fetch = start(ticket);
        slots.insert(
            key.clone(),
            Slot::Pending {
                ticket,
                fetch: fetch.clone(),
            },
        );
        Claim::Started(fetch)
    }

    /// Settle the pending slot registered under `ticket`.
    ///
    /// Success populates the slot, failure empties it. If the slot was
    /// invalidated or replaced while the fetch ran, nothing is written.
    /// Returns whether the slot was updated.
    pub(crate) fn complete(&self, key: &CacheKey, ticket: u64, result: &FetchResult) -> bool {
        let mut slots = self.slots();

        let owns_slot = matches!(
            slots.get(key),
            Some(Slot::Pending { ticket: current, .. }) if *current == ticket
        );
        if !owns_slot {
            debug!(
                section = %key.section,
                language = %key.language,
                "Slot changed while fetching, discarding result"
            );
            return false;
        }

        match result {
            Ok(resolution) => {
                slots.insert(
                    key.clone(),
                    Slot::Ready(CacheEntry {
                        resolution: resolution.clone(),
                        stored_at: Instant::now(),
                    }),
                );
            }
            Err(_) => {
                slots.remove(key);
            }
        }
        true
    }

    /// Peek at a populated, fresh slot without fetching.
    pub fn get(&self, key: &CacheKey) -> Option<Resolution> {
        match self.slots().get(key) {
            Some(Slot::Ready(entry)) if self.is_fresh(entry) => Some(entry.resolution.clone()),
            _ => None,
        }
    }

    /// Whether a fetch for `key` is in flight.
    pub fn is_pending(&self, key: &CacheKey) -> bool {
        matches!(self.slots().get(key), Some(Slot::Pending { .. }))
    }

    /// Drop the slots of `section`: every language when `language` is
    /// `None`, otherwise the one language. When `language` is `default`,
    /// slots of other languages that were filled from the default language,
    /// or are still being fetched, are dropped as well. A dropped pending
    /// slot never receives its fetch result.
    ///
    /// Returns the number of slots removed.
    pub fn invalidate(
        &self,
        section: &SectionKey,
        language: Option<&LanguageCode>,
        default: &LanguageCode,
    ) -> usize {
        let mut slots = self.slots();
        let before = slots.len();

        slots.retain(|key, slot| {
            if &key.section != section {
                return true;
            }
            let Some(language) = language else {
                return false;
            };
            if &key.language == language {
                return false;
            }
            if language == default {
                // A fetch still in flight may be waiting on the default language.
                return match slot {
                    Slot::Ready(entry) => !entry.resolution.depends_on_default(),
                    Slot::Pending { .. } => false,
                };
            }
            true
        });

        before - slots.len()
    }

    /// Drop every slot. Returns the number removed.
    pub fn clear(&self) -> usize {
        let mut slots = self.slots();
        let removed = slots.len();
        slots.clear();
        removed
    }

    /// Number of slots, pending ones included.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }
}

impl Default for SectionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionCache")
            .field("ttl", &self.ttl)
            .field("slots", &self.len())
            .finish()
    }
}
