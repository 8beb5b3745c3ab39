//! Section content: types, cache and the translation service.
//!
//! - `section`: section keys, bundles and the `t` lookup
//! - `cache`: per-`(section, language)` slots, including fetches in flight
//! - `service`: `TranslationService`, the entry point used by the web layer

mod cache;
mod section;
mod service;

pub use cache::{CacheKey, Resolution, SectionCache};
pub use section::{t, ContentEntry, ContentRow, SectionBundle, SectionKey, KNOWN_SECTIONS};
pub use service::{PreloadReport, TranslationService};
