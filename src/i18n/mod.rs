//! Languages served by the site and translation observability.
//!
//! # Architecture
//!
//! - `language`: `LanguageCode`, a validated language identifier
//! - `registry`: supported languages and the fallback language
//! - `metrics`: cache and store counters for the translation service
//!
//! # Example
//!
//! ```
//! use site_content::i18n::LanguageRegistry;
//!
//! let registry = LanguageRegistry::new(&["sr", "en"], "en").unwrap();
//! assert_eq!(registry.default_language().as_str(), "en");
//! assert!(registry.resolve("sr").is_ok());
//! ```

mod language;
mod metrics;
mod registry;

pub use language::LanguageCode;
pub use metrics::{ContentMetrics, MetricsReport};
pub use registry::{LanguageConfig, LanguageRegistry};
