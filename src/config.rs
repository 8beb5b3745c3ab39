use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::content::SectionKey;
use crate::i18n::LanguageRegistry;

/// Where section content is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    Rest {
        api_url: String,
        api_key: String,
    },
    Memory {
        seed_file: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    // Content store
    pub store: StoreConfig,
    pub store_timeout: Duration,

    // Languages
    pub default_language: String,
    pub supported_languages: Vec<String>,

    // Cache
    pub cache_ttl: Option<Duration>,
    pub preload_sections: Vec<String>,

    // Web server
    pub admin_api_key: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store = match var("CONTENT_STORE").as_deref() {
            Some("postgres") => postgres_config(&var)?,
            Some("rest") => rest_config(&var)?,
            Some("memory") => StoreConfig::Memory {
                seed_file: var("CONTENT_SEED_FILE"),
            },
            Some(other) => bail!(
                "CONTENT_STORE must be one of postgres, rest, memory (got '{}')",
                other
            ),
            None if var("DATABASE_URL").is_some() => postgres_config(&var)?,
            None => rest_config(&var)
                .context("No content store configured: set DATABASE_URL or CONTENT_API_URL")?,
        };

        let config = Self {
            store,
            store_timeout: Duration::from_secs(parse_or(&var, "CONTENT_STORE_TIMEOUT_SECS", 10)?),

            default_language: var("DEFAULT_LANGUAGE").unwrap_or_else(|| "en".to_string()),
            supported_languages: split_list(
                &var("SUPPORTED_LANGUAGES").unwrap_or_else(|| "sr,en,de".to_string()),
            ),

            cache_ttl: match parse_or(&var, "CONTENT_CACHE_TTL_SECS", 0)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            preload_sections: var("CONTENT_PRELOAD_SECTIONS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),

            admin_api_key: var("ADMIN_API_KEY"),
            port: parse_or(&var, "PORT", 8080)?,
        };

        // Fail at startup rather than on the first request.
        config.language_registry()?;
        config.preload_section_keys()?;

        Ok(config)
    }

    /// The languages this site serves.
    pub fn language_registry(&self) -> Result<LanguageRegistry> {
        LanguageRegistry::new(&self.supported_languages, &self.default_language).with_context(|| {
            format!(
                "Invalid language settings (DEFAULT_LANGUAGE={}, SUPPORTED_LANGUAGES={})",
                self.default_language,
                self.supported_languages.join(",")
            )
        })
    }

    pub fn preload_section_keys(&self) -> Result<Vec<SectionKey>> {
        self.preload_sections
            .iter()
            .map(|s| SectionKey::parse(s).context("Invalid CONTENT_PRELOAD_SECTIONS entry"))
            .collect()
    }
}

fn postgres_config(var: &impl Fn(&str) -> Option<String>) -> Result<StoreConfig> {
    Ok(StoreConfig::Postgres {
        database_url: var("DATABASE_URL").context("DATABASE_URL not set")?,
        max_connections: parse_or(var, "DATABASE_MAX_CONNECTIONS", 5)?,
    })
}

fn rest_config(var: &impl Fn(&str) -> Option<String>) -> Result<StoreConfig> {
    Ok(StoreConfig::Rest {
        api_url: var("CONTENT_API_URL").context("CONTENT_API_URL not set")?,
        api_key: var("CONTENT_API_KEY").context("CONTENT_API_KEY not set")?,
    })
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a number (got '{}'): {}", name, raw, e)),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
