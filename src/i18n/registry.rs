//! Language registry: the languages this site serves and its default.
//!
//! The registry is built from configuration at startup and handed to the
//! translation service, so tests can build as many independent registries
//! as they like.

use serde::Serialize;

use crate::error::ContentError;
use crate::i18n::LanguageCode;

/// Metadata for a served language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageConfig {
    pub code: LanguageCode,

    /// English name of the language (e.g., "Serbian")
    pub name: String,

    /// Name of the language in itself (e.g., "Srpski")
    pub native_name: String,
}

/// Supported languages plus the designated fallback language.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
    default_index: usize,
}

impl LanguageRegistry {
    /// Build a registry from language codes.
    ///
    /// Duplicate codes are collapsed (first occurrence wins the position).
    /// The default language must be one of `supported`.
    pub fn new<S: AsRef<str>>(supported: &[S], default: &str) -> Result<Self, ContentError> {
        let default = LanguageCode::parse(default)?;

        let mut languages: Vec<LanguageConfig> = Vec::with_capacity(supported.len());
        for code in supported {
            let code = LanguageCode::parse(code.as_ref())?;
            if languages.iter().any(|lang| lang.code == code) {
                continue;
            }
            let (name, native_name) = display_names(&code);
            languages.push(LanguageConfig {
                code,
                name,
                native_name,
            });
        }

        let default_index = languages
            .iter()
            .position(|lang| lang.code == default)
            .ok_or_else(|| ContentError::UnsupportedLanguage(default.to_string()))?;

        Ok(Self {
            languages,
            default_index,
        })
    }

    pub fn default_language(&self) -> &LanguageCode {
        &self.languages[self.default_index].code
    }

    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        let code = LanguageCode::parse(code).ok()?;
        self.languages.iter().find(|lang| lang.code == code)
    }

    pub fn is_supported(&self, code: &LanguageCode) -> bool {
        self.languages.iter().any(|lang| &lang.code == code)
    }

    /// All served languages, in configuration order.
    pub fn list(&self) -> &[LanguageConfig] {
        &self.languages
    }

    /// Parse `code` and check that the site serves it.
    pub fn resolve(&self, code: &str) -> Result<LanguageCode, ContentError> {
        let code = LanguageCode::parse(code)?;
        if self.is_supported(&code) {
            Ok(code)
        } else {
            Err(ContentError::UnsupportedLanguage(code.to_string()))
        }
    }
}

impl Default for LanguageRegistry {
    /// Serbian, English and German with English as the fallback.
    fn default() -> Self {
        Self::new(&["sr", "en", "de"], "en").expect("built-in language set is valid")
    }
}

/// English and native names for the languages we know about. Unknown
/// codes are shown by their code.
fn display_names(code: &LanguageCode) -> (String, String) {
    let known = match code.as_str() {
        "sr" | "sr-latn" => Some(("Serbian", "Srpski")),
        "sr-cyrl" => Some(("Serbian", "Српски")),
        "en" => Some(("English", "English")),
        "de" => Some(("German", "Deutsch")),
        "fr" => Some(("French", "Français")),
        "es" => Some(("Spanish", "Español")),
        "it" => Some(("Italian", "Italiano")),
        "ru" => Some(("Russian", "Русский")),
        "hr" => Some(("Croatian", "Hrvatski")),
        "bs" => Some(("Bosnian", "Bosanski")),
        "mk" => Some(("Macedonian", "Македонски")),
        "sl" => Some(("Slovenian", "Slovenščina")),
        _ => None,
    };

    match known {
        Some((name, native)) => (name.to_string(), native.to_string()),
        None => (code.to_string(), code.to_string()),
    }
}
