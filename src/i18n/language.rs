//! Language codes: validated, normalized language identifiers.
//!
//! A `LanguageCode` only guarantees that the code is well formed. Whether
//! the site actually serves that language is the registry's call.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ContentError;

/// Primary subtag of 2-3 letters, optionally followed by one script or
/// region subtag (`sr`, `en`, `sr-latn`, `pt-br`).
fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z]{2,3}(-[a-z0-9]{2,4})?$").expect("language code pattern is valid")
    })
}

/// A well-formed language code, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Parse a language code.
    ///
    /// Surrounding whitespace is ignored, `_` is accepted as a subtag
    /// separator and the result is lowercased, so `" sr_Latn "` parses
    /// to `sr-latn`.
    ///
    /// # Example
    /// ```
    /// use site_content::i18n::LanguageCode;
    ///
    /// let code = LanguageCode::parse("EN").unwrap();
    /// assert_eq!(code.as_str(), "en");
    /// ```
    pub fn parse(code: &str) -> Result<Self, ContentError> {
        let normalized = code.trim().replace('_', "-").to_ascii_lowercase();
        if code_pattern().is_match(&normalized) {
            Ok(LanguageCode(normalized))
        } else {
            Err(ContentError::InvalidLanguageCode(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The primary subtag (`sr` for `sr-latn`).
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LanguageCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = ContentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        LanguageCode::parse(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_simple_codes() {
        for code in ["sr", "en", "de", "fil"] {
            assert_eq!(LanguageCode::parse(code).unwrap().as_str(), code);
        }
    }

    #[test]
    fn test_parse_normalizes_case_and_separator() {
        assert_eq!(LanguageCode::parse("EN").unwrap().as_str(), "en");
        assert_eq!(LanguageCode::parse("sr_Latn").unwrap().as_str(), "sr-latn");
        assert_eq!(LanguageCode::parse("  de ").unwrap().as_str(), "de");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for code in ["", "e", "english", "en-", "-en", "en-us-x", "e1", "en us"] {
            let err = LanguageCode::parse(code).unwrap_err();
            assert!(matches!(err, ContentError::InvalidLanguageCode(_)), "{code}");
        }
    }

    #[test]
    fn test_primary_subtag() {
        assert_eq!(LanguageCode::parse("sr-latn").unwrap().primary(), "sr");
        assert_eq!(LanguageCode::parse("en").unwrap().primary(), "en");
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let code: LanguageCode = serde_json::from_str("\"SR\"").unwrap();
        assert_eq!(code.as_str(), "sr");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"sr\"");
        assert!(serde_json::from_str::<LanguageCode>("\"not a code\"").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(LanguageCode::parse("de").unwrap().to_string(), "de");
    }

    proptest! {
        #[test]
        fn prop_parse_is_idempotent(code in "[a-zA-Z]{2,3}([-_][a-zA-Z0-9]{2,4})?") {
            let once = LanguageCode::parse(&code).unwrap();
            let twice = LanguageCode::parse(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
