//! Language classification for proverb fragments
//!
//! Classification is layered, first match wins:
//!
//! 1. **URL hint**: subdomain, leading path segment or TLD names a supported
//!    language. Authoritative; the text is never inspected.
//! 2. **Short fragment**: text of 10 characters or fewer is `English`, or
//!    `Unknown` when English is not configured.
//! 3. **Detection**: the configured [`LanguageDetector`] runs on the text.
//! 4. **Fallback**: anything the detector cannot map to a supported language
//!    is `Unknown` and is not stored.

mod detector;
mod hint;
mod language;

pub use detector::{LanguageDetector, WhatlangDetector};
pub use hint::url_hint;
pub use language::Language;

use std::sync::Arc;
use url::Url;

/// Fragments at or below this many characters skip detection
pub const MIN_DETECTION_CHARS: usize = 10;

/// Which layer produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    UrlHint,
    ShortFragment,
    Detected,
    Unsupported,
}

/// A language decision plus the layer that made it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub language: Language,
    pub basis: Basis,
    /// Raw detector output, if the detector ran
    pub detected_code: Option<String>,
}

impl Classification {
    /// True when the fragment should be discarded instead of stored
    pub fn is_unsupported(&self) -> bool {
        self.language == Language::Unknown
    }
}

/// Assigns a language to each fragment
#[derive(Clone)]
pub struct Classifier {
    detector: Arc<dyn LanguageDetector>,
    supported: Vec<Language>,
}

impl Classifier {
    pub fn new(detector: Arc<dyn LanguageDetector>, supported: Vec<Language>) -> Self {
        Self {
            detector,
            supported,
        }
    }

    /// Builds a classifier from configured language codes; unknown codes are skipped
    pub fn from_codes<S: AsRef<str>>(detector: Arc<dyn LanguageDetector>, codes: &[S]) -> Self {
        let mut supported: Vec<Language> = codes
            .iter()
            .filter_map(|code| Language::from_code(code.as_ref()))
            .collect();
        supported.sort();
        supported.dedup();
        Self::new(detector, supported)
    }

    pub fn supported(&self) -> &[Language] {
        &self.supported
    }

    /// Returns the language for a fragment scraped from `source_url`
    pub fn classify(&self, text: &str, source_url: &Url) -> Language {
        self.explain(text, source_url).language
    }

    /// Like [`Classifier::classify`], also reporting which layer decided
    pub fn explain(&self, text: &str, source_url: &Url) -> Classification {
        if let Some(language) = url_hint(source_url, &self.supported) {
            return Classification {
                language,
                basis: Basis::UrlHint,
                detected_code: None,
            };
        }

        if text.chars().count() <= MIN_DETECTION_CHARS {
            // English only counts when it is configured
            let language = if self.supported.contains(&Language::English) {
                Language::English
            } else {
                Language::Unknown
            };
            return Classification {
                language,
                basis: Basis::ShortFragment,
                detected_code: None,
            };
        }

        let detected_code = self.detector.detect(text);
        let language = detected_code
            .as_deref()
            .and_then(Language::from_code)
            .filter(|lang| self.supported.contains(lang));

        match language {
            Some(language) => Classification {
                language,
                basis: Basis::Detected,
                detected_code,
            },
            None => Classification {
                language: Language::Unknown,
                basis: Basis::Unsupported,
                detected_code,
            },
        }
    }
}
