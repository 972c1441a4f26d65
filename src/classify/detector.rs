//! Content-based language detection seam

use whatlang::Lang;

/// Statistical language detector run on fragment text
///
/// Returns a language code (ISO 639-1 where one exists, otherwise ISO 639-3),
/// or `None` when the text gives no usable signal.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<String>;
}

/// Trigram-based detector backed by `whatlang`
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        let info = whatlang::detect(text)?;
        let code = match info.lang() {
            Lang::Eng => "en",
            Lang::Spa => "es",
            Lang::Fra => "fr",
            Lang::Deu => "de",
            other => other.code(),
        };
        Some(code.to_string())
    }
}
