//! Language hints derived purely from a URL's shape

use crate::classify::Language;
use crate::url::domain_labels;
use url::Url;

/// Derives a language from the URL alone
///
/// Checked in order, first match wins:
/// 1. leading subdomain label (`es.wikiquote.org`), only when the host has
///    three or more labels
/// 2. leading path segment (`/fr/proverbes`, `/en-gb/sayings`)
/// 3. top-level domain (`refranes.es`)
///
/// Only codes for languages in `supported` produce a hint.
pub fn url_hint(url: &Url, supported: &[Language]) -> Option<Language> {
    let labels = domain_labels(url);

    let subdomain = labels
        .as_ref()
        .filter(|labels| labels.len() >= 3)
        .and_then(|labels| labels.first())
        .and_then(|label| code_hint(label));

    let path = url
        .path_segments()
        .and_then(|mut segments| segments.next())
        .and_then(path_hint);

    let tld = labels
        .as_ref()
        .filter(|labels| labels.len() >= 2)
        .and_then(|labels| labels.last())
        .and_then(|label| code_hint(label));

    [subdomain, path, tld]
        .into_iter()
        .flatten()
        .find(|lang| supported.contains(lang))
}

/// Only two-letter codes count; "english.example.com" is not a hint
fn code_hint(token: &str) -> Option<Language> {
    if token.len() != 2 {
        return None;
    }
    Language::from_code(token)
}

/// Accepts "en" as well as region-tagged forms like "en-gb" or "es_mx"
fn path_hint(segment: &str) -> Option<Language> {
    let primary = segment.split(['-', '_']).next()?;
    if segment.len() > 5 {
        return None;
    }
    code_hint(primary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(url: &str) -> Option<Language> {
        url_hint(&Url::parse(url).unwrap(), &Language::KNOWN)
    }

    #[test]
    fn test_subdomain_hint() {
        assert_eq!(hint("https://es.wikiquote.org/wiki/Refranes"), Some(Language::Spanish));
        assert_eq!(hint("https://fr.example.com/"), Some(Language::French));
    }

    #[test]
    fn test_two_label_host_has_no_subdomain_hint() {
        // "de.com" is a registrable domain, not a German subdomain
        assert_eq!(hint("https://de.com/sayings"), None);
    }

    #[test]
    fn test_path_hint() {
        assert_eq!(hint("https://example.com/en/proverbs"), Some(Language::English));
        assert_eq!(hint("https://example.com/en-gb/proverbs"), Some(Language::English));
        assert_eq!(hint("https://example.com/es_mx/refranes"), Some(Language::Spanish));
        assert_eq!(hint("https://example.com/english/proverbs"), None);
    }

    #[test]
    fn test_tld_hint() {
        assert_eq!(hint("https://sprichwoerter.de/liste"), Some(Language::German));
        assert_eq!(hint("https://refranes.es/"), Some(Language::Spanish));
        assert_eq!(hint("https://proverbs.com/"), None);
    }

    #[test]
    fn test_subdomain_beats_path_and_tld() {
        assert_eq!(hint("https://fr.proverbs.de/es/list"), Some(Language::French));
    }

    #[test]
    fn test_path_beats_tld() {
        assert_eq!(hint("https://proverbs.de/en/list"), Some(Language::English));
    }

    #[test]
    fn test_ip_host_uses_path_only() {
        assert_eq!(hint("http://127.0.0.1:8080/de/spruch"), Some(Language::German));
        assert_eq!(hint("http://127.0.0.1:8080/proverbs"), None);
    }

    #[test]
    fn test_unsupported_hint_is_ignored() {
        let url = Url::parse("https://es.wikiquote.org/wiki/Refranes").unwrap();
        assert_eq!(url_hint(&url, &[Language::English]), None);
    }
}
