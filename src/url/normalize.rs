use crate::config::NormalizationConfig;
use crate::UrlError;
use url::Url;

/// List of tracking query parameters removed when the query is kept
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "ref",
    "source",
];

/// Which URL parts are dropped from the frontier identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub strip_query: bool,
    pub strip_fragment: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            strip_query: true,
            strip_fragment: true,
        }
    }
}

impl From<&NormalizationConfig> for NormalizeOptions {
    fn from(config: &NormalizationConfig) -> Self {
        Self {
            strip_query: config.strip_query,
            strip_fragment: config.strip_fragment,
        }
    }
}

/// Normalizes a URL into its frontier identity
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the host
/// 3. Normalize path:
///    - Remove dot segments (. and ..) and empty segments
///    - Remove trailing slash (except for root /)
/// 4. Remove fragment (if `strip_fragment`)
/// 5. Remove the query (if `strip_query`); otherwise drop tracking
///    parameters and sort the remaining ones
///
/// # Examples
///
/// ```
/// use paremia::url::{normalize_url, NormalizeOptions};
///
/// let url = normalize_url("https://EXAMPLE.COM/proverbs/?page=2#top", NormalizeOptions::default()).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/proverbs");
/// ```
pub fn normalize_url(url_str: &str, options: NormalizeOptions) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {
            let lowered = host.to_lowercase();
            url.set_host(Some(&lowered))
                .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
        }
        _ => return Err(UrlError::MissingDomain),
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    if options.strip_fragment {
        url.set_fragment(None);
    }

    if url.query().is_some() {
        let kept = if options.strip_query {
            Vec::new()
        } else {
            filter_and_sort_query_params(&url)
        };

        if kept.is_empty() {
            url.set_query(None);
        } else {
            let query_string = kept
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keep_query() -> NormalizeOptions {
        NormalizeOptions {
            strip_query: false,
            strip_fragment: true,
        }
    }

    #[test]
    fn test_scheme_is_preserved() {
        let result = normalize_url("http://example.com/page", NormalizeOptions::default()).unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result =
            normalize_url("https://example.com/page/", NormalizeOptions::default()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://example.com", NormalizeOptions::default()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_remove_fragment() {
        let result =
            normalize_url("https://example.com/page#section", NormalizeOptions::default()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_fragment_when_configured() {
        let options = NormalizeOptions {
            strip_query: true,
            strip_fragment: false,
        };
        let result = normalize_url("https://example.com/page#section", options).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page#section");
    }

    #[test]
    fn test_strip_query_by_default() {
        let result =
            normalize_url("https://example.com/page?b=2&a=1", NormalizeOptions::default()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_kept_query_is_sorted_and_filtered() {
        let result = normalize_url(
            "https://example.com/page?keep=yes&utm_medium=email&another=value&fbclid=123",
            keep_query(),
        )
        .unwrap();
        assert_eq!(
            result.as_str(),
            "https://example.com/page?another=value&keep=yes"
        );
    }

    #[test]
    fn test_only_tracking_params_drops_query() {
        let result =
            normalize_url("https://example.com/page?utm_source=a&gclid=c", keep_query()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_normalize_path_with_dots() {
        let result =
            normalize_url("https://example.com/a/../b/./c", NormalizeOptions::default()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_lowercase_host_only() {
        let result =
            normalize_url("https://EXAMPLE.COM/Proverbs", NormalizeOptions::default()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/Proverbs");
    }

    #[test]
    fn test_multiple_slashes() {
        let result = normalize_url(
            "https://example.com///path//to///page",
            NormalizeOptions::default(),
        )
        .unwrap();
        assert_eq!(result.as_str(), "https://example.com/path/to/page");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page", NormalizeOptions::default());
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        let result = normalize_url("not a url", NormalizeOptions::default());
        assert!(matches!(result.unwrap_err(), UrlError::Parse(_)));
    }

    #[test]
    fn test_equivalent_forms_share_identity() {
        let a = normalize_url("https://Example.com/en/proverbs/", NormalizeOptions::default())
            .unwrap();
        let b = normalize_url(
            "https://example.com/en/proverbs?utm_source=x#list",
            NormalizeOptions::default(),
        )
        .unwrap();
        assert_eq!(a, b);
    }
}
