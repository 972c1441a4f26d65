use url::{Host, Url};

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use paremia::url::extract_domain;
///
/// let url = Url::parse("https://ES.Wikiquote.org/wiki/Refranes").unwrap();
/// assert_eq!(extract_domain(&url), Some("es.wikiquote.org".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Splits a URL's host into its dot-separated labels
///
/// Returns `None` for IP hosts, which carry no subdomain or TLD information.
pub fn domain_labels(url: &Url) -> Option<Vec<String>> {
    match url.host()? {
        Host::Domain(domain) => Some(
            domain
                .to_lowercase()
                .split('.')
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Host::Ipv4(_) | Host::Ipv6(_) => None,
    }
}
