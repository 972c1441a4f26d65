//! Proverb fragment and link extraction
//!
//! This module pulls candidate proverbs out of an HTML document:
//! - Structural markers: `.proverb`, `.saying` and `[itemprop="proverb"]` elements
//! - Text blocks (`p`, `li`, `blockquote`, `dd`) whose own text mentions
//!   "proverb" (case-insensitive)
//!
//! When candidates nest, only the innermost one is kept, so a proverb
//! wrapped in two markers yields one fragment.
//!
//! It also finds links worth following, i.e. anchors whose text or target
//! mentions proverbs.

use scraper::{ElementRef, Html, Selector};
use scraper::node::Node;
use std::collections::HashSet;
use url::Url;

/// Token that marks paragraphs and links as proverb-related
pub const PROVERB_MARKER: &str = "proverb";

const CANDIDATE_SELECTOR: &str =
    r#"p, li, blockquote, dd, .proverb, .saying, [itemprop="proverb"]"#;
const STRUCTURAL_SELECTOR: &str = r#".proverb, .saying, [itemprop="proverb"]"#;

/// A candidate proverb and the page it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub source_url: String,
}

/// Fragments of one document, in document order
///
/// The document is fully parsed when [`extract`] returns; this only hands
/// out the collected fragments.
#[derive(Debug)]
pub struct Fragments {
    inner: std::vec::IntoIter<Fragment>,
}

impl Iterator for Fragments {
    type Item = Fragment;

    fn next(&mut self) -> Option<Fragment> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Fragments {}

/// Extracts proverb fragments from `html`
///
/// Whitespace inside each fragment is collapsed and empty fragments are
/// dropped. Duplicate fragments are kept.
///
/// # Example
///
/// ```
/// use paremia::crawler::extract;
/// use url::Url;
///
/// let html = r#"<p class="proverb">Actions speak louder than words.</p><p>Unrelated.</p>"#;
/// let url = Url::parse("https://example.com/en/proverbs").unwrap();
/// let texts: Vec<String> = extract(html, &url).map(|f| f.text).collect();
/// assert_eq!(texts, vec!["Actions speak louder than words."]);
/// ```
pub fn extract(html: &str, source_url: &Url) -> Fragments {
    let source = source_url.to_string();
    let fragments = candidate_texts(html)
        .into_iter()
        .map(|text| Fragment {
            text,
            source_url: source.clone(),
        })
        .collect::<Vec<_>>();

    Fragments {
        inner: fragments.into_iter(),
    }
}

/// Number of fragments `extract` would yield for `html`
pub fn count_candidates(html: &str) -> usize {
    candidate_texts(html).len()
}

fn candidate_texts(html: &str) -> Vec<String> {
    let (candidates, structural) = match (
        Selector::parse(CANDIDATE_SELECTOR),
        Selector::parse(STRUCTURAL_SELECTOR),
    ) {
        (Ok(c), Ok(s)) => (c, s),
        _ => return Vec::new(),
    };

    let document = Html::parse_document(html);
    let matched: Vec<(ElementRef<'_>, String)> = document
        .select(&candidates)
        .filter_map(|element| {
            let text = normalize_text(element);
            if text.is_empty() {
                return None;
            }
            let is_candidate = structural.matches(&element)
                || (text.to_lowercase().contains(PROVERB_MARKER) && has_own_text(element));
            is_candidate.then_some((element, text))
        })
        .collect();

    // An element enclosing another candidate yields to it
    let enclosing: HashSet<_> = matched
        .iter()
        .flat_map(|(element, _)| element.ancestors().map(|ancestor| ancestor.id()))
        .collect();

    matched
        .into_iter()
        .filter(|(element, _)| !enclosing.contains(&element.id()))
        .map(|(_, text)| text)
        .collect()
}

/// Whether the element has non-blank text outside of links
fn has_own_text(element: ElementRef<'_>) -> bool {
    element.descendants().any(|node| {
        let Node::Text(text) = node.value() else {
            return false;
        };
        !text.trim().is_empty()
            && !node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != element.id())
                .any(|ancestor| matches!(ancestor.value(), Node::Element(e) if e.name() == "a"))
    })
}

/// Element text with runs of whitespace collapsed to single spaces
fn normalize_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Finds links on the page whose anchor text or href mentions `marker`
///
/// Links are resolved against `base_url`; only http(s) targets are kept.
/// Order is preserved and duplicates are removed.
pub fn extract_proverb_links(html: &str, base_url: &Url, marker: &str) -> Vec<String> {
    let marker = marker.to_lowercase();
    anchors(html, base_url)
        .into_iter()
        .filter(|(href, text)| {
            href.to_lowercase().contains(&marker) || text.to_lowercase().contains(&marker)
        })
        .map(|(href, _)| href)
        .collect()
}

/// All resolvable anchors on the page as `(absolute href, anchor text)`, deduplicated by href
pub(crate) fn anchors(html: &str, base_url: &Url) -> Vec<(String, String)> {
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }
        let resolved = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url));

        if let Some(href) = resolved {
            if seen.insert(href.clone()) {
                links.push((href, normalize_text(element)));
            }
        }
    }

    links
}

/// Resolves an href to an absolute http(s) URL
///
/// Returns None for scripts, mail/phone links, data URIs, same-page anchors
/// and anything that does not resolve.
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
