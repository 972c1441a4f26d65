//! Candidate URL discovery through a web search backend
//!
//! Discovery failures are never fatal: a backend that cannot be reached
//! simply contributes no URLs to the pass.

use crate::config::DiscoveryConfig;
use crate::crawler::extractor::anchors;
use crate::crawler::fetcher::fetch_static;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use url::{form_urlencoded, Url};

/// Proposes new candidate URLs for the frontier
#[async_trait]
pub trait Discoverer: Send + Sync {
    async fn discover(&self) -> Vec<String>;
}

/// Discoverer that never proposes anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiscoverer;

#[async_trait]
impl Discoverer for NoopDiscoverer {
    async fn discover(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Scrapes a search engine's HTML result page for each configured query
pub struct SearchDiscoverer {
    client: Client,
    search_url: String,
    queries: Vec<String>,
    link_filter: String,
}

impl SearchDiscoverer {
    pub fn new(client: Client, config: &DiscoveryConfig) -> Self {
        Self {
            client,
            search_url: config.search_url.clone(),
            queries: config.queries.clone(),
            link_filter: config.link_filter.to_lowercase(),
        }
    }

    /// Search URL for one query, with the query form-encoded into `{query}`
    pub fn query_url(&self, query: &str) -> Result<Url, url::ParseError> {
        let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
        Url::parse(&self.search_url.replace("{query}", &encoded))
    }

    async fn search(&self, query: &str) -> Vec<String> {
        let url = match self.query_url(query) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Invalid search URL for query {:?}: {}", query, e);
                return Vec::new();
            }
        };

        let body = match fetch_static(&self.client, &url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Search for {:?} failed: {}", query, e);
                return Vec::new();
            }
        };

        let search_origin = url.origin();
        anchors(&body, &url)
            .into_iter()
            .filter_map(|(href, _)| unwrap_redirect(&href))
            .filter(|target| {
                let internal = Url::parse(target)
                    .map(|u| u.origin() == search_origin)
                    .unwrap_or(true);
                !internal && target.to_lowercase().contains(&self.link_filter)
            })
            .collect()
    }
}

#[async_trait]
impl Discoverer for SearchDiscoverer {
    async fn discover(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for query in &self.queries {
            for url in self.search(query).await {
                if seen.insert(url.clone()) {
                    found.push(url);
                }
            }
        }

        tracing::info!(
            "Discovery proposed {} URLs from {} queries",
            found.len(),
            self.queries.len()
        );
        found
    }
}

/// Resolves search-engine redirect links (`/l/?uddg=<target>`) to their target
fn unwrap_redirect(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    let target = url
        .query_pairs()
        .find(|(key, _)| key == "uddg")
        .map(|(_, value)| value.into_owned());

    match target {
        Some(target) => {
            let target = Url::parse(&target).ok()?;
            matches!(target.scheme(), "http" | "https").then(|| target.to_string())
        }
        None => Some(url.to_string()),
    }
}
