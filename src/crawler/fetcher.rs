//! Page fetcher
//!
//! This module retrieves page content for the crawler:
//! - Building the HTTP client with the crawler's user agent
//! - Plain GET requests for static content
//! - Rendered fetches for domains that need script execution, or when the
//!   static body contains no proverb candidates
//! - Error classification into transient and permanent failures
//! - A per-pass content cache consulted before any network access

use crate::config::{FetcherConfig, UserAgentConfig};
use crate::crawler::cache::{ContentCache, MemoryCache};
use crate::crawler::extractor::count_candidates;
use crate::crawler::render::{RenderOutcome, RenderPool};
use crate::url::{extract_domain, matches_any};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// How the content of a page was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Static,
    Rendered,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Static => write!(f, "static"),
            ContentKind::Rendered => write!(f, "rendered"),
        }
    }
}

/// A successfully fetched document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub content: String,
    pub kind: ContentKind,
}

/// Fetch failures
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Timeout, refused connection or broken transfer
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status; 4xx is permanent, everything else transient
    #[error("HTTP status {status}")]
    HttpStatus { status: u16, permanent: bool },

    /// The renderer did not settle within its budget
    #[error("Render timed out after {0:?}")]
    RenderTimeout(Duration),

    /// The renderer failed for another reason
    #[error("Render failed: {0}")]
    Render(String),
}

impl FetchError {
    /// Builds the error for an HTTP status code
    pub fn from_status(status: u16) -> Self {
        FetchError::HttpStatus {
            status,
            permanent: (400..500).contains(&status),
        }
    }

    /// True when trying the same URL again later may succeed
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            FetchError::HttpStatus {
                permanent: true,
                ..
            }
        )
    }

    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::HttpStatus { .. } => "http_status",
            FetchError::RenderTimeout(_) => "render_timeout",
            FetchError::Render(_) => "render",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Network("Request timeout".to_string())
        } else if e.is_connect() {
            FetchError::Network("Connection refused".to_string())
        } else if let Some(status) = e.status() {
            FetchError::from_status(status.as_u16())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Total per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use paremia::config::UserAgentConfig;
/// use paremia::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "Paremia".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        user_agent.crawler_name,
        user_agent.crawler_version,
        user_agent.contact_url,
        user_agent.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain GET of a URL, returning the body of a successful response
pub async fn fetch_static(client: &Client, url: &Url) -> Result<String, FetchError> {
    let response = client.get(url.as_str()).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::from_status(status.as_u16()));
    }

    Ok(response.text().await?)
}

/// Chooses between static and rendered retrieval for each URL
pub struct Fetcher {
    client: Client,
    render_pool: Option<RenderPool>,
    render_domains: Vec<String>,
    render_timeout: Duration,
    cache: Arc<dyn ContentCache>,
}

impl Fetcher {
    /// Creates a static-only fetcher with an empty in-memory cache
    pub fn new(client: Client) -> Self {
        Self {
            client,
            render_pool: None,
            render_domains: Vec::new(),
            render_timeout: Duration::from_secs(20),
            cache: Arc::new(MemoryCache::new()),
        }
    }

    /// Applies the render domain list and timeout from the fetcher config
    pub fn with_config(mut self, config: &FetcherConfig) -> Self {
        self.render_domains = config.render_domains.clone();
        self.render_timeout = Duration::from_secs(config.render_timeout_seconds);
        self
    }

    pub fn with_render_pool(mut self, pool: RenderPool) -> Self {
        self.render_pool = Some(pool);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ContentCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Forgets every cached page
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// True if the URL's domain is configured to always need rendering
    pub fn requires_render(&self, url: &Url) -> bool {
        extract_domain(url)
            .map(|domain| matches_any(&self.render_domains, &domain))
            .unwrap_or(false)
    }

    /// Fetches `url`
    ///
    /// # Fetch Flow
    ///
    /// 1. Return the cached page if there is one
    /// 2. Render directly if the domain needs script execution
    /// 3. Otherwise GET the page; if the body holds no proverb candidates,
    ///    try a rendered fetch and keep the static body if that fails
    /// 4. Cache the result
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if let Some(page) = self.cache.get(url.as_str()) {
            tracing::debug!("Cache hit for {}", url);
            return Ok(page);
        }

        let page = match (&self.render_pool, self.requires_render(url)) {
            (Some(pool), true) => self.render_with(pool, url).await?,
            _ => self.fetch_with_fallback(url).await?,
        };

        self.cache.put(url.as_str(), page.clone());
        Ok(page)
    }

    async fn fetch_with_fallback(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let content = fetch_static(&self.client, url).await?;

        let pool = match &self.render_pool {
            Some(pool) if count_candidates(&content) == 0 => pool,
            _ => {
                return Ok(FetchedPage {
                    content,
                    kind: ContentKind::Static,
                })
            }
        };

        tracing::debug!("No candidates in static body of {}, rendering", url);
        match self.render_with(pool, url).await {
            Ok(page) => Ok(page),
            Err(e) => {
                tracing::debug!("Render fallback failed for {}: {}", url, e);
                Ok(FetchedPage {
                    content,
                    kind: ContentKind::Static,
                })
            }
        }
    }

    async fn render_with(&self, pool: &RenderPool, url: &Url) -> Result<FetchedPage, FetchError> {
        match pool.render(url).await {
            RenderOutcome::Rendered(content) => Ok(FetchedPage {
                content,
                kind: ContentKind::Rendered,
            }),
            RenderOutcome::TimedOut => Err(FetchError::RenderTimeout(self.render_timeout)),
            RenderOutcome::Failed(e) => Err(FetchError::Render(e.to_string())),
        }
    }
}
