use serde::Deserialize;

/// Main configuration structure for Paremia
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub languages: LanguagesConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub normalization: NormalizationConfig,
}

/// Crawl loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URLs placed in the frontier at startup
    #[serde(rename = "seed-urls")]
    pub seed_urls: Vec<String>,

    /// Sleep between passes (seconds)
    #[serde(rename = "poll-interval-seconds", default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Maximum number of URLs pulled from the frontier per pass
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of URLs processed concurrently
    #[serde(rename = "worker-pool-size", default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Enqueue proverb-looking links found on fetched pages
    #[serde(rename = "follow-links", default = "default_true")]
    pub follow_links: bool,

    /// Release transiently failed URLs back to the frontier instead of marking them visited
    #[serde(rename = "retry-failed", default)]
    pub retry_failed: bool,

    /// Attempts per URL before it is marked visited regardless (only with retry-failed)
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// Fetch strategy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(rename = "request-timeout-seconds", default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    #[serde(rename = "render-timeout-seconds", default = "default_render_timeout")]
    pub render_timeout_seconds: u64,

    /// Domain patterns (e.g., "*.example.com") that always need a rendered fetch
    #[serde(rename = "render-domains", default)]
    pub render_domains: Vec<String>,

    /// Maximum number of concurrent rendered fetches
    #[serde(rename = "render-pool-size", default = "default_render_pool_size")]
    pub render_pool_size: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            render_timeout_seconds: default_render_timeout(),
            render_domains: Vec::new(),
            render_pool_size: default_render_pool_size(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Languages that are classified and stored
#[derive(Debug, Clone, Deserialize)]
pub struct LanguagesConfig {
    /// ISO 639-1 codes, a subset of en, es, fr, de
    #[serde(default = "default_languages")]
    pub supported: Vec<String>,
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            supported: default_languages(),
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub endpoint: String,
}

/// Search-based URL discovery
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Search URL template; `{query}` is replaced by the encoded query
    #[serde(rename = "search-url", default = "default_search_url")]
    pub search_url: String,

    #[serde(default = "default_queries")]
    pub queries: Vec<String>,

    /// Substring a result link must contain to become a candidate
    #[serde(rename = "link-filter", default = "default_link_filter")]
    pub link_filter: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_url: default_search_url(),
            queries: default_queries(),
            link_filter: default_link_filter(),
        }
    }
}

/// Controls which URL parts take part in frontier identity
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizationConfig {
    #[serde(rename = "strip-query", default = "default_true")]
    pub strip_query: bool,

    #[serde(rename = "strip-fragment", default = "default_true")]
    pub strip_fragment: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            strip_query: true,
            strip_fragment: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    3600
}

fn default_batch_size() -> usize {
    50
}

fn default_worker_pool_size() -> usize {
    8
}

fn default_max_attempts() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    30
}

fn default_render_timeout() -> u64 {
    20
}

fn default_render_pool_size() -> usize {
    1
}

fn default_languages() -> Vec<String> {
    ["en", "es", "fr", "de"].iter().map(|s| s.to_string()).collect()
}

fn default_search_url() -> String {
    "https://html.duckduckgo.com/html/?q={query}".to_string()
}

fn default_queries() -> Vec<String> {
    [
        "english proverbs",
        "spanish sayings",
        "french proverbs",
        "german proverbs",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_link_filter() -> String {
    "proverb".to_string()
}
