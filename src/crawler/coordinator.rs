//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the perpetual crawl loop, including:
//! - Restoring the visited-set from storage and seeding the frontier
//! - Running discovery at the start of each pass
//! - Dispatching each batch URL through fetch, extract, classify and store
//!   on a bounded worker pool, isolating failures per URL
//! - Marking batch URLs visited (or releasing them for a bounded retry)
//! - Sleeping between passes until shutdown

use crate::classify::{Classifier, Language, LanguageDetector, WhatlangDetector};
use crate::config::Config;
use crate::crawler::cache::ContentCache;
use crate::crawler::discovery::{Discoverer, NoopDiscoverer, SearchDiscoverer};
use crate::crawler::extractor::{extract, extract_proverb_links, Fragment, PROVERB_MARKER};
use crate::crawler::fetcher::{build_http_client, Fetcher};
use crate::crawler::frontier::{Frontier, FrontierUrl};
use crate::crawler::render::{RenderPool, Renderer};
use crate::state::{UrlProgress, UrlState};
use crate::storage::{open_storage, NewProverb, Storage, VisitRecord};
use crate::url::NormalizeOptions;
use crate::ParemiaError;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Shared handle to the storage backend
pub type SharedStorage = Arc<Mutex<Box<dyn Storage + Send>>>;

/// Counts for one crawl pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// URLs newly enqueued by discovery
    pub discovered: usize,
    /// URLs newly enqueued from links on fetched pages
    pub links_enqueued: usize,
    /// URLs dispatched in this pass
    pub urls_processed: usize,
    /// URLs whose pipeline ended in `Failed`
    pub urls_failed: usize,
    /// Failed URLs returned to the frontier for another attempt
    pub urls_released: usize,
    /// Fragments extracted across all URLs
    pub fragments_seen: usize,
    /// Records stored, per partition
    pub stored: BTreeMap<Language, usize>,
    /// Fragments dropped because their language is unsupported
    pub unsupported_fragments: usize,
    /// URLs that failed while writing to storage
    pub store_failures: usize,
}

impl PassReport {
    pub fn total_stored(&self) -> usize {
        self.stored.values().sum()
    }

    pub fn stored_in(&self, language: Language) -> usize {
        self.stored.get(&language).copied().unwrap_or(0)
    }
}

/// Result of running one URL through the pipeline
#[derive(Debug)]
struct UrlOutcome {
    item: FrontierUrl,
    state: UrlState,
    error: Option<ParemiaError>,
    fragments: usize,
    stored: BTreeMap<Language, usize>,
    unsupported: usize,
    links_enqueued: usize,
}

impl UrlOutcome {
    fn new(item: FrontierUrl) -> Self {
        Self {
            item,
            state: UrlState::Pending,
            error: None,
            fragments: 0,
            stored: BTreeMap::new(),
            unsupported: 0,
            links_enqueued: 0,
        }
    }

    fn stored_total(&self) -> usize {
        self.stored.values().sum()
    }

    /// Whether a later attempt could succeed
    fn is_transient(&self) -> bool {
        match &self.error {
            Some(ParemiaError::Fetch(e)) => e.is_transient(),
            Some(ParemiaError::Storage(_)) => true,
            _ => false,
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: SharedStorage,
    frontier: Arc<Frontier>,
    fetcher: Fetcher,
    classifier: Classifier,
    discoverer: Arc<dyn Discoverer>,
}

impl Coordinator {
    /// Creates a coordinator with the default collaborators for `config`
    ///
    /// Opens the SQLite database at `storage.endpoint`, uses the built-in
    /// language detector and runs search discovery if it is enabled.
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(ParemiaError)` - Failed to initialize
    pub fn new(config: Config) -> Result<Self, ParemiaError> {
        CoordinatorBuilder::new(config).build()
    }

    pub fn builder(config: Config) -> CoordinatorBuilder {
        CoordinatorBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Shared storage handle, e.g. for reading back results
    pub fn storage(&self) -> SharedStorage {
        Arc::clone(&self.storage)
    }

    fn lock_storage(&self) -> MutexGuard<'_, Box<dyn Storage + Send>> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs passes until the process is killed
    pub async fn run(&self) {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Runs passes, sleeping the poll interval between them, until `shutdown` completes
    ///
    /// A pass interrupted by shutdown leaves its in-flight URLs unvisited.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let interval = Duration::from_secs(self.config.crawler.poll_interval_seconds);
        tokio::pin!(shutdown);

        let mut pass = 0u64;
        loop {
            pass += 1;
            tracing::info!("Starting pass {}", pass);

            tokio::select! {
                report = self.run_pass() => {
                    tracing::info!(
                        "Pass {} finished: {} processed, {} failed, {} stored, {} pending",
                        pass,
                        report.urls_processed,
                        report.urls_failed,
                        report.total_stored(),
                        self.frontier.pending_len()
                    );
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested during pass {}", pass);
                    return;
                }
            }

            tracing::debug!("Sleeping {:?} before next pass", interval);
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping crawler");
                    return;
                }
            }
        }
    }

    /// Runs a single pass: discover, take one batch, process it, settle it
    pub async fn run_pass(&self) -> PassReport {
        let mut report = PassReport::default();

        let proposed = self.discoverer.discover().await;
        report.discovered = self.frontier.enqueue_all(proposed);

        let batch = self.frontier.next_batch(self.config.crawler.batch_size);
        if batch.is_empty() {
            tracing::info!("Frontier is empty, nothing to crawl this pass");
            return report;
        }

        tracing::info!(
            "Processing batch of {} URLs with {} workers",
            batch.len(),
            self.config.crawler.worker_pool_size
        );

        let outcomes: Vec<UrlOutcome> = stream::iter(batch)
            .map(|item| self.process_url(item))
            .buffer_unordered(self.config.crawler.worker_pool_size.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            self.settle(outcome, &mut report);
        }
        self.fetcher.clear_cache();

        report
    }

    /// Runs one URL through the pipeline, never propagating its failure
    async fn process_url(&self, item: FrontierUrl) -> UrlOutcome {
        let mut progress = UrlProgress::new(item.as_str());
        let mut outcome = UrlOutcome::new(item);

        match self.run_pipeline(&mut progress, &mut outcome).await {
            Ok(()) => {
                tracing::info!(
                    "Done {}: {} fragments, {} stored, {} unsupported",
                    outcome.item.url,
                    outcome.fragments,
                    outcome.stored_total(),
                    outcome.unsupported
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Failed {} while {}: {}",
                    outcome.item.url,
                    progress.state(),
                    e
                );
                progress.fail();
                outcome.error = Some(e);
            }
        }

        outcome.state = progress.state();
        outcome
    }

    async fn run_pipeline(
        &self,
        progress: &mut UrlProgress,
        outcome: &mut UrlOutcome,
    ) -> Result<(), ParemiaError> {
        let url = outcome.item.url.clone();

        progress.advance(UrlState::Fetching)?;
        let page = self.fetcher.fetch(&url).await?;
        tracing::debug!("Fetched {} ({})", url, page.kind);

        progress.advance(UrlState::Extracting)?;
        let fragments: Vec<Fragment> = extract(&page.content, &url).collect();
        outcome.fragments = fragments.len();

        if self.config.crawler.follow_links {
            let links = extract_proverb_links(&page.content, &url, PROVERB_MARKER);
            outcome.links_enqueued = self.frontier.enqueue_all(links);
        }

        progress.advance(UrlState::Classifying)?;
        let mut accepted = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let classification = self.classifier.explain(&fragment.text, &url);
            if classification.is_unsupported() {
                tracing::info!(
                    "Unsupported language {} for fragment from {}: {:?}",
                    classification.detected_code.as_deref().unwrap_or("?"),
                    url,
                    fragment.text
                );
                outcome.unsupported += 1;
                continue;
            }
            tracing::debug!(
                "Classified {:?} as {} ({:?})",
                fragment.text,
                classification.language,
                classification.basis
            );
            accepted.push((fragment, classification.language));
        }

        progress.advance(UrlState::Storing)?;
        {
            let mut storage = self.lock_storage();
            for (fragment, language) in accepted {
                storage.insert_proverb(&NewProverb {
                    text: fragment.text,
                    source_url: Some(fragment.source_url),
                    language,
                })?;
                *outcome.stored.entry(language).or_insert(0) += 1;
            }
        }

        progress.advance(UrlState::Done)?;
        Ok(())
    }

    /// Marks a processed URL visited, or releases it for another attempt
    fn settle(&self, outcome: UrlOutcome, report: &mut PassReport) {
        report.urls_processed += 1;
        report.fragments_seen += outcome.fragments;
        report.unsupported_fragments += outcome.unsupported;
        report.links_enqueued += outcome.links_enqueued;
        for (language, count) in &outcome.stored {
            *report.stored.entry(*language).or_insert(0) += count;
        }

        let failed = outcome.state == UrlState::Failed;
        if failed {
            report.urls_failed += 1;
            if matches!(outcome.error, Some(ParemiaError::Storage(_))) {
                report.store_failures += 1;
            }
        }

        let url = outcome.item.as_str().to_string();
        let attempts = self.frontier.attempts(&url) + 1;

        let crawler = &self.config.crawler;
        if failed && crawler.retry_failed && outcome.is_transient() && attempts < crawler.max_attempts
        {
            self.frontier.release(outcome.item);
            report.urls_released += 1;
            tracing::info!(
                "Released {} for retry (attempt {} of {})",
                url,
                attempts,
                crawler.max_attempts
            );
            return;
        }

        let visit = VisitRecord {
            url: url.clone(),
            state: outcome.state,
            error_message: outcome.error.as_ref().map(|e| e.to_string()),
            fragments: outcome.fragments as u32,
            stored: outcome.stored_total() as u32,
            attempts,
            discovered_at: outcome.item.discovered_at.to_rfc3339(),
            visited_at: Utc::now().to_rfc3339(),
        };

        self.frontier.mark_visited(&url);
        if let Err(e) = self.lock_storage().mark_visited(&visit) {
            tracing::error!("Failed to persist visit for {}: {}", url, e);
        }
    }
}

/// Fluent construction of a [`Coordinator`] with replaceable collaborators
///
/// # Example
///
/// ```no_run
/// use paremia::config::load_config;
/// use paremia::crawler::CoordinatorBuilder;
/// use paremia::storage::SqliteStorage;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("paremia.toml"))?;
/// let _coordinator = CoordinatorBuilder::new(config)
///     .storage(SqliteStorage::new_in_memory()?)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct CoordinatorBuilder {
    config: Config,
    storage: Option<Box<dyn Storage + Send>>,
    discoverer: Option<Arc<dyn Discoverer>>,
    detector: Option<Arc<dyn LanguageDetector>>,
    renderer: Option<Arc<dyn Renderer>>,
    cache: Option<Arc<dyn ContentCache>>,
}

impl CoordinatorBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            storage: None,
            discoverer: None,
            detector: None,
            renderer: None,
            cache: None,
        }
    }

    /// Uses `storage` instead of opening `storage.endpoint`
    pub fn storage<S: Storage + Send + 'static>(mut self, storage: S) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    pub fn discoverer(mut self, discoverer: Arc<dyn Discoverer>) -> Self {
        self.discoverer = Some(discoverer);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Enables rendered fetches through `renderer`
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ContentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builds the coordinator
    ///
    /// Restores the visited-set from storage, then enqueues the seed URLs
    /// (seeds already visited are skipped).
    pub fn build(self) -> Result<Coordinator, ParemiaError> {
        let config = self.config;

        let storage: Box<dyn Storage + Send> = match self.storage {
            Some(storage) => storage,
            None => Box::new(open_storage(Path::new(&config.storage.endpoint))?),
        };

        let visited = storage.load_visited()?;
        tracing::info!("Restored {} visited URLs from storage", visited.len());

        let frontier = Frontier::with_visited(
            NormalizeOptions::from(&config.normalization),
            visited,
        );
        let seeded = frontier.enqueue_all(&config.crawler.seed_urls);
        tracing::info!(
            "Enqueued {} of {} seed URLs",
            seeded,
            config.crawler.seed_urls.len()
        );

        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.fetcher.request_timeout_seconds),
        )?;

        let mut fetcher = Fetcher::new(client.clone()).with_config(&config.fetcher);
        if let Some(cache) = self.cache {
            fetcher = fetcher.with_cache(cache);
        }
        if let Some(renderer) = self.renderer {
            fetcher = fetcher.with_render_pool(RenderPool::new(
                renderer,
                config.fetcher.render_pool_size,
                Duration::from_secs(config.fetcher.render_timeout_seconds),
            ));
        }

        let detector: Arc<dyn LanguageDetector> = match self.detector {
            Some(detector) => detector,
            None => Arc::new(WhatlangDetector),
        };
        let classifier = Classifier::from_codes(detector, &config.languages.supported);

        let discoverer: Arc<dyn Discoverer> = match self.discoverer {
            Some(discoverer) => discoverer,
            None if config.discovery.enabled => {
                Arc::new(SearchDiscoverer::new(client, &config.discovery))
            }
            None => Arc::new(NoopDiscoverer),
        };

        Ok(Coordinator {
            config: Arc::new(config),
            storage: Arc::new(Mutex::new(storage)),
            frontier: Arc::new(frontier),
            fetcher,
            classifier,
            discoverer,
        })
    }
}
