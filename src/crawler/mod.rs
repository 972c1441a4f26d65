//! Crawler module for discovering, fetching and harvesting proverb pages
//!
//! This module contains the core crawling logic, including:
//! - The frontier of pending URLs and the visited-set
//! - Static and rendered fetching with a per-process content cache
//! - Proverb fragment and link extraction
//! - Search-based discovery of candidate pages
//! - Overall crawl coordination

mod cache;
mod coordinator;
mod discovery;
mod extractor;
mod fetcher;
mod frontier;
mod render;

pub use cache::{ContentCache, MemoryCache};
pub use coordinator::{Coordinator, CoordinatorBuilder, PassReport, SharedStorage};
pub use discovery::{Discoverer, NoopDiscoverer, SearchDiscoverer};
pub use extractor::{
    count_candidates, extract, extract_proverb_links, Fragment, Fragments, PROVERB_MARKER,
};
pub use fetcher::{build_http_client, fetch_static, ContentKind, FetchError, FetchedPage, Fetcher};
pub use frontier::{Enqueued, Frontier, FrontierUrl};
pub use render::{RenderError, RenderOutcome, RenderPool, Renderer};

#[cfg(feature = "chromium")]
pub use render::ChromiumRenderer;

