//! Rendered-page fetching
//!
//! A [`Renderer`] turns a URL into the page's HTML after scripts have run.
//! Renderers are exclusive resources, so all access goes through a
//! [`RenderPool`] that bounds concurrency and applies the settle timeout.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

/// Failure reported by a renderer implementation
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Black-box page renderer
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Returns the rendered document for `url`
    async fn render(&self, url: &Url) -> Result<String, RenderError>;
}

/// Outcome of a pooled render
#[derive(Debug)]
pub enum RenderOutcome {
    Rendered(String),
    TimedOut,
    Failed(RenderError),
}

/// Bounded-concurrency, time-limited access to a shared renderer
#[derive(Clone)]
pub struct RenderPool {
    renderer: Arc<dyn Renderer>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl RenderPool {
    /// # Arguments
    ///
    /// * `renderer` - The renderer to share
    /// * `size` - Maximum concurrent renders (at least 1)
    /// * `timeout` - Budget for one render, including time spent waiting for a slot
    pub fn new(renderer: Arc<dyn Renderer>, size: usize, timeout: Duration) -> Self {
        Self {
            renderer,
            permits: Arc::new(Semaphore::new(size.max(1))),
            timeout,
        }
    }

    pub async fn render(&self, url: &Url) -> RenderOutcome {
        let work = async {
            let _permit = match self.permits.acquire().await {
                Ok(permit) => permit,
                Err(_) => return Err(RenderError::new("render pool closed")),
            };
            self.renderer.render(url).await
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(Ok(html)) => RenderOutcome::Rendered(html),
            Ok(Err(e)) => RenderOutcome::Failed(e),
            Err(_) => RenderOutcome::TimedOut,
        }
    }
}

#[cfg(feature = "chromium")]
pub use chromium::ChromiumRenderer;

#[cfg(feature = "chromium")]
mod chromium {
    use super::{RenderError, Renderer};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::Page;
    use futures::StreamExt;
    use tokio::runtime::Handle;
    use tokio::task::JoinHandle;
    use url::Url;

    /// Headless Chrome renderer owning a single browser process
    pub struct ChromiumRenderer {
        browser: Browser,
        handler: JoinHandle<()>,
    }

    impl ChromiumRenderer {
        /// Launches the browser; fails if Chrome cannot be started
        pub async fn launch() -> Result<Self, RenderError> {
            let config = BrowserConfig::builder()
                .build()
                .map_err(RenderError::new)?;
            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| RenderError::new(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        tracing::debug!("Browser handler event error");
                    }
                }
            });

            tracing::info!("Headless browser launched");
            Ok(Self { browser, handler })
        }
    }

    /// Open tab that is closed on every exit path
    ///
    /// A render cancelled by the pool timeout drops the guard mid-navigation,
    /// so `Drop` hands the close to the runtime.
    struct TabGuard {
        page: Option<Page>,
        url: String,
        runtime: Handle,
    }

    impl TabGuard {
        fn new(page: Page, url: &Url) -> Self {
            Self {
                page: Some(page),
                url: url.to_string(),
                runtime: Handle::current(),
            }
        }

        fn page(&self) -> Result<&Page, RenderError> {
            self.page
                .as_ref()
                .ok_or_else(|| RenderError::new("tab already closed"))
        }

        async fn close(mut self) {
            if let Some(page) = self.page.take() {
                if let Err(e) = page.close().await {
                    tracing::warn!("Failed to close tab for {}: {}", self.url, e);
                }
            }
        }
    }

    impl Drop for TabGuard {
        fn drop(&mut self) {
            if let Some(page) = self.page.take() {
                let url = std::mem::take(&mut self.url);
                self.runtime.spawn(async move {
                    if let Err(e) = page.close().await {
                        tracing::warn!("Failed to close abandoned tab for {}: {}", url, e);
                    } else {
                        tracing::debug!("Closed abandoned tab for {}", url);
                    }
                });
            }
        }
    }

    #[async_trait]
    impl Renderer for ChromiumRenderer {
        async fn render(&self, url: &Url) -> Result<String, RenderError> {
            let page = self
                .browser
                .new_page(url.as_str())
                .await
                .map_err(|e| RenderError::new(e.to_string()))?;
            let tab = TabGuard::new(page, url);

            let result = async {
                let page = tab.page()?;
                page.wait_for_navigation()
                    .await
                    .map_err(|e| RenderError::new(e.to_string()))?;
                page.content()
                    .await
                    .map_err(|e| RenderError::new(e.to_string()))
            }
            .await;

            tab.close().await;
            result
        }
    }

    impl Drop for ChromiumRenderer {
        fn drop(&mut self) {
            self.handler.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowRenderer {
        delay: Duration,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Renderer for SlowRenderer {
        async fn render(&self, url: &Url) -> Result<String, RenderError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("<p>{}</p>", url))
        }
    }

    struct BrokenRenderer;

    #[async_trait]
    impl Renderer for BrokenRenderer {
        async fn render(&self, _url: &Url) -> Result<String, RenderError> {
            Err(RenderError::new("crashed"))
        }
    }

    /// Renderer that opens a tab, then hangs until cancelled
    struct HangingRenderer {
        open_tabs: Arc<AtomicUsize>,
    }

    struct Tab(Arc<AtomicUsize>);

    impl Drop for Tab {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Renderer for HangingRenderer {
        async fn render(&self, _url: &Url) -> Result<String, RenderError> {
            self.open_tabs.fetch_add(1, Ordering::SeqCst);
            let _tab = Tab(self.open_tabs.clone());
            std::future::pending::<()>().await;
            Ok(String::new())
        }
    }

    fn slow(delay_ms: u64) -> Arc<SlowRenderer> {
        Arc::new(SlowRenderer {
            delay: Duration::from_millis(delay_ms),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_render_success() {
        let pool = RenderPool::new(slow(1), 1, Duration::from_secs(5));
        let url = Url::parse("https://example.com/").unwrap();

        match pool.render(&url).await {
            RenderOutcome::Rendered(html) => assert!(html.contains("example.com")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_render_timeout() {
        let pool = RenderPool::new(slow(500), 1, Duration::from_millis(20));
        let url = Url::parse("https://example.com/").unwrap();

        assert!(matches!(pool.render(&url).await, RenderOutcome::TimedOut));
    }

    #[tokio::test]
    async fn test_timeout_releases_in_flight_tab() {
        let open_tabs = Arc::new(AtomicUsize::new(0));
        let renderer = Arc::new(HangingRenderer {
            open_tabs: open_tabs.clone(),
        });
        let pool = RenderPool::new(renderer, 1, Duration::from_millis(20));
        let url = Url::parse("https://example.com/spa").unwrap();

        assert!(matches!(pool.render(&url).await, RenderOutcome::TimedOut));
        assert_eq!(open_tabs.load(Ordering::SeqCst), 0);

        // The slot is free again for the next render
        assert!(matches!(pool.render(&url).await, RenderOutcome::TimedOut));
        assert_eq!(open_tabs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_render_failure() {
        let pool = RenderPool::new(Arc::new(BrokenRenderer), 1, Duration::from_secs(1));
        let url = Url::parse("https://example.com/").unwrap();

        assert!(matches!(pool.render(&url).await, RenderOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let renderer = slow(20);
        let pool = RenderPool::new(renderer.clone(), 2, Duration::from_secs(5));

        let renders = (0..6).map(|i| {
            let pool = pool.clone();
            async move {
                let url = Url::parse(&format!("https://example.com/{}", i)).unwrap();
                pool.render(&url).await
            }
        });
        let outcomes = futures::future::join_all(renders).await;

        assert!(outcomes
            .iter()
            .all(|o| matches!(o, RenderOutcome::Rendered(_))));
        assert!(renderer.peak.load(Ordering::SeqCst) <= 2);
    }
}
