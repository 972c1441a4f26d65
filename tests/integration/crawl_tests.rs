//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full crawl
//! passes end-to-end against in-memory or temporary SQLite storage.

use async_trait::async_trait;
use paremia::classify::{Language, LanguageDetector};
use paremia::config::{parse_config, Config};
use paremia::crawler::{
    Coordinator, CoordinatorBuilder, MemoryCache, NoopDiscoverer, RenderError, Renderer,
};
use paremia::state::UrlState;
use paremia::storage::{
    NewProverb, ProverbRecord, SqliteStorage, Storage, StorageError, StorageResult, VisitRecord,
};
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration; `crawler_extra` is appended to the `[crawler]` table
fn create_test_config(seeds: &[String], crawler_extra: &str, db_path: &str) -> Config {
    let seeds = seeds
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join(", ");

    parse_config(&format!(
        r#"
[crawler]
seed-urls = [{seeds}]
poll-interval-seconds = 1
worker-pool-size = 4
{crawler_extra}

[fetcher]
request-timeout-seconds = 5

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[storage]
endpoint = "{db_path}"

[discovery]
enabled = false
"#
    ))
    .expect("test config should be valid")
}

/// Detector that always answers with the same code
struct FixedDetector(&'static str);

impl LanguageDetector for FixedDetector {
    fn detect(&self, _text: &str) -> Option<String> {
        Some(self.0.to_string())
    }
}

fn coordinator(config: Config) -> Coordinator {
    CoordinatorBuilder::new(config)
        .storage(SqliteStorage::new_in_memory().unwrap())
        .discoverer(Arc::new(NoopDiscoverer))
        .build()
        .expect("coordinator should build")
}

fn proverbs(coordinator: &Coordinator, language: Language) -> Vec<ProverbRecord> {
    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    storage.get_proverbs(language).unwrap()
}

fn visit(coordinator: &Coordinator, url: &str) -> Option<VisitRecord> {
    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    storage.get_visit(url).unwrap()
}

async fn mount_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body.to_string())
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_url_hint_overrides_detection_end_to_end() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/en/proverbs",
        r#"<html><body>
            <h1>Proverbs</h1>
            <p class="proverb">Actions speak louder than words.</p>
            <p class="proverb">El que mucho abarca poco aprieta.</p>
        </body></html>"#,
    )
    .await;

    let seed = format!("{}/en/proverbs", server.uri());
    let coordinator = coordinator(create_test_config(&[seed.clone()], "", ":memory:"));

    let report = coordinator.run_pass().await;

    assert_eq!(report.urls_processed, 1);
    assert_eq!(report.urls_failed, 0);
    assert_eq!(report.fragments_seen, 2);
    assert_eq!(report.stored_in(Language::English), 2);
    assert_eq!(report.stored_in(Language::Spanish), 0);

    // Both fragments land in English, including the Spanish one
    let english: Vec<String> = proverbs(&coordinator, Language::English)
        .into_iter()
        .map(|p| p.text)
        .collect();
    assert_eq!(english.len(), 2);
    assert!(english.contains(&"Actions speak louder than words.".to_string()));
    assert!(english.contains(&"El que mucho abarca poco aprieta.".to_string()));
    assert!(proverbs(&coordinator, Language::Spanish).is_empty());

    let stored = proverbs(&coordinator, Language::English);
    assert!(stored
        .iter()
        .all(|p| p.source_url.as_deref() == Some(seed.as_str())));

    let record = visit(&coordinator, &seed).expect("seed should be visited");
    assert_eq!(record.state, UrlState::Done);
    assert_eq!(record.stored, 2);
    assert!(coordinator.frontier().is_visited(&seed));
}

#[tokio::test]
async fn test_fetch_failure_is_isolated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/es/refranes",
        r#"<p class="proverb">No hay mal que por bien no venga.</p>"#,
    )
    .await;
    mount_page(
        &server,
        "/de/sprichwoerter",
        r#"<div class="saying">Aller Anfang ist schwer.</div>"#,
    )
    .await;

    let a = format!("{}/a", server.uri());
    let b = format!("{}/es/refranes", server.uri());
    let c = format!("{}/de/sprichwoerter", server.uri());
    let coordinator = coordinator(create_test_config(
        &[a.clone(), b.clone(), c.clone()],
        "",
        ":memory:",
    ));

    let report = coordinator.run_pass().await;

    assert_eq!(report.urls_processed, 3);
    assert_eq!(report.urls_failed, 1);
    assert_eq!(report.urls_released, 0);
    assert_eq!(report.stored_in(Language::Spanish), 1);
    assert_eq!(report.stored_in(Language::German), 1);

    for url in [&a, &b, &c] {
        assert!(coordinator.frontier().is_visited(url));
    }

    let failed = visit(&coordinator, &a).unwrap();
    assert_eq!(failed.state, UrlState::Failed);
    assert!(failed.error_message.unwrap().contains("404"));
    assert_eq!(visit(&coordinator, &b).unwrap().state, UrlState::Done);
    assert_eq!(visit(&coordinator, &c).unwrap().state, UrlState::Done);
}

#[tokio::test]
async fn test_unsupported_language_dropped_and_short_fragment_defaults() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/misc",
        r#"
            <p class="proverb">Chi va piano va sano e va lontano.</p>
            <p class="proverb">Carpe diem</p>
        "#,
    )
    .await;

    let url = format!("{}/misc", server.uri());
    let coordinator = CoordinatorBuilder::new(create_test_config(&[url.clone()], "", ":memory:"))
        .storage(SqliteStorage::new_in_memory().unwrap())
        .discoverer(Arc::new(NoopDiscoverer))
        .detector(Arc::new(FixedDetector("it")))
        .build()
        .unwrap();

    let report = coordinator.run_pass().await;

    assert_eq!(report.fragments_seen, 2);
    assert_eq!(report.unsupported_fragments, 1);
    assert_eq!(report.stored_in(Language::English), 1);
    assert_eq!(report.total_stored(), 1);

    let english = proverbs(&coordinator, Language::English);
    assert_eq!(english.len(), 1);
    assert_eq!(english[0].text, "Carpe diem");
    assert!(proverbs(&coordinator, Language::Unknown).is_empty());

    let storage = coordinator.storage();
    let partitions = storage.lock().unwrap().list_partitions().unwrap();
    assert_eq!(partitions, vec![Language::English]);

    assert_eq!(visit(&coordinator, &url).unwrap().state, UrlState::Done);
}

#[tokio::test]
async fn test_links_followed_on_next_pass() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/index",
        r#"
            <p class="proverb">Practice makes perfect.</p>
            <a href="/fr/proverbes">Proverbes</a>
            <a href="/index">Home (proverbs)</a>
            <a href="/contact">Contact</a>
        "#,
    )
    .await;
    mount_page(
        &server,
        "/fr/proverbes",
        r#"<p class="proverb">Petit à petit, l'oiseau fait son nid.</p>"#,
    )
    .await;

    let seed = format!("{}/index", server.uri());
    let coordinator = CoordinatorBuilder::new(create_test_config(&[seed], "", ":memory:"))
        .storage(SqliteStorage::new_in_memory().unwrap())
        .discoverer(Arc::new(NoopDiscoverer))
        .detector(Arc::new(FixedDetector("en")))
        .build()
        .unwrap();

    let first = coordinator.run_pass().await;
    assert_eq!(first.urls_processed, 1);
    assert_eq!(first.links_enqueued, 1);
    assert_eq!(first.stored_in(Language::English), 1);

    let second = coordinator.run_pass().await;
    assert_eq!(second.urls_processed, 1);
    assert_eq!(second.stored_in(Language::French), 1);

    let third = coordinator.run_pass().await;
    assert_eq!(third.urls_processed, 0);
}

#[tokio::test]
async fn test_cache_does_not_outlive_pass() {
    let server = MockServer::start().await;
    let mut seeds = Vec::new();
    for i in 0..12 {
        let page_path = format!("/en/proverbs/{}", i);
        mount_page(
            &server,
            &page_path,
            &format!(r#"<p class="proverb">Proverb number {}.</p>"#, i),
        )
        .await;
        seeds.push(format!("{}{}", server.uri(), page_path));
    }

    let cache = Arc::new(MemoryCache::new());
    let coordinator =
        CoordinatorBuilder::new(create_test_config(&seeds, "batch-size = 4", ":memory:"))
            .storage(SqliteStorage::new_in_memory().unwrap())
            .discoverer(Arc::new(NoopDiscoverer))
            .cache(cache.clone())
            .build()
            .unwrap();

    for pass in 1..=3 {
        let report = coordinator.run_pass().await;
        assert_eq!(report.urls_processed, 4);
        assert_eq!(coordinator.frontier().visited_len(), pass * 4);
        assert!(cache.is_empty(), "cache held entries after pass {}", pass);
    }
}

#[tokio::test]
async fn test_follow_links_disabled() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/en/index",
        r#"<p class="proverb">Practice makes perfect.</p><a href="/fr/proverbes">Proverbes</a>"#,
    )
    .await;

    let seed = format!("{}/en/index", server.uri());
    let coordinator = coordinator(create_test_config(
        &[seed],
        "follow-links = false",
        ":memory:",
    ));

    let report = coordinator.run_pass().await;
    assert_eq!(report.links_enqueued, 0);
    assert_eq!(coordinator.frontier().pending_len(), 0);
}

#[tokio::test]
async fn test_visited_set_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/en/proverbs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<p class="proverb">Time is money.</p>"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("proverbs.db");
    let db_path = db_path.to_str().unwrap().replace('\\', "/");
    let seed = format!("{}/en/proverbs", server.uri());

    {
        let config = create_test_config(&[seed.clone()], "", &db_path);
        let coordinator = CoordinatorBuilder::new(config)
            .discoverer(Arc::new(NoopDiscoverer))
            .build()
            .unwrap();
        let report = coordinator.run_pass().await;
        assert_eq!(report.stored_in(Language::English), 1);
    }

    let config = create_test_config(&[seed.clone()], "", &db_path);
    let coordinator = CoordinatorBuilder::new(config)
        .discoverer(Arc::new(NoopDiscoverer))
        .build()
        .unwrap();

    assert!(coordinator.frontier().is_visited(&seed));
    assert_eq!(coordinator.frontier().pending_len(), 0);

    let report = coordinator.run_pass().await;
    assert_eq!(report.urls_processed, 0);
    assert_eq!(proverbs(&coordinator, Language::English).len(), 1);
}

#[tokio::test]
async fn test_bounded_retry_of_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/en/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/en/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let flaky = format!("{}/en/flaky", server.uri());
    let gone = format!("{}/en/gone", server.uri());
    let coordinator = coordinator(create_test_config(
        &[flaky.clone(), gone.clone()],
        "retry-failed = true\nmax-attempts = 2",
        ":memory:",
    ));

    let first = coordinator.run_pass().await;
    assert_eq!(first.urls_failed, 2);
    assert_eq!(first.urls_released, 1);
    assert!(!coordinator.frontier().is_visited(&flaky));
    assert!(coordinator.frontier().is_visited(&gone));
    assert_eq!(coordinator.frontier().attempts(&flaky), 1);

    let second = coordinator.run_pass().await;
    assert_eq!(second.urls_processed, 1);
    assert_eq!(second.urls_released, 0);
    assert!(coordinator.frontier().is_visited(&flaky));

    let record = visit(&coordinator, &flaky).unwrap();
    assert_eq!(record.state, UrlState::Failed);
    assert_eq!(record.attempts, 2);

    let third = coordinator.run_pass().await;
    assert_eq!(third.urls_processed, 0);
}

/// Storage wrapper whose inserts into one partition always fail
struct FailingStorage {
    inner: SqliteStorage,
    broken: Language,
}

impl Storage for FailingStorage {
    fn mark_visited(&mut self, visit: &VisitRecord) -> StorageResult<()> {
        self.inner.mark_visited(visit)
    }

    fn is_visited(&self, url: &str) -> StorageResult<bool> {
        self.inner.is_visited(url)
    }

    fn load_visited(&self) -> StorageResult<Vec<String>> {
        self.inner.load_visited()
    }

    fn get_visit(&self, url: &str) -> StorageResult<Option<VisitRecord>> {
        self.inner.get_visit(url)
    }

    fn ensure_partition(&mut self, language: Language) -> StorageResult<()> {
        self.inner.ensure_partition(language)
    }

    fn insert_proverb(&mut self, proverb: &NewProverb) -> StorageResult<String> {
        if proverb.language == self.broken {
            return Err(StorageError::Database("disk full".to_string()));
        }
        self.inner.insert_proverb(proverb)
    }

    fn get_proverbs(&self, language: Language) -> StorageResult<Vec<ProverbRecord>> {
        self.inner.get_proverbs(language)
    }

    fn list_partitions(&self) -> StorageResult<Vec<Language>> {
        self.inner.list_partitions()
    }

    fn count_proverbs(&self, language: Language) -> StorageResult<u64> {
        self.inner.count_proverbs(language)
    }

    fn count_visited_by_state(&self, state: UrlState) -> StorageResult<u64> {
        self.inner.count_visited_by_state(state)
    }

    fn count_visited(&self) -> StorageResult<u64> {
        self.inner.count_visited()
    }
}

#[tokio::test]
async fn test_store_failure_is_isolated() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/de/sprichwoerter",
        r#"<p class="proverb">Übung macht den Meister.</p>"#,
    )
    .await;
    mount_page(
        &server,
        "/en/proverbs",
        r#"<p class="proverb">Look before you leap.</p>"#,
    )
    .await;

    let german = format!("{}/de/sprichwoerter", server.uri());
    let english = format!("{}/en/proverbs", server.uri());
    let coordinator = CoordinatorBuilder::new(create_test_config(
        &[german.clone(), english.clone()],
        "",
        ":memory:",
    ))
    .storage(FailingStorage {
        inner: SqliteStorage::new_in_memory().unwrap(),
        broken: Language::German,
    })
    .discoverer(Arc::new(NoopDiscoverer))
    .build()
    .unwrap();

    let report = coordinator.run_pass().await;

    assert_eq!(report.urls_processed, 2);
    assert_eq!(report.urls_failed, 1);
    assert_eq!(report.store_failures, 1);
    assert_eq!(report.stored_in(Language::English), 1);

    let failed = visit(&coordinator, &german).unwrap();
    assert_eq!(failed.state, UrlState::Failed);
    assert!(failed.error_message.unwrap().contains("disk full"));
    assert_eq!(visit(&coordinator, &english).unwrap().state, UrlState::Done);
}

struct ShellRenderer;

#[async_trait]
impl Renderer for ShellRenderer {
    async fn render(&self, _url: &Url) -> Result<String, RenderError> {
        Ok(r#"<div id="app"><p class="proverb">Better late than never.</p></div>"#.to_string())
    }
}

#[tokio::test]
async fn test_render_fallback_for_script_pages() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/en/app",
        r#"<div id="app"></div><script src="/bundle.js"></script>"#,
    )
    .await;

    let url = format!("{}/en/app", server.uri());
    let coordinator = CoordinatorBuilder::new(create_test_config(&[url], "", ":memory:"))
        .storage(SqliteStorage::new_in_memory().unwrap())
        .discoverer(Arc::new(NoopDiscoverer))
        .renderer(Arc::new(ShellRenderer))
        .build()
        .unwrap();

    let report = coordinator.run_pass().await;

    assert_eq!(report.stored_in(Language::English), 1);
    assert_eq!(
        proverbs(&coordinator, Language::English)[0].text,
        "Better late than never."
    );
}

#[tokio::test]
async fn test_search_discovery_feeds_frontier() {
    let search = MockServer::start().await;
    let site = MockServer::start().await;

    let target = format!("{}/es/proverbios", site.uri());
    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", "spanish proverbs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<a href="{}">Refranes</a><a href="/next?proverbs=2">Next</a>"#,
            target
        )))
        .mount(&search)
        .await;
    mount_page(
        &site,
        "/es/proverbios",
        r#"<p class="proverb">A quien madruga, Dios le ayuda.</p>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/seed"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&site)
        .await;

    let mut config = create_test_config(&[format!("{}/seed", site.uri())], "", ":memory:");
    config.discovery.enabled = true;
    config.discovery.search_url = format!("{}/html/?q={{query}}", search.uri());
    config.discovery.queries = vec!["spanish proverbs".to_string()];

    let coordinator = CoordinatorBuilder::new(config)
        .storage(SqliteStorage::new_in_memory().unwrap())
        .build()
        .unwrap();

    let report = coordinator.run_pass().await;

    assert_eq!(report.discovered, 1);
    assert_eq!(report.urls_processed, 2);
    assert_eq!(report.stored_in(Language::Spanish), 1);
    assert!(coordinator.frontier().is_visited(&target));
}
