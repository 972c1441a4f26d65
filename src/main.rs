//! Paremia main entry point
//!
//! This is the command-line interface for the Paremia proverb harvester.

use clap::Parser;
use paremia::config::{load_config_with_hash, Config};
use paremia::crawler::CoordinatorBuilder;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Paremia: a perpetual proverb harvester
///
/// Paremia discovers pages likely to contain proverbs, extracts candidate
/// fragments, classifies them by language and stores them in one partition
/// per language. URLs are never processed twice.
#[derive(Parser, Debug)]
#[command(name = "paremia")]
#[command(version = "1.0.0")]
#[command(about = "A perpetual proverb harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single pass and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    once: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["once", "stats"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["once", "dry_run"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, cli.once).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("paremia=info,warn"),
            1 => EnvFilter::new("paremia=debug,info"),
            2 => EnvFilter::new("paremia=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Paremia Dry Run ===\n");

    println!("Crawler:");
    println!("  Poll interval: {}s", config.crawler.poll_interval_seconds);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Worker pool size: {}", config.crawler.worker_pool_size);
    println!("  Follow links: {}", config.crawler.follow_links);
    if config.crawler.retry_failed {
        println!(
            "  Retry failed URLs: up to {} attempts",
            config.crawler.max_attempts
        );
    } else {
        println!("  Retry failed URLs: no");
    }

    println!("\nFetcher:");
    println!(
        "  Request timeout: {}s",
        config.fetcher.request_timeout_seconds
    );
    println!("  Render timeout: {}s", config.fetcher.render_timeout_seconds);
    println!("  Render domains: {}", config.fetcher.render_domains.len());
    if !cfg!(feature = "chromium") {
        println!("  (renderer not compiled in; static fetches only)");
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nLanguages: {}", config.languages.supported.join(", "));
    println!("Storage: {}", config.storage.endpoint);

    if config.discovery.enabled {
        println!("\nDiscovery queries ({}):", config.discovery.queries.len());
        for query in &config.discovery.queries {
            println!("  - {}", query);
        }
    } else {
        println!("\nDiscovery: disabled");
    }

    println!("\nSeed URLs ({}):", config.crawler.seed_urls.len());
    for seed in &config.crawler.seed_urls {
        println!("  * {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use paremia::output::{load_statistics, print_statistics};
    use paremia::storage::SqliteStorage;
    use std::path::Path;

    println!("Database: {}\n", config.storage.endpoint);

    let storage = SqliteStorage::new(Path::new(&config.storage.endpoint))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, once: bool) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Seeds: {}, languages: {}, storage: {}",
        config.crawler.seed_urls.len(),
        config.languages.supported.join(","),
        config.storage.endpoint
    );

    let builder = CoordinatorBuilder::new(config);

    #[cfg(feature = "chromium")]
    let builder = {
        use paremia::crawler::ChromiumRenderer;
        use std::sync::Arc;

        match ChromiumRenderer::launch().await {
            Ok(renderer) => builder.renderer(Arc::new(renderer)),
            Err(e) => {
                tracing::error!("Failed to start renderer: {}", e);
                return Err(paremia::ParemiaError::RendererStartup(e.to_string()).into());
            }
        }
    };

    let coordinator = match builder.build() {
        Ok(coordinator) => coordinator,
        Err(e) => {
            tracing::error!("Failed to start crawler: {}", e);
            return Err(e.into());
        }
    };

    if once {
        let report = coordinator.run_pass().await;
        tracing::info!(
            "Single pass finished: {} processed, {} failed, {} stored, {} unsupported fragments",
            report.urls_processed,
            report.urls_failed,
            report.total_stored(),
            report.unsupported_fragments
        );
        return Ok(());
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    coordinator.run_until(shutdown).await;
    tracing::info!("Crawler stopped");
    Ok(())
}
