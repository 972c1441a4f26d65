//! Configuration module for Paremia
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use paremia::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("paremia.toml")).unwrap();
//! println!("Polling every {}s", config.crawler.poll_interval_seconds);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DiscoveryConfig, FetcherConfig, LanguagesConfig, NormalizationConfig,
    StorageConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
