//! Output module for reporting on crawl results
//!
//! This module handles:
//! - Loading visited-URL and partition statistics from storage
//! - Rendering them for the `--stats` command

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, CrawlStatistics};
