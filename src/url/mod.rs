//! URL handling module for Paremia
//!
//! This module provides URL normalization (the frontier's identity rule), host
//! extraction and wildcard domain matching.

mod domain;
mod matcher;
mod normalize;

pub use domain::{domain_labels, extract_domain};
pub use matcher::{matches_any, matches_wildcard};
pub use normalize::{normalize_url, NormalizeOptions};
