//! URL handling module for Gleaner
//!
//! This module provides link normalization, domain extraction, wildcard
//! matching, and the allowed-domain list that bounds a crawl.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::extract_domain;
pub(crate) use domain::split_port;
pub use matcher::{matches_domain, matches_path, matches_wildcard};
pub use normalize::{normalize_link, normalize_seed};

use url::Url;

/// The set of domains a crawl may fetch from
///
/// An empty list allows every domain.
#[derive(Debug, Clone, Default)]
pub struct DomainAllowList {
    patterns: Vec<String>,
}

impl DomainAllowList {
    /// Creates an allow-list from domain patterns
    ///
    /// Patterns are lowercased; each may be an exact host, a `*.domain`
    /// wildcard, and may carry a `:port` suffix.
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns: patterns.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Returns true if the domain (host with optional port) may be fetched
    pub fn allows_domain(&self, domain: &str) -> bool {
        self.patterns.is_empty()
            || self
                .patterns
                .iter()
                .any(|pattern| matches_domain(pattern, domain))
    }

    /// Returns true if the URL's domain may be fetched
    pub fn allows(&self, url: &Url) -> bool {
        match extract_domain(url) {
            Some(domain) => self.allows_domain(&domain),
            None => false,
        }
    }

    /// Returns true if no restriction is configured
    pub fn is_unrestricted(&self) -> bool {
        self.patterns.is_empty()
    }
}
