//! Page extractors
//!
//! An extractor turns a fetched page into at most one structured record and
//! a list of follow-up links. Link resolution, deduplication and scoping are
//! left to the crawler; extractors return hrefs exactly as they appear.
//!
//! - `ProductExtractor`: WooCommerce listing, pagination and detail pages
//! - `LinkExtractor`: generic link discovery with page titles

mod links;
mod products;

pub use links::{LinkExtractor, PageInfo};
pub use products::{clean_price, Product, ProductExtractor};

use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

/// Errors raised while extracting a page
///
/// An extraction error is fatal for the page that raised it and nothing else.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid CSS selector {selector}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("Malformed page {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// What an extractor found on one page
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<R> {
    /// Structured record, if the page carried one
    pub record: Option<R>,

    /// Raw hrefs to follow, unresolved
    pub links: Vec<String>,
}

impl<R> Extraction<R> {
    pub fn new(record: Option<R>, links: Vec<String>) -> Self {
        Self { record, links }
    }

    pub fn empty() -> Self {
        Self {
            record: None,
            links: Vec::new(),
        }
    }
}

/// Turns page content into records and follow-up links
///
/// Implementations must be cheap to share between workers and must not
/// panic on arbitrary input.
pub trait Extractor: Send + Sync {
    type Record: Send + 'static;

    fn extract(&self, url: &Url, body: &[u8]) -> Result<Extraction<Self::Record>, ExtractError>;
}

/// Parses a selector once at extractor construction
pub(crate) fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}

/// Parses a body as HTML, replacing invalid UTF-8 sequences
pub(crate) fn parse_body(body: &[u8]) -> Html {
    Html::parse_document(&String::from_utf8_lossy(body))
}

/// Returns the trimmed text of the first match, if non-empty
pub(crate) fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Returns an attribute of the first match, if non-empty
pub(crate) fn first_attr(document: &Html, selector: &Selector, attr: &str) -> Option<String> {
    document
        .select(selector)
        .find_map(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
