//! Network transport
//!
//! The crawl engine never talks to the network directly. It calls a
//! `Transport`, which returns the status code, final URL and body of one GET
//! request. `HttpTransport` is the reqwest-backed implementation used by the
//! CLI.

use crate::config::{parse_proxy_urls, Config};
use crate::url::DomainAllowList;
use crate::GleanError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirects followed for one fetch
const MAX_REDIRECTS: usize = 10;

/// Errors raised by a transport before a status code is available
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid request: {0}")]
    Request(String),
}

impl TransportError {
    /// Returns true for network blips worth retrying
    ///
    /// A request that could not be built, a redirect loop or an undecodable
    /// body fails the same way every time.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Request(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_builder() || err.is_redirect() || err.is_decode() {
            Self::Request(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Outcome of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,

    /// URL the body was served from, after redirects
    pub final_url: Url,

    pub body: Vec<u8>,
}

/// Performs one fetch
///
/// Any status code is a successful fetch from the transport's point of
/// view; classification happens in the crawler.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(
        &self,
        url: &Url,
        headers: &BTreeMap<String, String>,
    ) -> Result<FetchResponse, TransportError>;
}

/// Cycles through a fixed set of items in round-robin order
#[derive(Debug)]
pub struct RoundRobin<T> {
    items: Vec<T>,
    next: AtomicUsize,
}

impl<T> RoundRobin<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            next: AtomicUsize::new(0),
        }
    }

    /// Returns the next item, or None if there are none
    pub fn next_item(&self) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.items.len();
        self.items.get(index)
    }
}

/// Builds the redirect policy for a crawl
///
/// Redirects are followed only to allowed domains. A redirect leaving the
/// allow-list stops there and the 3xx response itself is returned. Loops and
/// long chains are errors.
fn redirect_policy(allow_list: DomainAllowList) -> Policy {
    Policy::custom(move |attempt| {
        let too_many = attempt.previous().len() >= MAX_REDIRECTS;
        let looped = attempt.previous().contains(attempt.url());
        let allowed = allow_list.allows(attempt.url());

        if too_many {
            attempt.error("too many redirects")
        } else if looped {
            attempt.error("redirect loop")
        } else if allowed {
            attempt.follow()
        } else {
            tracing::debug!("Not following redirect to {}", attempt.url());
            attempt.stop()
        }
    })
}

/// Builds an HTTP client for crawling
///
/// # Arguments
///
/// * `timeout` - Whole-request timeout, connect included
/// * `allow_list` - Domains redirects may lead to
/// * `proxy` - Proxy every request goes through, if any
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use gleaner::crawler::build_http_client;
/// use gleaner::url::DomainAllowList;
/// use std::time::Duration;
///
/// let client = build_http_client(
///     Duration::from_secs(30),
///     DomainAllowList::new(vec!["example.com".to_string()]),
///     None,
/// )
/// .unwrap();
/// ```
pub fn build_http_client(
    timeout: Duration,
    allow_list: DomainAllowList,
    proxy: Option<Url>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .gzip(true)
        .brotli(true)
        .redirect(redirect_policy(allow_list));

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// Converts a header table into a reqwest header map
pub fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Request(format!("header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::Request(format!("header value for {}: {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// reqwest-backed transport
///
/// Redirects stay inside the crawl's allowed domains; the body is read in
/// full and decompressed. With proxies configured there is one client per
/// proxy and each fetch takes the next one in turn.
#[derive(Debug)]
pub struct HttpTransport {
    clients: RoundRobin<Client>,
    proxy_count: usize,
}

impl HttpTransport {
    /// Builds a transport from the run configuration
    ///
    /// Uses the request timeout, the allowed domains for redirects and the
    /// proxy list.
    pub fn from_config(config: &Config) -> Result<Self, GleanError> {
        let proxies = parse_proxy_urls(&config.proxy)?;
        let allow_list = DomainAllowList::new(config.crawler.allowed_domains.clone());
        let timeout = config.crawler.request_timeout();
        let proxy_count = proxies.len();

        let clients = if proxies.is_empty() {
            vec![build_http_client(timeout, allow_list, None)]
        } else {
            proxies
                .into_iter()
                .map(|proxy| build_http_client(timeout, allow_list.clone(), Some(proxy)))
                .collect()
        };
        let clients = clients
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .map_err(TransportError::from)?;

        Ok(Self {
            clients: RoundRobin::new(clients),
            proxy_count,
        })
    }

    /// Returns the number of proxies rotated through, zero for direct
    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        url: &Url,
        headers: &BTreeMap<String, String>,
    ) -> Result<FetchResponse, TransportError> {
        let client = self
            .clients
            .next_item()
            .ok_or_else(|| TransportError::Request("no HTTP client configured".to_string()))?;

        let response = client
            .get(url.clone())
            .headers(header_map(headers)?)
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let body = response.bytes().await?.to_vec();

        if final_url != *url {
            tracing::debug!("{} redirected to {}", url, final_url);
        }
        tracing::trace!("Fetched {} ({} bytes, status {})", final_url, body.len(), status);

        Ok(FetchResponse {
            status,
            final_url,
            body,
        })
    }
}
