//! Shared fixtures for integration tests

use async_trait::async_trait;
use gleaner::config::{
    BackoffKind, Config, CrawlerConfig, LimitRule, LimitsConfig, OutputConfig, RetryConfig,
};
use gleaner::crawler::{FetchResponse, Transport, TransportError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Creates a fast test configuration scoped to `domains`
pub fn create_test_config(domains: &[&str], max_pages: u32, max_depth: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            allowed_domains: domains.iter().map(|d| d.to_string()).collect(),
            start_urls: Vec::new(),
            max_depth,
            max_pages,
            workers: 4,
            request_timeout_secs: 5,
        },
        limits: LimitsConfig {
            default_rule: LimitRule {
                parallelism: 4,
                delay_ms: 0,
                jitter_ms: 0,
            },
            domains: Vec::new(),
            paths: Vec::new(),
        },
        retry: RetryConfig {
            max_attempts: 3,
            backoff: BackoffKind::Fixed,
            base_delay_ms: 10,
            max_delay_ms: 10,
        },
        output: OutputConfig::default(),
        ..Config::default()
    }
}

/// Builds an HTML page linking to `links`
pub fn page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">link</a>\n", href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, anchors
    )
}

/// Canned behavior for one URL
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Always answers with this status and body
    Page { status: u16, body: String },

    /// Answers `status` for the first `failures` calls, then 200 with `body`
    Flaky {
        failures: u32,
        status: u16,
        body: String,
    },

    /// Redirect already followed: 200 with `body`, served from `location`
    Redirected { location: String, body: String },

    /// Always fails at the network level
    ConnectError,
}

/// In-memory transport that records every call
///
/// Unknown URLs answer 404.
#[derive(Clone, Default)]
pub struct MockTransport {
    responses: Arc<HashMap<String, MockResponse>>,
    calls: Arc<Mutex<HashMap<String, u32>>>,
    latency: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new(responses: Vec<(&str, MockResponse)>) -> Self {
        Self {
            responses: Arc::new(
                responses
                    .into_iter()
                    .map(|(url, response)| (url.to_string(), response))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Serves HTML pages with status 200
    pub fn with_pages(pages: Vec<(&str, String)>) -> Self {
        Self::new(
            pages
                .into_iter()
                .map(|(url, body)| (url, MockResponse::Page { status: 200, body }))
                .collect(),
        )
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns how many times `url` was fetched
    pub fn calls(&self, url: &str) -> u32 {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }

    /// Returns the total number of fetches
    pub fn total_calls(&self) -> u32 {
        self.calls.lock().values().sum()
    }

    /// Returns the highest number of concurrent fetches observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(
        &self,
        url: &Url,
        _headers: &BTreeMap<String, String>,
    ) -> Result<FetchResponse, TransportError> {
        let call = {
            let mut calls = self.calls.lock();
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.responses.get(url.as_str()) {
            Some(MockResponse::Page { status, body }) => Ok(FetchResponse {
                status: *status,
                final_url: url.clone(),
                body: body.clone().into_bytes(),
            }),
            Some(MockResponse::Redirected { location, body }) => Ok(FetchResponse {
                status: 200,
                final_url: Url::parse(location)
                    .map_err(|e| TransportError::Request(e.to_string()))?,
                body: body.clone().into_bytes(),
            }),
            Some(MockResponse::Flaky {
                failures,
                status,
                body,
            }) => {
                if call <= *failures {
                    Ok(FetchResponse {
                        status: *status,
                        final_url: url.clone(),
                        body: Vec::new(),
                    })
                } else {
                    Ok(FetchResponse {
                        status: 200,
                        final_url: url.clone(),
                        body: body.clone().into_bytes(),
                    })
                }
            }
            Some(MockResponse::ConnectError) => {
                Err(TransportError::Connect("connection refused".to_string()))
            }
            None => Ok(FetchResponse {
                status: 404,
                final_url: url.clone(),
                body: Vec::new(),
            }),
        }
    }
}
