use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Gleaner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub limits: LimitsConfig,
    pub retry: RetryConfig,
    /// Header set sent with every request
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,
    pub output: OutputConfig,
    pub proxy: ProxyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            limits: LimitsConfig::default(),
            retry: RetryConfig::default(),
            headers: default_headers(),
            output: OutputConfig::default(),
            proxy: ProxyConfig::default(),
        }
    }
}

/// Crawl scope and budget configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Domains that may be fetched (host or host:port, optionally "*.domain")
    pub allowed_domains: Vec<String>,

    /// URLs the crawl starts from
    pub start_urls: Vec<String>,

    /// Maximum link depth from a start URL (start URLs are depth 0)
    pub max_depth: u32,

    /// Maximum number of pages dispatched in one run
    pub max_pages: u32,

    /// Number of concurrent fetch workers
    pub workers: u32,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            start_urls: Vec::new(),
            max_depth: 3,
            max_pages: 100,
            workers: 4,
            request_timeout_secs: 30,
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Per-domain pacing rules
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Rule applied to domains without a specific override
    #[serde(flatten)]
    pub default_rule: LimitRule,

    /// Per-domain overrides; the first matching pattern wins
    #[serde(rename = "domain")]
    pub domains: Vec<DomainLimit>,

    /// Path overrides, paced in their own lane per domain
    #[serde(rename = "path")]
    pub paths: Vec<PathLimit>,
}

impl LimitsConfig {
    /// Returns the rule governing `domain`
    pub fn rule_for(&self, domain: &str) -> LimitRule {
        self.domains
            .iter()
            .find(|entry| crate::url::matches_domain(&entry.domain, domain))
            .map(|entry| entry.rule)
            .unwrap_or(self.default_rule)
    }

    /// Returns the pacing lane for a URL path on `domain` and its rule
    ///
    /// A matching path override gets a lane of its own, keyed by domain and
    /// pattern. Otherwise the lane is the domain itself.
    pub fn lane_for(&self, domain: &str, path: &str) -> (String, LimitRule) {
        match self
            .paths
            .iter()
            .find(|entry| crate::url::matches_path(&entry.path, path))
        {
            Some(entry) => (format!("{}{}", domain, entry.path), entry.rule),
            None => (domain.to_string(), self.rule_for(domain)),
        }
    }
}

/// Concurrency and spacing limits for one domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LimitRule {
    /// Maximum concurrent in-flight fetches
    pub parallelism: u32,

    /// Minimum spacing between dispatch starts (milliseconds)
    pub delay_ms: u64,

    /// Upper bound of the random extra spacing added per dispatch (milliseconds)
    pub jitter_ms: u64,
}

impl Default for LimitRule {
    fn default() -> Self {
        Self {
            parallelism: 2,
            delay_ms: 1000,
            jitter_ms: 0,
        }
    }
}

impl LimitRule {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }
}

/// A limit rule bound to a domain pattern
#[derive(Debug, Clone, Deserialize)]
pub struct DomainLimit {
    /// Domain pattern (e.g., "example.com" or "*.example.com")
    pub domain: String,

    #[serde(flatten)]
    pub rule: LimitRule,
}

/// A limit rule bound to a URL path pattern
///
/// A trailing `*` matches any suffix, so `/product/*` covers every detail page.
#[derive(Debug, Clone, Deserialize)]
pub struct PathLimit {
    pub path: String,

    #[serde(flatten)]
    pub rule: LimitRule,
}

/// Backoff schedule between retry attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Retry configuration for transient failures
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total fetch attempts per task, first try included
    pub max_attempts: u32,

    pub backoff: BackoffKind,

    /// Delay before the first retry (milliseconds)
    pub base_delay_ms: u64,

    /// Cap for exponential backoff (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffKind::Fixed,
            base_delay_ms: 5000,
            max_delay_ms: 60_000,
        }
    }
}

/// Export format for extracted records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the exported file
    pub path: String,

    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "products.json".to_string(),
            format: OutputFormat::Json,
        }
    }
}

/// Proxy rotation
///
/// Requests go through the listed proxies in round-robin order. An empty
/// list means direct connections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub urls: Vec<String>,
}

/// Browser-like headers sent when the config does not override them
///
/// Accept-Encoding is left to the HTTP client so that it can decode the body.
pub fn default_headers() -> BTreeMap<String, String> {
    [
        ("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"),
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Connection", "keep-alive"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Cache-Control", "max-age=0"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}
