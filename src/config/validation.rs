use crate::config::types::{
    Config, CrawlerConfig, LimitRule, LimitsConfig, ProxyConfig, RetryConfig,
};
use crate::url::{normalize_seed, split_port, DomainAllowList};
use crate::{ConfigError, UrlError};
use reqwest::header::{HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::net::Ipv6Addr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_limits(&config.limits)?;
    validate_retry(&config.retry)?;
    validate_headers(&config.headers)?;
    parse_proxy_urls(&config.proxy)?;

    if config.output.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates scope and budget settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 {
        return Err(ConfigError::Validation(format!(
            "workers must be >= 1, got {}",
            config.workers
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    for pattern in &config.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    let allow_list = DomainAllowList::new(config.allowed_domains.clone());
    validate_start_urls(&config.start_urls, &allow_list)?;

    Ok(())
}

/// Validates start URLs against the allow-list
///
/// Every start URL must normalize the same way the controller seeds it, and
/// fall inside the allowed domains.
pub fn validate_start_urls(urls: &[String], allow_list: &DomainAllowList) -> Result<(), ConfigError> {
    for raw in urls {
        let url = normalize_seed(raw).map_err(|e| match e {
            UrlError::InvalidScheme(_) => {
                ConfigError::InvalidUrl(format!("Start URL '{}' must use http or https", raw))
            }
            other => ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", raw, other)),
        })?;

        if !allow_list.allows(&url) {
            return Err(ConfigError::Validation(format!(
                "Start URL '{}' is outside the allowed domains",
                raw
            )));
        }
    }

    Ok(())
}

fn validate_limits(limits: &LimitsConfig) -> Result<(), ConfigError> {
    validate_rule("default", &limits.default_rule)?;

    for entry in &limits.domains {
        validate_domain_pattern(&entry.domain)?;
        validate_rule(&entry.domain, &entry.rule)?;
    }

    for entry in &limits.paths {
        if !entry.path.starts_with('/') {
            return Err(ConfigError::InvalidPattern(format!(
                "Path pattern '{}' must start with '/'",
                entry.path
            )));
        }
        validate_rule(&entry.path, &entry.rule)?;
    }

    Ok(())
}

/// Parses the proxy list
///
/// Each proxy must be an absolute http or https URL with a host.
pub fn parse_proxy_urls(proxy: &ProxyConfig) -> Result<Vec<Url>, ConfigError> {
    proxy
        .urls
        .iter()
        .map(|raw| {
            let url = Url::parse(raw.trim())
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", raw, e)))?;
            if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
                return Err(ConfigError::InvalidUrl(format!(
                    "Proxy '{}' must be an http or https URL",
                    raw
                )));
            }
            Ok(url)
        })
        .collect()
}

fn validate_rule(scope: &str, rule: &LimitRule) -> Result<(), ConfigError> {
    if rule.parallelism < 1 {
        return Err(ConfigError::Validation(format!(
            "parallelism for '{}' must be >= 1, got {}",
            scope, rule.parallelism
        )));
    }
    Ok(())
}

fn validate_retry(retry: &RetryConfig) -> Result<(), ConfigError> {
    if retry.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            retry.max_attempts
        )));
    }

    if retry.base_delay_ms > retry.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "base_delay_ms ({}) cannot exceed max_delay_ms ({})",
            retry.base_delay_ms, retry.max_delay_ms
        )));
    }

    Ok(())
}

fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    for (name, value) in headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid header name '{}'",
                name
            )));
        }
        if HeaderValue::from_str(value).is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid value for header '{}'",
                name
            )));
        }
    }
    Ok(())
}

/// Validates a domain pattern (supports wildcards and an optional port)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    let (host, port) = split_port(domain);
    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return Err(ConfigError::InvalidPattern(format!(
                "Domain '{}' has an invalid port",
                pattern
            )));
        }
    }

    validate_host_string(host)
}

/// Validates a host string (without wildcard prefix or port)
///
/// Bracketed IPv6 literals are accepted, as URLs render them.
fn validate_host_string(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if let Some(literal) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        return literal.parse::<Ipv6Addr>().map(|_| ()).map_err(|_| {
            ConfigError::InvalidPattern(format!("Domain '{}' is not a valid IPv6 literal", host))
        });
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            host
        )));
    }

    Ok(())
}
