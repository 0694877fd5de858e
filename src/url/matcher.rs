use super::domain::split_port;

/// Checks if a domain matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches:
///    - "example.com" (the bare domain)
///    - "blog.example.com" (single subdomain)
///    - "api.v2.example.com" (nested subdomains)
///
/// # Examples
///
/// ```
/// use gleaner::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "other.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Checks if a crawl domain (host with optional port) matches a pattern
///
/// A pattern without a port matches the host on any port. A pattern with a
/// port only matches that exact port.
pub fn matches_domain(pattern: &str, domain: &str) -> bool {
    let (pattern_host, pattern_port) = split_port(pattern);
    let (host, port) = split_port(domain);

    if pattern_port.is_some() && pattern_port != port {
        return false;
    }

    matches_wildcard(pattern_host, host)
}

/// Checks if a URL path matches a path pattern
///
/// A pattern ending in `*` matches every path starting with the text before
/// it; any other pattern must match exactly.
///
/// ```
/// use gleaner::url::matches_path;
///
/// assert!(matches_path("/product/*", "/product/hoodie/"));
/// assert!(!matches_path("/product/*", "/ecommerce/"));
/// assert!(matches_path("/about", "/about"));
/// ```
pub fn matches_path(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => path == pattern,
    }
}
