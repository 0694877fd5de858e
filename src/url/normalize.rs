use crate::UrlError;
use url::Url;

/// Normalizes a discovered link into a comparable crawl key
///
/// # Normalization Steps
///
/// 1. Reject empty links and pure fragments (`#anchor`)
/// 2. Resolve the link against `base` to an absolute URL; reject if malformed
/// 3. Reject anything that is not http or https (`javascript:`, `mailto:`, ...)
/// 4. Remove the fragment (everything after #)
///
/// Scheme, host, path, and query are kept as the URL parser produced them.
/// Query parameters are not reordered and trailing slashes are not touched, so
/// `/page` and `/page/` stay distinct keys.
///
/// # Arguments
///
/// * `base` - The URL of the page the link was found on
/// * `raw` - The link as written in the page
///
/// # Returns
///
/// * `Ok(Url)` - Normalized absolute URL
/// * `Err(UrlError)` - The link is not navigable
///
/// # Examples
///
/// ```
/// use url::Url;
/// use gleaner::url::normalize_link;
///
/// let base = Url::parse("https://example.com/shop/").unwrap();
/// let url = normalize_link(&base, "item?id=2#reviews").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/shop/item?id=2");
///
/// assert!(normalize_link(&base, "javascript:void(0)").is_err());
/// ```
pub fn normalize_link(base: &Url, raw: &str) -> Result<Url, UrlError> {
    let link = raw.trim();

    if link.is_empty() {
        return Err(UrlError::Empty);
    }

    if link.starts_with('#') {
        return Err(UrlError::FragmentOnly(link.to_string()));
    }

    let mut url = base
        .join(link)
        .map_err(|e| UrlError::Parse(format!("{}: {}", link, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    Ok(url)
}

/// Normalizes a start URL, which has no page to resolve against
pub fn normalize_seed(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    normalize_link(&url, url.as_str())
}
