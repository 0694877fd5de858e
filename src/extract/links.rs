use super::{first_text, parse_body, selector, ExtractError, Extraction, Extractor};
use scraper::Selector;
use serde::Serialize;
use url::Url;

/// A visited page and its title
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub url: String,
    pub title: Option<String>,
}

/// Generic link-discovery extractor
///
/// Every `<a href>` is followed except anchors carrying the `download`
/// attribute. Each page yields one `PageInfo` record.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    anchor: Selector,
    title: Selector,
}

impl LinkExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            anchor: selector("a[href]")?,
            title: selector("title")?,
        })
    }
}

impl Extractor for LinkExtractor {
    type Record = PageInfo;

    fn extract(&self, url: &Url, body: &[u8]) -> Result<Extraction<PageInfo>, ExtractError> {
        let document = parse_body(body);

        let links = document
            .select(&self.anchor)
            .filter(|element| element.value().attr("download").is_none())
            .filter_map(|element| element.value().attr("href"))
            .map(str::to_string)
            .collect();

        let record = PageInfo {
            url: url.to_string(),
            title: first_text(&document, &self.title),
        };

        Ok(Extraction::new(Some(record), links))
    }
}
