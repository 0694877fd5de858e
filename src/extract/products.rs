use super::{first_attr, first_text, parse_body, selector, ExtractError, Extraction, Extractor};
use chrono::{DateTime, Utc};
use scraper::Selector;
use serde::Serialize;
use url::Url;

/// A product scraped from a detail page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub url: String,
    pub name: String,
    pub price: String,
    pub description: String,
    pub sku: String,
    pub category: String,
    pub image_url: String,
    pub in_stock: bool,
    pub scraped_at: DateTime<Utc>,
}

/// Extractor for WooCommerce storefronts
///
/// Listing pages contribute links to their product detail pages and to the
/// next listing page. Detail pages contribute one `Product`.
#[derive(Debug, Clone)]
pub struct ProductExtractor {
    listing_link: Selector,
    next_page: Selector,
    detail: Selector,
    title: Selector,
    price: Selector,
    description: Selector,
    sku: Selector,
    category: Selector,
    image: Selector,
    stock: Selector,
}

impl ProductExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            listing_link: selector("li.product a.woocommerce-LoopProduct-link[href]")?,
            next_page: selector("a.next.page-numbers[href]")?,
            detail: selector("div.product")?,
            title: selector("h1.product_title")?,
            price: selector("p.price span.woocommerce-Price-amount")?,
            description: selector("div.woocommerce-product-details__short-description")?,
            sku: selector("span.sku")?,
            category: selector("span.posted_in a")?,
            image: selector("img.wp-post-image")?,
            stock: selector("p.stock")?,
        })
    }

    fn links(&self, document: &scraper::Html) -> Vec<String> {
        document
            .select(&self.listing_link)
            .chain(document.select(&self.next_page))
            .filter_map(|element| element.value().attr("href"))
            .map(|href| href.trim().to_string())
            .collect()
    }

    fn product(&self, url: &Url, document: &scraper::Html) -> Result<Option<Product>, ExtractError> {
        if document.select(&self.detail).next().is_none() {
            return Ok(None);
        }

        let name = first_text(document, &self.title).ok_or_else(|| ExtractError::Malformed {
            url: url.to_string(),
            reason: "product block without a title".to_string(),
        })?;

        let in_stock = !document
            .select(&self.stock)
            .any(|element| element.value().classes().any(|class| class == "out-of-stock"));

        Ok(Some(Product {
            url: url.to_string(),
            name,
            price: first_text(document, &self.price)
                .map(|price| clean_price(&price))
                .unwrap_or_default(),
            description: first_text(document, &self.description).unwrap_or_default(),
            sku: first_text(document, &self.sku).unwrap_or_default(),
            category: first_text(document, &self.category).unwrap_or_default(),
            image_url: first_attr(document, &self.image, "src").unwrap_or_default(),
            in_stock,
            scraped_at: Utc::now(),
        }))
    }
}

impl Extractor for ProductExtractor {
    type Record = Product;

    fn extract(&self, url: &Url, body: &[u8]) -> Result<Extraction<Product>, ExtractError> {
        let document = parse_body(body);
        let record = self.product(url, &document)?;
        Ok(Extraction::new(record, self.links(&document)))
    }
}

/// Normalizes the whitespace of a scraped price
///
/// Newlines become spaces, tabs are removed and runs of spaces collapse to one.
pub fn clean_price(raw: &str) -> String {
    raw.replace('\n', " ")
        .replace('\t', "")
        .split(' ')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
