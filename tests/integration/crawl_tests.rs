//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end through `HttpTransport`.

use crate::common::{create_test_config, page};
use gleaner::config::{Config, OutputFormat};
use gleaner::crawler::{Controller, DropReason, HttpTransport};
use gleaner::extract::{LinkExtractor, PageInfo, Product, ProductExtractor};
use gleaner::output::exporter_for;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

fn transport(config: &Config) -> HttpTransport {
    HttpTransport::from_config(config).unwrap()
}

/// Returns the mock server's crawl domain (host and port)
fn server_domain(server: &MockServer) -> String {
    let url = url::Url::parse(&server.uri()).unwrap();
    format!("{}:{}", url.host_str().unwrap(), url.port().unwrap())
}

/// Config scoped to the mock server
fn create_server_config(server: &MockServer) -> Config {
    create_test_config(&[server_domain(server).as_str()], 50, 3)
}

fn listing(products: &[&str], next: Option<&str>) -> String {
    let items: String = products
        .iter()
        .map(|slug| {
            format!(
                r#"<li class="product"><a class="woocommerce-LoopProduct-link" href="/ecommerce/product/{}/"><h2>{}</h2></a></li>"#,
                slug, slug
            )
        })
        .collect();
    let next = next
        .map(|href| format!(r#"<a class="next page-numbers" href="{}">→</a>"#, href))
        .unwrap_or_default();
    format!(
        "<html><body><ul class=\"products\">{}</ul>{}</body></html>",
        items, next
    )
}

fn detail(name: &str, price: &str, in_stock: bool) -> String {
    let stock = if in_stock { "in-stock" } else { "out-of-stock" };
    format!(
        r#"<html><body><div class="product">
            <h1 class="product_title">{name}</h1>
            <p class="price"><span class="woocommerce-Price-amount">{price}</span></p>
            <div class="woocommerce-product-details__short-description">About {name}</div>
            <span class="sku">SKU-{name}</span>
            <span class="posted_in"><a href="/c/gear">Gear</a></span>
            <img class="wp-post-image" src="/img/{name}.jpg">
            <p class="stock {stock}">stock</p>
        </div></body></html>"#
    )
}

#[tokio::test]
async fn test_scrape_listing_pagination_and_details() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ecommerce/"))
        .respond_with(html(listing(
            &["hoodie", "jacket"],
            Some("/ecommerce/page/2/"),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ecommerce/page/2/"))
        .respond_with(html(listing(&["tee"], None)))
        .mount(&server)
        .await;
    for (slug, price, in_stock) in [
        ("hoodie", "$69.00", true),
        ("jacket", "$57.00", true),
        ("tee", "$\n\t24.00", false),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/ecommerce/product/{}/", slug)))
            .respond_with(html(detail(slug, price, in_stock)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = create_server_config(&server);
    let controller = Controller::new(
        config.clone(),
        transport(&config),
        ProductExtractor::new().unwrap(),
    )
    .unwrap();
    let start = vec![format!("{}/ecommerce/", server.uri())];
    let result = controller.run(&start).await.unwrap();

    assert!(result.is_complete());
    assert_eq!(result.pages_visited, 5);
    assert!(result.summary.dropped.is_empty());

    let mut products: Vec<Product> = result.records.clone();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["hoodie", "jacket", "tee"]);

    let tee = &products[2];
    assert_eq!(tee.price, "$ 24.00");
    assert!(!tee.in_stock);
    assert_eq!(tee.sku, "SKU-tee");
    assert_eq!(tee.category, "Gear");
    assert_eq!(tee.url, format!("{}/ecommerce/product/tee/", server.uri()));

    // Export the batch as JSON and read it back
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("products.json");
    let written = exporter_for(OutputFormat::Json, &out)
        .export(&result.records)
        .unwrap();
    assert_eq!(written, 3);

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(exported.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_http_503_retried_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(page("recovered", &[])))
        .mount(&server)
        .await;

    let config = create_server_config(&server);
    let controller =
        Controller::new(config.clone(), transport(&config), LinkExtractor::new().unwrap()).unwrap();
    let result = controller.run(&[server.uri()]).await.unwrap();

    assert_eq!(result.summary.fetch_attempts, 3);
    assert_eq!(result.summary.retries_scheduled, 2);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].title.as_deref(), Some("recovered"));
}

#[tokio::test]
async fn test_http_404_is_fatal_and_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(page("home", &["/gone"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_server_config(&server);
    let controller =
        Controller::new(config.clone(), transport(&config), LinkExtractor::new().unwrap()).unwrap();
    let result = controller.run(&[server.uri()]).await.unwrap();

    assert_eq!(result.summary.fatal_failures, 1);
    assert_eq!(result.summary.retries_scheduled, 0);
    let dropped = &result.summary.dropped[0];
    assert_eq!(dropped.reason, DropReason::Fatal);
    assert_eq!(dropped.error, "HTTP 404");
    assert_eq!(dropped.url, format!("{}/gone", server.uri()));
}

#[tokio::test]
async fn test_configured_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "GleanerTest/1.0"))
        .respond_with(html(page("home", &[])))
        .mount(&server)
        .await;

    let mut config = create_server_config(&server);
    config
        .headers
        .insert("User-Agent".to_string(), "GleanerTest/1.0".to_string());

    let controller =
        Controller::new(config.clone(), transport(&config), LinkExtractor::new().unwrap()).unwrap();
    let result = controller.run(&[server.uri()]).await.unwrap();

    // without the headers the server answers 404
    assert_eq!(result.summary.pages_succeeded, 1);
    assert!(result.summary.dropped.is_empty());
}

#[tokio::test]
async fn test_link_crawl_exports_csv() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(page("home", &["/a", "/b", "/a#again"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(page("A", &["/b"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html(page("B", &["/"])))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_server_config(&server);
    let controller =
        Controller::new(config.clone(), transport(&config), LinkExtractor::new().unwrap()).unwrap();
    let result = controller.run(&[server.uri()]).await.unwrap();

    assert_eq!(result.pages_visited, 3);
    assert_eq!(
        result.links_discovered,
        vec![format!("{}/a", server.uri()), format!("{}/b", server.uri())]
    );

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("pages.csv");
    let written = exporter_for::<PageInfo>(OutputFormat::Csv, &out)
        .export(&result.records)
        .unwrap();
    assert_eq!(written, 3);

    let content = std::fs::read_to_string(&out).unwrap();
    assert!(content.starts_with("url,title\n"));
    assert_eq!(content.lines().count(), 4);
}

#[tokio::test]
async fn test_unreachable_host_is_retried_and_dropped() {
    // Bind and release a port so nothing is listening on it
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let config = create_test_config(&["127.0.0.1"], 10, 1);
    let controller =
        Controller::new(config.clone(), transport(&config), LinkExtractor::new().unwrap()).unwrap();
    let result = controller
        .run(&[format!("http://127.0.0.1:{}/", port)])
        .await
        .unwrap();

    assert!(result.is_complete());
    assert_eq!(result.summary.fetch_attempts, 3);
    assert_eq!(result.summary.retries_exhausted, 1);
    assert_eq!(controller.dispatcher().total_in_flight(), 0);
}

#[tokio::test]
async fn test_redirect_outside_allowed_domains_not_followed() {
    let server = MockServer::start().await;
    let outside = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/secret", outside.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(html(page("outside", &[])))
        .expect(0)
        .mount(&outside)
        .await;

    let config = create_server_config(&server);
    let controller =
        Controller::new(config.clone(), transport(&config), LinkExtractor::new().unwrap()).unwrap();
    let result = controller.run(&[server.uri()]).await.unwrap();

    assert!(result.records.is_empty());
    assert_eq!(result.summary.fatal_failures, 1);
    assert_eq!(result.summary.dropped[0].error, "HTTP 302");
    assert_eq!(controller.dispatcher().total_in_flight(), 0);
}

#[tokio::test]
async fn test_links_resolve_against_final_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/shop"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/shop/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop/"))
        .respond_with(html(page("shop", &["item"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop/item"))
        .respond_with(html(page("item", &[])))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_server_config(&server);
    let controller =
        Controller::new(config.clone(), transport(&config), LinkExtractor::new().unwrap()).unwrap();
    let result = controller
        .run(&[format!("{}/shop", server.uri())])
        .await
        .unwrap();

    assert_eq!(
        result.links_discovered,
        vec![format!("{}/shop/item", server.uri())]
    );
    assert!(result.summary.dropped.is_empty());
    assert!(result
        .records
        .iter()
        .any(|record| record.url == format!("{}/shop/", server.uri())));
}

#[tokio::test]
async fn test_redirect_loop_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_server_config(&server);
    let controller =
        Controller::new(config.clone(), transport(&config), LinkExtractor::new().unwrap()).unwrap();
    let result = controller
        .run(&[format!("{}/loop", server.uri())])
        .await
        .unwrap();

    assert_eq!(result.summary.fetch_attempts, 1);
    assert_eq!(result.summary.retries_scheduled, 0);
    assert_eq!(result.summary.fatal_failures, 1);
    assert_eq!(result.summary.dropped[0].reason, DropReason::Fatal);
}

#[tokio::test]
async fn test_requests_rotate_through_proxies() {
    let proxy_a = MockServer::start().await;
    let proxy_b = MockServer::start().await;

    for proxy in [&proxy_a, &proxy_b] {
        Mock::given(method("GET"))
            .respond_with(html(page("via proxy", &["/a", "/b", "/c"])))
            .expect(2)
            .mount(proxy)
            .await;
    }

    let mut config = create_test_config(&["shop.invalid"], 50, 1);
    config.crawler.workers = 1;
    config.limits.default_rule.parallelism = 1;
    config.proxy.urls = vec![proxy_a.uri(), proxy_b.uri()];

    let transport = transport(&config);
    assert_eq!(transport.proxy_count(), 2);

    let controller =
        Controller::new(config, transport, LinkExtractor::new().unwrap()).unwrap();
    let result = controller
        .run(&["http://shop.invalid/".to_string()])
        .await
        .unwrap();

    assert_eq!(result.pages_visited, 4);
    assert_eq!(result.summary.pages_succeeded, 4);
}
