use brand_radar::config::{DEFAULT_USER_AGENT, FetcherKind, ScraperConfig};
use brand_radar::models::{BrandDescriptor, Item};
use brand_radar::scraper::build_fetcher;
use std::fs;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn http_config() -> ScraperConfig {
    ScraperConfig {
        fetcher: FetcherKind::Http,
        retry_attempts: 2,
        retry_delay_ms: 1,
        request_timeout: 5,
        settle_ms: 0,
        max_items: 30,
        user_agent: DEFAULT_USER_AGENT.to_string(),
        chrome_path: None,
    }
}

const LISTING: &str = r#"<html><body>
  <header><a href="/">Home</a><a href="/cart">Cart</a></header>
  <div class="grid">
    <div class="product-card"><a href="/products/trail-shoe">Trail Shoe</a><span>£120.00</span></div>
    <div class="product-card"><a href="/products/wool-hat">Wool Hat</a><span>£35.00</span></div>
  </div>
</body></html>"#;

const JSON_LD_ONLY: &str = r#"<html><head>
<script type="application/ld+json">
{"@context": "https://schema.org", "@graph": [
  {"@type": "Product", "name": "Field Jacket", "url": "/products/field-jacket",
   "offers": {"@type": "Offer", "price": "210.00", "priceCurrency": "GBP"}}
]}
</script></head><body><div id="app"></div></body></html>"#;

#[tokio::test]
async fn test_http_run_resolves_links_against_the_storefront() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/all"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string(JSON_LD_ONLY))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let brands = [
        BrandDescriptor::new("Acme", format!("{}/collections/all", server.uri())),
        BrandDescriptor::new("Acme Drops", format!("{}/collections/new", server.uri())),
    ];

    let summary = radar_with(dir.path(), build_fetcher(&http_config())?, None)
        .run(&brands, date(17))
        .await?;

    let acme = summary.brands[0].scan().expect("Acme scanned");
    assert_eq!(
        acme.items,
        vec![
            Item::new("Trail Shoe", format!("{}/products/trail-shoe", server.uri()))
                .with_price("£120.00"),
            Item::new("Wool Hat", format!("{}/products/wool-hat", server.uri()))
                .with_price("£35.00"),
        ]
    );

    let drops = summary.brands[1].scan().expect("Acme Drops scanned");
    assert_eq!(drops.strategy.as_deref(), Some("json-ld"));
    assert_eq!(
        drops.items,
        vec![
            Item::new("Field Jacket", format!("{}/products/field-jacket", server.uri()))
                .with_price("GBP 210.00")
        ]
    );

    let report = fs::read_to_string(summary.report_path.expect("report written"))?;
    assert!(report.contains("· £120.00"));
    assert!(report.contains("· GBP 210.00"));
    Ok(())
}

#[tokio::test]
async fn test_http_errors_are_retried_then_isolated() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/up"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let brands = [
        BrandDescriptor::new("Beta", format!("{}/down", server.uri())),
        BrandDescriptor::new("Acme", format!("{}/up", server.uri())),
    ];

    let summary = radar_with(dir.path(), build_fetcher(&http_config())?, None)
        .run(&brands, date(17))
        .await?;

    assert_eq!(summary.failed().count(), 1);
    assert_eq!(summary.total_new(), 2);
    let state = state_store(dir.path()).load();
    assert!(!state.contains_key("Beta"));
    assert_eq!(state["Acme"].len(), 2);
    Ok(())
}
