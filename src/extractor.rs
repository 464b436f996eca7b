//! Heuristic product extraction.
//!
//! An [`Extractor`] holds an ordered list of strategies. Each is tried against
//! the page in turn and the first one that yields any items wins; later
//! strategies are never consulted and results are never merged. Brand-specific
//! selectors sit in front of the generic fallbacks, so no per-brand code is
//! needed.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::models::{BrandDescriptor, Item};
use crate::utils::error::{AppError, Result};

/// Selectors tried for every brand after its own hints and structured data.
pub const GENERIC_SELECTORS: &[&str] = &[
    "a[href*='/products/']",
    "[class*='product'] a",
    ".product-title, .ProductItem__Title, .card__heading, h2, h3",
];

/// Merchandising phrases worth surfacing when a page mentions them.
pub const SIGNAL_KEYWORDS: &[&str] = &[
    "bestseller",
    "best seller",
    "best-selling",
    "back in stock",
    "restock",
    "restocked",
    "most popular",
    "popular",
    "trending",
    "new arrivals",
    "new in",
    "just dropped",
];

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 120;

static NAV_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(home|shop|cart|menu|search)$").expect("valid regex"));

static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:US\$|[\$£€¥₹])\s?\d{1,3}(?:,\d{3})*(?:\.\d{2})?").expect("valid regex")
});

static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// A parsed page plus the URL relative links resolve against.
pub struct Page {
    document: Html,
    base: Option<Url>,
    raw_url: String,
}

impl Page {
    pub fn parse(html: &str, url: &str) -> Self {
        Self {
            document: Html::parse_document(html),
            base: Url::parse(url).ok(),
            raw_url: url.to_string(),
        }
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    pub fn url(&self) -> &str {
        &self.raw_url
    }

    /// Resolve `href` against the page URL. Without a parsable base the href is kept as-is.
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        match &self.base {
            Some(base) => base.join(href).ok().map(|u| u.to_string()),
            None => Some(href.to_string()),
        }
    }
}

/// One way of finding product listings on a page.
pub trait Strategy: Send + Sync {
    fn name(&self) -> String;
    fn extract(&self, page: &Page) -> Result<Vec<Item>>;
}

/// Adapts a plain function into a [`Strategy`].
pub struct FnStrategy<F> {
    name: String,
    f: F,
}

impl<F> FnStrategy<F>
where
    F: Fn(&Page) -> Result<Vec<Item>> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Strategy for FnStrategy<F>
where
    F: Fn(&Page) -> Result<Vec<Item>> + Send + Sync,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn extract(&self, page: &Page) -> Result<Vec<Item>> {
        (self.f)(page)
    }
}

/// Tile-style listings located by a CSS selector.
pub struct CssStrategy {
    selector: String,
}

impl CssStrategy {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }
}

impl Strategy for CssStrategy {
    fn name(&self) -> String {
        format!("css:{}", self.selector)
    }

    fn extract(&self, page: &Page) -> Result<Vec<Item>> {
        let selector = Selector::parse(&self.selector)
            .map_err(|e| AppError::extract(self.name(), format!("invalid selector: {:?}", e)))?;

        let mut items = Vec::new();
        for element in page.document().select(&selector) {
            let name = normalise_text(&element.text().collect::<Vec<_>>().join(" "));
            let len = name.chars().count();
            if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) || NAV_WORDS.is_match(&name) {
                continue;
            }

            let Some(anchor) = link_element(element) else {
                continue;
            };
            let Some(link) = anchor.value().attr("href").and_then(|h| page.resolve(h)) else {
                continue;
            };

            items.push(Item {
                price: find_price(anchor),
                name,
                link,
            });
        }
        Ok(dedup(items))
    }
}

/// `Product` entries from `<script type="application/ld+json">` blocks.
pub struct JsonLdStrategy;

impl Strategy for JsonLdStrategy {
    fn name(&self) -> String {
        "json-ld".to_string()
    }

    fn extract(&self, page: &Page) -> Result<Vec<Item>> {
        let selector = Selector::parse(r#"script[type="application/ld+json"]"#)
            .map_err(|e| AppError::extract(self.name(), format!("{:?}", e)))?;

        let mut items = Vec::new();
        for script in page.document().select(&selector) {
            let raw = script.text().collect::<String>();
            let data: Value = match serde_json::from_str(raw.trim()) {
                Ok(data) => data,
                Err(e) => {
                    debug!("Skipping unparsable JSON-LD block on {}: {}", page.url(), e);
                    continue;
                }
            };

            for candidate in json_ld_candidates(&data) {
                if let Some(item) = json_ld_product(candidate, page) {
                    items.push(item);
                }
            }
        }
        Ok(dedup(items))
    }
}

fn json_ld_candidates(data: &Value) -> Vec<&Value> {
    match data {
        Value::Array(entries) => entries.iter().collect(),
        Value::Object(obj) => {
            let mut candidates = vec![data];
            if let Some(Value::Array(graph)) = obj.get("@graph") {
                candidates.extend(graph.iter());
            }
            candidates
        }
        _ => Vec::new(),
    }
}

fn json_ld_product(obj: &Value, page: &Page) -> Option<Item> {
    let is_product = match obj.get("@type") {
        Some(Value::String(t)) => t == "Product",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Product")),
        _ => false,
    };
    if !is_product {
        return None;
    }

    let name = normalise_text(obj.get("name")?.as_str()?);
    if name.is_empty() {
        return None;
    }

    let link = obj
        .get("url")
        .or_else(|| obj.get("@id"))
        .and_then(Value::as_str)
        .and_then(|href| page.resolve(href))
        .unwrap_or_default();

    let offer = match obj.get("offers") {
        Some(Value::Array(offers)) => offers.first(),
        other => other,
    };
    let price = offer.and_then(|offer| {
        let spec = offer.get("priceSpecification");
        let amount = offer
            .get("price")
            .or_else(|| spec.and_then(|s| s.get("price")))
            .and_then(scalar_text)?;
        let currency = offer
            .get("priceCurrency")
            .or_else(|| spec.and_then(|s| s.get("priceCurrency")))
            .and_then(scalar_text);
        Some(match currency {
            Some(currency) => format!("{} {}", currency, amount),
            None => amount,
        })
    });

    Some(Item { name, link, price })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The element itself if it is a link, otherwise its nearest `<a href>` ancestor.
fn link_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if element.value().name() == "a" && element.value().attr("href").is_some() {
        return Some(element);
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "a" && e.value().attr("href").is_some())
}

/// First currency amount in the tile around a link.
///
/// The tile is the widest ancestor that holds no other link, so a price is
/// never borrowed from a neighbouring product.
fn find_price(anchor: ElementRef<'_>) -> Option<String> {
    let tile = anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|e| e.select(&LINKS).count() <= 1)
        .last()
        .unwrap_or(anchor);
    let text = tile.text().collect::<Vec<_>>().join(" ");
    PRICE.find(&text).map(|m| m.as_str().to_string())
}

pub fn normalise_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn dedup(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.key())).collect()
}

/// Signal keywords present in the visible text of a page, sorted and unique.
pub fn page_signals(page: &Page) -> Vec<String> {
    let text = visible_text(page).to_lowercase();
    let hits: BTreeSet<&str> = SIGNAL_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| text.contains(keyword))
        .collect();
    hits.into_iter().map(str::to_string).collect()
}

fn visible_text(page: &Page) -> String {
    page.document()
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(|p| p.value().as_element().map(|e| e.name()));
            match parent {
                Some("script" | "style" | "noscript") => None,
                _ => Some(&**text),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of running an extractor against one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub items: Vec<Item>,
    /// Name of the strategy that produced `items`, if any did.
    pub strategy: Option<String>,
}

pub struct Extractor {
    strategies: Vec<Box<dyn Strategy>>,
}

impl Extractor {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// Brand hints first, then JSON-LD, then the generic selectors.
    pub fn for_brand(brand: &BrandDescriptor) -> Self {
        let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();
        for selector in &brand.selectors {
            strategies.push(Box::new(CssStrategy::new(selector.clone())));
        }
        strategies.push(Box::new(JsonLdStrategy));
        for selector in GENERIC_SELECTORS {
            strategies.push(Box::new(CssStrategy::new(*selector)));
        }
        Self::new(strategies)
    }

    pub fn strategy_names(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn extract(&self, html: &str, url: &str) -> Extraction {
        let page = Page::parse(html, url);
        self.extract_page(&page)
    }

    pub fn extract_page(&self, page: &Page) -> Extraction {
        for strategy in &self.strategies {
            match strategy.extract(page) {
                Ok(items) if !items.is_empty() => {
                    debug!(
                        "{} matched {} items on {}",
                        strategy.name(),
                        items.len(),
                        page.url()
                    );
                    return Extraction {
                        items,
                        strategy: Some(strategy.name()),
                    };
                }
                Ok(_) => {}
                Err(e) => debug!("{} failed on {}: {}", strategy.name(), page.url(), e),
            }
        }
        Extraction::default()
    }
}
