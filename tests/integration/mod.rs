// Shared fixtures for the end-to-end tests

pub mod pipeline_tests;
pub mod registry_tests;
pub mod http_tests;

use async_trait::async_trait;
use brand_radar::AppError;
use brand_radar::Radar;
use brand_radar::notifier::Notifier;
use brand_radar::report::ReportWriter;
use brand_radar::scraper::PageFetcher;
use brand_radar::state::StateStore;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Serves canned pages by URL. Unknown URLs fail like a 404.
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, Result<String, String>>,
    pub requested: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), Ok(html.into()));
        self
    }

    pub fn failing(mut self, url: &str, message: &str) -> Self {
        self.pages.insert(url.to_string(), Err(message.to_string()));
        self
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> brand_radar::Result<String> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(Ok(html)) => Ok(html.clone()),
            Some(Err(message)) => Err(AppError::fetch(url, message.as_str())),
            None => Err(AppError::fetch(url, "HTTP status 404")),
        }
    }
}

/// Product tiles in the shape most storefront themes use.
pub fn product_page(items: &[(&str, &str)]) -> String {
    let tiles: String = items
        .iter()
        .map(|(name, link)| format!(r#"<div class="product"><a href="{}">{}</a></div>"#, link, name))
        .collect();
    format!("<html><body><nav><a href=\"/\">Home</a></nav>{}</body></html>", tiles)
}

pub fn radar_in(dir: &Path, fetcher: impl PageFetcher + 'static) -> Radar {
    radar_with(dir, Box::new(fetcher), None)
}

pub fn radar_with(
    dir: &Path,
    fetcher: Box<dyn PageFetcher>,
    notifier: Option<Box<dyn Notifier>>,
) -> Radar {
    Radar::new(
        fetcher,
        StateStore::new(dir.join("data/state.json")),
        ReportWriter::new(dir.join("reports")),
        notifier,
        30,
    )
}

pub fn state_store(dir: &Path) -> StateStore {
    StateStore::new(dir.join("data/state.json"))
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

/// Lets a test keep a handle on a fetcher the radar owns.
pub struct SharedFetcher(pub std::sync::Arc<StubFetcher>);

#[async_trait]
impl PageFetcher for SharedFetcher {
    async fn fetch(&self, url: &str) -> brand_radar::Result<String> {
        self.0.fetch(url).await
    }
}
