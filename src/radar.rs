//! One scheduled run: scan every brand, diff against the last snapshot, write
//! the report, persist the snapshot, then notify.
//!
//! Brands are isolated from each other. A recoverable error for one brand is
//! recorded as [`BrandOutcome::Failed`] and the run moves on; only fatal errors
//! (see [`AppError::is_fatal`]) abort it. Notification happens last so a
//! failed send never loses the computed state.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::diff::{dedup_items, diff_new};
use crate::extractor::{Extraction, Extractor, Page, page_signals};
use crate::models::{
    BrandDescriptor, BrandOutcome, BrandResult, BrandScan, Item, NotificationStatus, RunSummary,
    State,
};
use crate::notifier::{Delivery, EmailNotifier, Notifier};
use crate::report::{self, ReportWriter};
use crate::scraper::{PageFetcher, build_fetcher};
use crate::state::StateStore;
use crate::utils::error::{AppError, Result};

pub struct Radar {
    fetcher: Box<dyn PageFetcher>,
    state: StateStore,
    reports: ReportWriter,
    notifier: Option<Box<dyn Notifier>>,
    max_items: usize,
}

impl Radar {
    pub fn new(
        fetcher: Box<dyn PageFetcher>,
        state: StateStore,
        reports: ReportWriter,
        notifier: Option<Box<dyn Notifier>>,
        max_items: usize,
    ) -> Self {
        Self {
            fetcher,
            state,
            reports,
            notifier,
            max_items,
        }
    }

    /// Wire up the production components described by `config`.
    pub fn from_config(config: &AppConfig, send_email: bool) -> Result<Self> {
        let notifier: Option<Box<dyn Notifier>> = if send_email {
            Some(Box::new(EmailNotifier::new(
                config.notifications.smtp.clone(),
                config.notifications.suppress_seeding,
            )))
        } else {
            None
        };

        Ok(Self::new(
            build_fetcher(&config.scraper)?,
            StateStore::new(&config.paths.state_file),
            ReportWriter::new(&config.paths.reports_dir),
            notifier,
            config.scraper.max_items,
        ))
    }

    pub async fn run(&self, brands: &[BrandDescriptor], date: NaiveDate) -> Result<RunSummary> {
        let mut state = self.state.load();
        let mut results = Vec::with_capacity(brands.len());

        for brand in brands {
            info!("Scanning {} -> {}", brand.name, brand.url);
            let key = state_key(&state, brand);
            let previous = key.as_ref().and_then(|k| state.get(k)).map(Vec::as_slice);

            let scanned = self.scan_brand(brand, previous).await;
            let outcome = match scanned {
                Ok(scan) => {
                    info!(
                        "{}: {} items, {} new{}",
                        brand.name,
                        scan.items.len(),
                        scan.new_items.len(),
                        if scan.seeding { " (first scan)" } else { "" }
                    );
                    // An empty scan is more likely a broken page than a sold-out store
                    if !scan.items.is_empty() {
                        // Re-key under the registry's spelling of the name
                        if let Some(old) = key.filter(|k| *k != brand.name) {
                            state.remove(&old);
                        }
                        state.insert(brand.name.clone(), scan.items.clone());
                    }
                    BrandOutcome::Scanned(scan)
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Skipping {}: {}", brand.name, e);
                    BrandOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };

            results.push(BrandResult {
                brand: brand.name.clone(),
                outcome,
            });
        }

        let mut summary = RunSummary::new(date, results);

        let markdown = report::render(date, &summary.brands);
        summary.report_path = Some(self.reports.write(date, &markdown)?);
        self.state.save(&state)?;
        debug!("Saved state to {}", self.state.path().display());

        summary.notification = match &self.notifier {
            None => NotificationStatus::Disabled,
            Some(notifier) => match notifier.notify(&summary).await {
                Ok(Delivery::Sent) => NotificationStatus::Sent,
                Ok(Delivery::Skipped(reason)) => NotificationStatus::Skipped(reason),
                Err(e) => {
                    warn!("Notification failed: {}", e);
                    NotificationStatus::Failed(e.to_string())
                }
            },
        };

        info!(
            "Run complete: {} new items, {} brands scanned, {} skipped",
            summary.total_new(),
            summary.scanned_count(),
            summary.failed().count()
        );
        Ok(summary)
    }

    /// Fetch and extract every page of a brand, then diff against `previous`.
    ///
    /// Fails only when no page of the brand could be fetched.
    async fn scan_brand(
        &self,
        brand: &BrandDescriptor,
        previous: Option<&[Item]>,
    ) -> Result<BrandScan> {
        let extractor = Extractor::for_brand(brand);
        let mut found = Vec::new();
        let mut notes = Vec::new();
        let mut strategy = None;
        let mut last_error = None;
        let mut fetched_any = false;

        for (index, url) in brand.page_urls().into_iter().enumerate() {
            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    notes.push(e.to_string());
                    last_error = Some(e);
                    continue;
                }
            };
            fetched_any = true;

            let (extraction, signals) = read_page(&extractor, &html, &url);
            if !signals.is_empty() {
                let label = match index.checked_sub(1) {
                    Some(alt) => brand.paths.get(alt).map_or("Page", String::as_str),
                    None => "Page",
                };
                notes.push(format!("{} signals: {}", label, signals.join(", ")));
            }
            if extraction.items.is_empty() {
                notes.push(format!("No items matched on {}", url));
                continue;
            }
            if strategy.is_none() {
                strategy = extraction.strategy;
            }
            found.extend(extraction.items);
        }

        if !fetched_any {
            return Err(last_error
                .unwrap_or_else(|| AppError::fetch(&brand.url, "no pages to fetch")));
        }

        let mut items = dedup_items(found);
        items.truncate(self.max_items);
        let new_items = diff_new(previous, &items);

        Ok(BrandScan {
            items,
            new_items,
            seeding: previous.is_none(),
            strategy,
            notes,
        })
    }
}

/// State key for `brand`, matching names the way the registry does.
fn state_key(state: &State, brand: &BrandDescriptor) -> Option<String> {
    if state.contains_key(&brand.name) {
        return Some(brand.name.clone());
    }
    state.keys().find(|k| brand.matches_name(k)).cloned()
}

/// Parse once for both the listing and the page-level signals.
fn read_page(extractor: &Extractor, html: &str, url: &str) -> (Extraction, Vec<String>) {
    let page = Page::parse(html, url);
    (extractor.extract_page(&page), page_signals(&page))
}
