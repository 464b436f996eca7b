use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Item;

/// What a successful scan of one brand produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandScan {
    /// Everything seen this run, merged across pages.
    pub items: Vec<Item>,
    /// Items absent from the previous snapshot.
    pub new_items: Vec<Item>,
    /// No previous snapshot existed for this brand.
    pub seeding: bool,
    pub strategy: Option<String>,
    /// Per-page warnings that did not fail the brand.
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BrandOutcome {
    Scanned(BrandScan),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandResult {
    pub brand: String,
    pub outcome: BrandOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Disabled,
    Sent,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub date: NaiveDate,
    pub brands: Vec<BrandResult>,
    pub report_path: Option<PathBuf>,
    pub notification: NotificationStatus,
}

impl BrandResult {
    pub fn scan(&self) -> Option<&BrandScan> {
        match &self.outcome {
            BrandOutcome::Scanned(scan) => Some(scan),
            BrandOutcome::Failed { .. } => None,
        }
    }
}

impl RunSummary {
    pub fn new(date: NaiveDate, brands: Vec<BrandResult>) -> Self {
        Self {
            date,
            brands,
            report_path: None,
            notification: NotificationStatus::Pending,
        }
    }

    pub fn total_new(&self) -> usize {
        self.brands
            .iter()
            .filter_map(BrandResult::scan)
            .map(|s| s.new_items.len())
            .sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = &BrandResult> {
        self.brands
            .iter()
            .filter(|b| matches!(b.outcome, BrandOutcome::Failed { .. }))
    }

    pub fn scanned_count(&self) -> usize {
        self.brands.iter().filter(|b| b.scan().is_some()).count()
    }
}
