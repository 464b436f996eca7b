use async_trait::async_trait;

use crate::models::RunSummary;
use crate::utils::error::Result;

pub mod email;

pub use email::EmailNotifier;

/// How a notification attempt ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped(String),
}

/// Sink for the end-of-run summary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary: &RunSummary) -> Result<Delivery>;
}
