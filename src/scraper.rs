use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, info, warn};

use crate::config::{FetcherKind, ScraperConfig};
use crate::utils::error::{AppError, Result};

/// Retrieves the rendered HTML of a page.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Build the fetcher selected in config, wrapped with the configured attempts.
pub fn build_fetcher(config: &ScraperConfig) -> Result<Box<dyn PageFetcher>> {
    let attempts = config.retry_attempts;
    let delay = Duration::from_millis(config.retry_delay_ms);
    Ok(match config.fetcher {
        FetcherKind::Chrome => Box::new(Retrying::new(ChromeFetcher::new(config.clone()), attempts, delay)),
        FetcherKind::Http => Box::new(Retrying::new(HttpFetcher::new(config)?, attempts, delay)),
    })
}

/// Headless Chrome, launched on first use and shared by every fetch in the run.
pub struct ChromeFetcher {
    config: ScraperConfig,
    browser: OnceCell<Arc<Browser>>,
}

impl ChromeFetcher {
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            browser: OnceCell::new(),
        }
    }

    async fn browser(&self) -> Result<Arc<Browser>> {
        let config = self.config.clone();
        let browser = self
            .browser
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || launch_browser(&config))
                    .await
                    .map_err(|e| AppError::Browser(format!("launch task failed: {}", e)))?
            })
            .await?;
        Ok(Arc::clone(browser))
    }
}

fn launch_browser(config: &ScraperConfig) -> Result<Arc<Browser>> {
    let mut launch_options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false) // Often needed in containerized environments
        .window_size(Some((1366, 2000)))
        .idle_browser_timeout(Duration::from_secs(config.request_timeout * 4))
        .args(vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-extensions"),
            OsStr::new("--disable-blink-features=AutomationControlled"),
        ])
        .build()
        .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

    // Set Chrome path if provided
    if let Some(chrome_path) = &config.chrome_path {
        launch_options.path = Some(std::path::PathBuf::from(chrome_path));
    }

    let browser = Browser::new(launch_options)
        .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;
    info!("Launched headless browser");
    Ok(Arc::new(browser))
}

/// Navigate a fresh tab to `url` and return the rendered document.
fn render_page(browser: &Browser, url: &str, config: &ScraperConfig) -> Result<String> {
    let tab = browser
        .new_tab()
        .map_err(|e| AppError::fetch(url, format!("Failed to create tab: {}", e)))?;
    tab.set_default_timeout(Duration::from_secs(config.request_timeout));

    let result = (|| {
        tab.set_user_agent(&config.user_agent, Some("en-GB"), None)
            .map_err(|e| AppError::fetch(url, format!("Failed to set user agent: {}", e)))?;
        tab.navigate_to(url)
            .map_err(|e| AppError::fetch(url, format!("Navigation failed: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| AppError::fetch(url, format!("Page load failed: {}", e)))?;

        // Chrome renders error pages as documents, so check the navigation status explicitly
        let status = tab
            .evaluate(
                "(performance.getEntriesByType('navigation')[0] || {}).responseStatus || 0",
                false,
            )
            .ok()
            .and_then(|r| r.value)
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        if status >= 400 {
            return Err(AppError::fetch(url, format!("HTTP status {}", status)));
        }

        if config.settle_ms > 0 {
            std::thread::sleep(Duration::from_millis(config.settle_ms));
        }

        tab.get_content()
            .map_err(|e| AppError::fetch(url, format!("Failed to get page content: {}", e)))
    })();

    // Close tab to free resources
    let _ = tab.close(true);
    result
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let browser = self.browser().await?;
        let config = self.config.clone();
        let target = url.to_string();
        tokio::task::spawn_blocking(move || render_page(&browser, &target, &config))
            .await
            .map_err(|e| AppError::fetch(url, format!("render task failed: {}", e)))?
    }
}

/// Plain HTTP GET, for storefronts that render listings server-side.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-GB,en;q=0.9")
            .send()
            .await
            .map_err(|e| AppError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("HTTP status {}", status.as_u16())));
        }

        response.text().await.map_err(|e| AppError::fetch(url, e))
    }
}

/// Retries recoverable fetch errors a fixed number of times with a fixed delay.
pub struct Retrying<F> {
    inner: F,
    attempts: u32,
    delay: Duration,
}

impl<F: PageFetcher> Retrying<F> {
    pub fn new(inner: F, attempts: u32, delay: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            delay,
        }
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for Retrying<F> {
    async fn fetch(&self, url: &str) -> Result<String> {
        let retries = FixedInterval::new(self.delay).take(self.attempts as usize - 1);
        let mut attempt = 0;
        RetryIf::spawn(
            retries,
            || {
                attempt += 1;
                debug!("Fetching {} (attempt {}/{})", url, attempt, self.attempts);
                self.inner.fetch(url)
            },
            |e: &AppError| {
                let retry = !e.is_fatal();
                if retry {
                    warn!("{}", e);
                }
                retry
            },
        )
        .await
    }
}
