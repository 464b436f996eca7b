use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub scraper: ScraperConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub brands_file: PathBuf,
    pub state_file: PathBuf,
    pub reports_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    Chrome,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub fetcher: FetcherKind,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// Per-navigation timeout, in seconds.
    pub request_timeout: u64,
    /// Pause after load so client-rendered listings can settle.
    pub settle_ms: u64,
    pub max_items: usize,
    pub user_agent: String,
    pub chrome_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub smtp: SmtpConfig,
    /// Collapse a brand's first scan to a one-line mention in the email.
    pub suppress_seeding: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub to_address: Option<String>,
    pub from_name: String,
    pub use_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    pub fn load_from(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "production".into());

        let s = Self::defaults()?
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Local overrides (ignored by git)
            .add_source(File::with_name(&format!("{}/local", config_dir)).required(false))
            // Environment variables with prefix "RADAR__", e.g. RADAR__SCRAPER__MAX_ITEMS
            .add_source(Environment::with_prefix("RADAR").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        config.apply_secret_env();
        config.validate()?;
        Ok(config)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("paths.brands_file", "brands.json")?
            .set_default("paths.state_file", "data/state.json")?
            .set_default("paths.reports_dir", "reports")?
            .set_default("scraper.fetcher", "chrome")?
            .set_default("scraper.retry_attempts", 2)?
            .set_default("scraper.retry_delay_ms", 2000)?
            .set_default("scraper.request_timeout", 35)?
            .set_default("scraper.settle_ms", 1500)?
            .set_default("scraper.max_items", 30)?
            .set_default("scraper.user_agent", DEFAULT_USER_AGENT)?
            .set_default("notifications.suppress_seeding", false)?
            .set_default("notifications.smtp.host", "smtp.gmail.com")?
            .set_default("notifications.smtp.port", 587)?
            .set_default("notifications.smtp.from_name", "Brand Radar")?
            .set_default("notifications.smtp.use_tls", true)?
            .set_default("logging.level", "info")
    }

    /// Mail credentials come from the scheduler's secret store as plain env vars.
    fn apply_secret_env(&mut self) {
        let smtp = &mut self.notifications.smtp;
        if smtp.username.is_none() {
            smtp.username = env::var("EMAIL_USER").ok().filter(|v| !v.is_empty());
        }
        if smtp.password.is_none() {
            smtp.password = env::var("EMAIL_PASS").ok().filter(|v| !v.is_empty());
        }
        if smtp.to_address.is_none() {
            smtp.to_address = env::var("EMAIL_TO").ok().filter(|v| !v.is_empty());
        }
        if self.scraper.chrome_path.is_none() {
            self.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraper.retry_attempts == 0 {
            return Err(ConfigError::Message("Scraper retry_attempts must be at least 1".into()));
        }

        if self.scraper.request_timeout == 0 {
            return Err(ConfigError::Message("Scraper request_timeout must be greater than 0".into()));
        }

        if self.scraper.max_items == 0 {
            return Err(ConfigError::Message("Scraper max_items must be greater than 0".into()));
        }

        if self.scraper.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Scraper user_agent must not be empty".into()));
        }

        if self.notifications.smtp.port == 0 {
            return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
        }

        if self.notifications.smtp.host.trim().is_empty() {
            return Err(ConfigError::Message("SMTP host must not be empty".into()));
        }

        if self.paths.state_file.as_os_str().is_empty() {
            return Err(ConfigError::Message("paths.state_file must not be empty".into()));
        }

        Ok(())
    }
}

impl SmtpConfig {
    /// Username, password and recipient, if all three are present.
    pub fn credentials(&self) -> Option<(&str, &str, &str)> {
        match (&self.username, &self.password, &self.to_address) {
            (Some(user), Some(pass), Some(to)) => Some((user, pass, to)),
            _ => None,
        }
    }
}
