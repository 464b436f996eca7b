use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Brand registry error: {0}")]
    Registry(String),

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Extraction error: {strategy}: {message}")]
    Extract { strategy: String, message: String },

    #[error("State file error: {0}")]
    StateIo(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn fetch(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn extract(strategy: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::Extract {
            strategy: strategy.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error should abort the whole run rather than a single brand.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AppError::Fetch { .. } | AppError::Extract { .. } | AppError::Notify(_)
        )
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
