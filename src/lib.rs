pub mod config;
pub mod diff;
pub mod extractor;
pub mod models;
pub mod notifier;
pub mod radar;
pub mod registry;
pub mod report;
pub mod scraper;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use radar::Radar;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
