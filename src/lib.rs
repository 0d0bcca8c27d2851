//! Page-Sounder: a single-page web analyzer
//!
//! This crate fetches a web page, derives structural facts about it (title,
//! heading counts, internal/external links, login forms, broken links) and
//! records them against a crawl record that moves through a small lifecycle.

pub mod analysis;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Page-Sounder operations
#[derive(Debug, Error)]
pub enum SounderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] crawler::CrawlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(#[from] ::url::ParseError),

    #[error("Missing scheme in URL: {0}")]
    MissingScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Page-Sounder operations
pub type Result<T> = std::result::Result<T, SounderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use analysis::{analyze, HtmlVersion, PageAnalysis};
pub use config::Config;
pub use crawler::{CrawlError, CrawlPool, Orchestrator};
pub use state::CrawlStatus;
pub use crate::url::{classify_link, resolve_link, validate_target, LinkKind};
