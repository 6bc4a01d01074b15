//! Magpie: a resumable corpus crawler
//!
//! This crate ingests documents from a category-structured wiki and from
//! flat paginated article listings into a durable SQLite store. All crawl
//! state (task queue, pagination cursors, content hashes) lives in the
//! store, so the process can be interrupted and restarted at any point
//! without losing or skipping work.

pub mod config;
pub mod crawler;
pub mod fingerprint;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for Magpie operations
#[derive(Debug, Error)]
pub enum MagpieError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Directory listing failed for category '{category}': {message}")]
    Listing { category: String, message: String },

    #[error("Invalid item pattern '{pattern}': {source}")]
    ItemPattern {
        pattern: String,
        source: regex::Error,
    },

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
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("URL '{url}' is not under the page base '{base}'")]
    NotUnderBase { url: String, base: String },
}

/// Result type alias for Magpie operations
pub type Result<T> = std::result::Result<T, MagpieError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use fingerprint::{fingerprint, has_changed};
pub use store::{CategoryTask, DocumentRecord, PageProgress, TaskStatus};
pub use url::{normalize_title, normalize_url, page_url, title_from_url};
