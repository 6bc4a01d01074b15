//! Configuration loading and validation
//!
//! Configuration is a TOML file with crawler-wide settings, the store
//! location, and a list of tagged sources. Unrecoverable configuration
//! errors abort before any crawling begins.

mod parser;
mod types;
mod validation;

pub use parser::load_config;
pub use types::{
    CategorySourceConfig, Config, CrawlerConfig, PaginatedSourceConfig, SourceConfig, StoreConfig,
};
pub use validation::validate;
