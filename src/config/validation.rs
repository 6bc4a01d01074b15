use crate::config::types::{
    CategorySourceConfig, Config, CrawlerConfig, PaginatedSourceConfig, SourceConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;

    if config.store.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.sources.is_empty() {
        return Err(ConfigError::Validation(
            "at least one source must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for source in &config.sources {
        if source.name().is_empty() {
            return Err(ConfigError::Validation(
                "source name cannot be empty".to_string(),
            ));
        }
        if !names.insert(source.name().to_string()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name '{}'",
                source.name()
            )));
        }

        match source {
            SourceConfig::Category(c) => validate_category_source(c)?,
            SourceConfig::Paginated(p) => validate_paginated_source(p)?,
        }
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_category_source(source: &CategorySourceConfig) -> Result<(), ConfigError> {
    Url::parse(&source.api_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("invalid api-url for '{}': {}", source.name, e))
    })?;

    let page_base = Url::parse(&source.page_base).map_err(|e| {
        ConfigError::InvalidUrl(format!("invalid page-base for '{}': {}", source.name, e))
    })?;
    if !page_base.path().ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "page-base for '{}' must end with '/'",
            source.name
        )));
    }

    if source.seeds.is_empty() {
        return Err(ConfigError::Validation(format!(
            "category source '{}' must have at least one seed URL",
            source.name
        )));
    }
    for seed in &source.seeds {
        if !seed.starts_with(&source.page_base) {
            return Err(ConfigError::InvalidUrl(format!(
                "seed '{}' is not under page-base '{}'",
                seed, source.page_base
            )));
        }
    }

    Ok(())
}

fn validate_paginated_source(source: &PaginatedSourceConfig) -> Result<(), ConfigError> {
    if !source.page_url_template.contains("{page}") {
        return Err(ConfigError::Validation(format!(
            "page-url-template for '{}' must contain '{{page}}'",
            source.name
        )));
    }

    Url::parse(&source.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("invalid base-url for '{}': {}", source.name, e))
    })?;

    regex::Regex::new(&source.item_pattern).map_err(|e| {
        ConfigError::Validation(format!(
            "invalid item-pattern for '{}': {}",
            source.name, e
        ))
    })?;

    if source.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages for '{}' must be >= 1",
            source.name
        )));
    }

    Ok(())
}
