use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Magpie
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum category depth to traverse from seed categories
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Per-request timeout (seconds) for every network call
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A crawl source: the closed set of traversal strategies
///
/// `category` sources are walked breadth-first through the durable task
/// queue; `paginated` sources are walked sequentially through a persisted
/// (page, index) cursor. The TTL rescan applies to both, driven by each
/// source's `recrawl-after-secs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum SourceConfig {
    #[serde(rename = "category")]
    Category(CategorySourceConfig),
    #[serde(rename = "paginated")]
    Paginated(PaginatedSourceConfig),
}

impl SourceConfig {
    /// The source tag stored on every document and task
    pub fn name(&self) -> &str {
        match self {
            Self::Category(c) => &c.name,
            Self::Paginated(p) => &p.name,
        }
    }

    /// Inter-request delay for this source
    pub fn delay(&self) -> Duration {
        let ms = match self {
            Self::Category(c) => c.delay_ms,
            Self::Paginated(p) => p.delay_ms,
        };
        Duration::from_millis(ms)
    }

    /// Per-source document cap, if configured
    pub fn max_docs(&self) -> Option<u64> {
        match self {
            Self::Category(c) => c.max_docs,
            Self::Paginated(p) => p.max_docs,
        }
    }

    /// Age in seconds after which a document becomes stale
    pub fn recrawl_after_secs(&self) -> i64 {
        match self {
            Self::Category(c) => c.recrawl_after_secs,
            Self::Paginated(p) => p.recrawl_after_secs,
        }
    }
}

/// A category-structured wiki source walked via the task queue
#[derive(Debug, Clone, Deserialize)]
pub struct CategorySourceConfig {
    pub name: String,

    /// MediaWiki API endpoint used for category member listings
    #[serde(rename = "api-url")]
    pub api_url: String,

    /// Prefix under which article pages live, e.g. `https://host/wiki/`
    #[serde(rename = "page-base")]
    pub page_base: String,

    /// Namespace prefix of category titles, e.g. `Category:`
    #[serde(rename = "category-prefix")]
    pub category_prefix: String,

    /// Delay between requests to this source (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Stop fetching new documents once this many are stored
    #[serde(rename = "max-docs", default)]
    pub max_docs: Option<u64>,

    /// Documents older than this (seconds) are recrawled
    #[serde(rename = "recrawl-after-secs")]
    pub recrawl_after_secs: i64,

    /// Seed category page URLs, inserted at depth 0
    pub seeds: Vec<String>,
}

/// A flat source exposed as a numbered sequence of listing pages
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedSourceConfig {
    pub name: String,

    /// Listing page URL template; `{page}` is replaced with the page number
    #[serde(rename = "page-url-template")]
    pub page_url_template: String,

    /// Base URL against which relative item links are resolved
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Regex an item URL path must fully match to be collected
    #[serde(rename = "item-pattern")]
    pub item_pattern: String,

    /// Highest listing page number to visit
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Delay between requests to this source (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Stop fetching new documents once this many are stored
    #[serde(rename = "max-docs", default)]
    pub max_docs: Option<u64>,

    /// Documents older than this (seconds) are recrawled
    #[serde(rename = "recrawl-after-secs")]
    pub recrawl_after_secs: i64,

    /// Skip TLS certificate validation for this source family
    #[serde(rename = "accept-invalid-certs", default)]
    pub accept_invalid_certs: bool,
}
