//! Crawling logic for both source kinds
//!
//! This module contains the moving parts of the crawl:
//! - HTTP fetching behind the [`Fetcher`] trait
//! - Category member listings behind the [`DirectoryLister`] trait
//! - Item link extraction for paginated listings
//! - Change-aware document persistence
//! - The category and paginated crawl loops
//! - TTL recrawl scheduling and overall orchestration

mod category;
mod extractor;
mod fetcher;
mod lister;
mod orchestrator;
mod paginated;
mod recrawl;
mod save;

pub use category::{CategoryCrawler, CycleOutcome};
pub use extractor::ItemLinkExtractor;
pub use fetcher::{FetchOutcome, Fetcher, HttpFetcher};
pub use lister::{DirectoryLister, MediaWikiLister, Member, MemberKind};
pub use orchestrator::Orchestrator;
pub use paginated::PaginatedCrawler;
pub use recrawl::{recrawl_paginated_source, schedule_category_recrawls};
pub use save::{save_document, SaveOutcome};

use crate::config::Config;
use crate::Result;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl pass over every configured source
///
/// The token makes shutdown cooperative: cancelling it lets in-flight
/// items finish, persists every cursor, and returns cleanly.
pub async fn run_crawl(config: Config, cancel: CancellationToken) -> Result<()> {
    let orchestrator = Orchestrator::new(config, cancel)?;
    orchestrator.run().await
}
