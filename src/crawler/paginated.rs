//! Sequential crawl of flat paginated listings
//!
//! A paginated source has no queue; its whole crawl state is one
//! (page, index) cursor. The cursor is persisted after every item, so an
//! interrupted crawl resumes mid-page. Pagination ends at `max-pages` or
//! at the first listing page that fails to fetch; a page without matching
//! items is merely skipped.

use crate::config::PaginatedSourceConfig;
use crate::crawler::extractor::ItemLinkExtractor;
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::crawler::save::{save_document, SaveOutcome};
use crate::store::{SqliteStore, Store};
use crate::Result;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Walks one paginated source front to back
pub struct PaginatedCrawler {
    store: Arc<Mutex<SqliteStore>>,
    fetcher: Arc<dyn Fetcher>,
    extractor: ItemLinkExtractor,
    source: PaginatedSourceConfig,
    cancel: CancellationToken,
}

impl PaginatedCrawler {
    pub fn new(
        store: Arc<Mutex<SqliteStore>>,
        fetcher: Arc<dyn Fetcher>,
        source: PaginatedSourceConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let extractor = ItemLinkExtractor::new(&source.base_url, &source.item_pattern)?;
        Ok(Self {
            store,
            fetcher,
            extractor,
            source,
            cancel,
        })
    }

    /// Crawls from the persisted cursor until pagination ends, the cap is
    /// hit, or cancellation
    pub async fn run(&self) -> Result<()> {
        let name = &self.source.name;
        let delay = std::time::Duration::from_millis(self.source.delay_ms);

        let progress = {
            let store = self.store.lock().unwrap();
            store.load_progress(name)?
        };

        tracing::info!(
            "Starting paginated crawl of '{}' at page {}, item {}",
            name,
            progress.page,
            progress.index
        );

        let mut start_index = progress.index as usize;

        for page in progress.page..=self.source.max_pages {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            let listing_url = self
                .source
                .page_url_template
                .replace("{page}", &page.to_string());

            let body = match self.fetcher.get(&listing_url).await {
                FetchOutcome::Success { body, .. } => body,
                FetchOutcome::HttpError { status } => {
                    tracing::info!(
                        "Listing page {} of '{}' returned HTTP {}, stopping",
                        page,
                        name,
                        status
                    );
                    return Ok(());
                }
                FetchOutcome::NetworkError { error } => {
                    tracing::warn!(
                        "Listing page {} of '{}' unreachable ({}), stopping",
                        page,
                        name,
                        error
                    );
                    return Ok(());
                }
            };

            let html = String::from_utf8_lossy(&body);
            let items = self.extractor.extract_item_links(&html);

            // A page with no matching items is not the end of the listing;
            // only a failed fetch is. Fall through to the page advance.
            tracing::debug!("Page {} of '{}': {} items", page, name, items.len());

            for (i, url) in items.iter().enumerate().skip(start_index) {
                if self.cancel.is_cancelled() {
                    return Ok(());
                }

                if let Some(cap) = self.source.max_docs {
                    let count = {
                        let store = self.store.lock().unwrap();
                        store.count_by_source(name)?
                    };
                    if count >= cap {
                        tracing::info!("Document cap ({}) reached for '{}', pausing", cap, name);
                        return Ok(());
                    }
                }

                match self.fetcher.get(url).await {
                    FetchOutcome::Success { body, .. } => {
                        let outcome = {
                            let mut store = self.store.lock().unwrap();
                            save_document(&mut *store, url, name, &body)?
                        };
                        match outcome {
                            SaveOutcome::Saved => tracing::info!("Saved {}", url),
                            SaveOutcome::Unchanged => tracing::debug!("Unchanged {}", url),
                        }
                    }
                    FetchOutcome::HttpError { status } => {
                        tracing::warn!("HTTP {} fetching {}, skipping", status, url);
                    }
                    FetchOutcome::NetworkError { error } => {
                        tracing::warn!("Network error fetching {}: {}, skipping", url, error);
                    }
                }

                // The item is settled either way; move the cursor past it.
                {
                    let mut store = self.store.lock().unwrap();
                    store.save_progress(name, page, (i + 1) as u32)?;
                }

                tokio::time::sleep(delay).await;
            }

            {
                let mut store = self.store.lock().unwrap();
                store.save_progress(name, page + 1, 0)?;
            }
            start_index = 0;
        }

        tracing::info!(
            "Reached max pages ({}) for '{}'",
            self.source.max_pages,
            name
        );
        Ok(())
    }
}
