//! Crawl orchestration
//!
//! The orchestrator owns the shared store handle and the cancellation
//! token, and runs one full crawl pass:
//!
//! 1. Requeue tasks stranded in `processing` by an earlier crash
//! 2. Insert seed categories (no-op if already known)
//! 3. Schedule TTL recrawls
//! 4. Spawn paginated sources as concurrent tasks
//! 5. Drain each category source's queue
//! 6. Log per-source document totals

use crate::config::{CategorySourceConfig, Config, SourceConfig};
use crate::crawler::category::{CategoryCrawler, CycleOutcome};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::lister::MediaWikiLister;
use crate::crawler::paginated::PaginatedCrawler;
use crate::crawler::recrawl::{recrawl_paginated_source, schedule_category_recrawls};
use crate::store::{SqliteStore, Store};
use crate::url::{normalize_title, title_from_url};
use crate::Result;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drives a complete crawl over every configured source
pub struct Orchestrator {
    config: Arc<Config>,
    store: Arc<Mutex<SqliteStore>>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Opens the store and prepares a crawl
    pub fn new(config: Config, cancel: CancellationToken) -> Result<Self> {
        let store = SqliteStore::new(Path::new(&config.store.database_path))?;
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(Mutex::new(store)),
            cancel,
        })
    }

    /// Runs one crawl pass across all sources
    pub async fn run(&self) -> Result<()> {
        self.repair_interrupted()?;
        self.seed_category_queues()?;

        for source in &self.config.sources {
            if let SourceConfig::Category(c) = source {
                schedule_category_recrawls(&self.store, c)?;
            }
        }

        // Paginated sources are independent of the task queue and of each
        // other; they run concurrently with the category drain below.
        let mut handles = Vec::new();
        for source in &self.config.sources {
            let p = match source {
                SourceConfig::Paginated(p) => p.clone(),
                SourceConfig::Category(_) => continue,
            };

            let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
                &self.config.crawler.user_agent,
                self.config.crawler.request_timeout_secs,
                p.accept_invalid_certs,
            )?);
            let crawler = PaginatedCrawler::new(
                self.store.clone(),
                fetcher.clone(),
                p.clone(),
                self.cancel.clone(),
            )?;
            let store = self.store.clone();
            let cancel = self.cancel.clone();

            handles.push(tokio::spawn(async move {
                if let Err(e) = recrawl_paginated_source(&store, &fetcher, &p, &cancel).await {
                    tracing::error!("Recrawl sweep for '{}' failed: {}", p.name, e);
                }
                if let Err(e) = crawler.run().await {
                    tracing::error!("Paginated source '{}' failed: {}", p.name, e);
                }
            }));
        }

        for source in &self.config.sources {
            if self.cancel.is_cancelled() {
                break;
            }
            if let SourceConfig::Category(c) = source {
                self.drain_category_source(c).await?;
            }
        }

        for handle in handles {
            let _ = handle.await;
        }

        self.log_totals()?;
        Ok(())
    }

    /// Crash recovery: no worker is running yet, so any task still in
    /// `processing` was orphaned by a previous process
    fn repair_interrupted(&self) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        for source in &self.config.sources {
            let restored = store.requeue_processing(source.name())?;
            if restored > 0 {
                tracing::info!(
                    "Requeued {} interrupted tasks for '{}'",
                    restored,
                    source.name()
                );
            }
        }
        Ok(())
    }

    /// Inserts each category source's seeds as depth-0 tasks
    fn seed_category_queues(&self) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        for source in &self.config.sources {
            let c = match source {
                SourceConfig::Category(c) => c,
                SourceConfig::Paginated(_) => continue,
            };

            for seed in &c.seeds {
                let title = title_from_url(seed, &c.page_base)?;
                let title = normalize_title(&title, &c.category_prefix);
                if store.insert_task_if_absent(&title, &c.name, 0)? {
                    tracing::info!("Seeded category '{}' for '{}'", title, c.name);
                }
            }
        }
        Ok(())
    }

    /// Claims tasks for one category source until its queue drains
    ///
    /// A failed cycle (listing error, transient network trouble) already
    /// requeued its task, so the loop just waits one delay and tries
    /// again.
    async fn drain_category_source(&self, source: &CategorySourceConfig) -> Result<()> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
            &self.config.crawler.user_agent,
            self.config.crawler.request_timeout_secs,
            false,
        )?);

        let api_client = reqwest::Client::builder()
            .user_agent(self.config.crawler.user_agent.clone())
            .timeout(Duration::from_secs(self.config.crawler.request_timeout_secs))
            .build()?;
        let lister = Arc::new(MediaWikiLister::new(
            api_client,
            &source.api_url,
            &source.category_prefix,
        ));

        let crawler = CategoryCrawler::new(
            self.store.clone(),
            fetcher,
            lister,
            source.clone(),
            self.config.crawler.max_depth,
            self.cancel.clone(),
        );

        let delay = Duration::from_millis(source.delay_ms);

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation requested, leaving '{}'", source.name);
                break;
            }

            match crawler.run_one_cycle().await {
                Ok(CycleOutcome::Worked) => {}
                Ok(CycleOutcome::QueueEmpty) => {
                    tracing::info!("Queue drained for '{}'", source.name);
                    break;
                }
                Ok(CycleOutcome::CapReached) => break,
                Err(e) => {
                    tracing::error!("Cycle failed for '{}': {}", source.name, e);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Ok(())
    }

    fn log_totals(&self) -> Result<()> {
        let store = self.store.lock().unwrap();
        for source in &self.config.sources {
            let count = store.count_by_source(source.name())?;
            tracing::info!("Source '{}': {} documents stored", source.name(), count);
        }
        Ok(())
    }
}
