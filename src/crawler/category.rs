//! Depth-limited category traversal through the durable task queue
//!
//! One *cycle* is: claim a pending task, list the category's members, walk
//! them from the persisted cursor, mark the task done. Each claimed task
//! is wrapped in a [`ClaimGuard`] so that any exit short of completion
//! (error, cancellation, cap, panic) puts the task back in the queue with
//! its cursor intact.

use crate::config::CategorySourceConfig;
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::crawler::lister::{DirectoryLister, MemberKind};
use crate::crawler::save::{save_document, SaveOutcome};
use crate::store::{SqliteStore, Store};
use crate::url::{normalize_title, page_url};
use crate::Result;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Why a cycle stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A task was claimed and processed (possibly partially, on
    /// cancellation)
    Worked,
    /// No pending task exists for this source
    QueueEmpty,
    /// The source's document cap is reached; the claimed task went back to
    /// pending
    CapReached,
}

/// Puts a claimed task back to pending unless the cycle completes it
///
/// Holding the guard is what makes the claim safe: the task can only leave
/// the processing state through `complete` or through the Drop requeue.
struct ClaimGuard {
    store: Arc<Mutex<SqliteStore>>,
    task_id: i64,
    defused: bool,
}

impl ClaimGuard {
    fn new(store: Arc<Mutex<SqliteStore>>, task_id: i64) -> Self {
        Self {
            store,
            task_id,
            defused: false,
        }
    }

    /// Marks the task done and disarms the requeue
    fn complete(mut self, last_crawled: i64) -> Result<()> {
        self.defused = true;
        let mut store = self.store.lock().unwrap();
        store.complete_task(self.task_id, last_crawled)?;
        Ok(())
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if self.defused {
            return;
        }
        let mut store = match self.store.lock() {
            Ok(store) => store,
            Err(_) => return,
        };
        if let Err(e) = store.requeue_task(self.task_id) {
            tracing::error!("Failed to requeue task {}: {}", self.task_id, e);
        }
    }
}

/// Walks one category source's task queue
pub struct CategoryCrawler {
    store: Arc<Mutex<SqliteStore>>,
    fetcher: Arc<dyn Fetcher>,
    lister: Arc<dyn DirectoryLister>,
    source: CategorySourceConfig,
    max_depth: u32,
    cancel: CancellationToken,
}

impl CategoryCrawler {
    pub fn new(
        store: Arc<Mutex<SqliteStore>>,
        fetcher: Arc<dyn Fetcher>,
        lister: Arc<dyn DirectoryLister>,
        source: CategorySourceConfig,
        max_depth: u32,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            fetcher,
            lister,
            source,
            max_depth,
            cancel,
        }
    }

    /// Claims and processes one category task
    ///
    /// Fetch failures on individual pages are logged and skipped; a
    /// listing failure aborts the cycle with an error and the task is
    /// requeued by the guard.
    pub async fn run_one_cycle(&self) -> Result<CycleOutcome> {
        let task = {
            let mut store = self.store.lock().unwrap();
            store.claim_pending_task(&self.source.name)?
        };

        let task = match task {
            Some(task) => task,
            None => return Ok(CycleOutcome::QueueEmpty),
        };

        tracing::info!(
            "Crawling category '{}' (depth {}, cursor {})",
            task.title,
            task.depth,
            task.cursor
        );

        let guard = ClaimGuard::new(self.store.clone(), task.id);

        let members = self.lister.list_members(&task.title).await?;
        let delay = std::time::Duration::from_millis(self.source.delay_ms);

        for (i, member) in members.iter().enumerate().skip(task.cursor as usize) {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancelled inside category '{}'", task.title);
                return Ok(CycleOutcome::Worked);
            }

            // Persist the cursor before touching the member, so a crash
            // resumes here at worst.
            {
                let mut store = self.store.lock().unwrap();
                store.set_task_cursor(task.id, i as u32)?;
            }

            tokio::time::sleep(delay).await;

            match member.kind {
                MemberKind::Page => {
                    if let Some(cap) = self.source.max_docs {
                        let count = {
                            let store = self.store.lock().unwrap();
                            store.count_by_source(&self.source.name)?
                        };
                        if count >= cap {
                            tracing::info!(
                                "Document cap ({}) reached for '{}', pausing",
                                cap,
                                self.source.name
                            );
                            return Ok(CycleOutcome::CapReached);
                        }
                    }

                    let title = normalize_title(&member.title, &self.source.category_prefix);
                    let url = page_url(&self.source.page_base, &title);

                    match self.fetcher.get(&url).await {
                        FetchOutcome::Success { body, .. } => {
                            let outcome = {
                                let mut store = self.store.lock().unwrap();
                                save_document(&mut *store, &url, &self.source.name, &body)?
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
                }

                MemberKind::Subcategory => {
                    if task.depth >= self.max_depth {
                        tracing::debug!(
                            "Skipping subcategory '{}' beyond depth {}",
                            member.title,
                            self.max_depth
                        );
                        continue;
                    }

                    let title = normalize_title(&member.title, &self.source.category_prefix);
                    let created = {
                        let mut store = self.store.lock().unwrap();
                        store.insert_task_if_absent(&title, &self.source.name, task.depth + 1)?
                    };
                    if created {
                        tracing::debug!(
                            "Queued subcategory '{}' at depth {}",
                            title,
                            task.depth + 1
                        );
                    }
                }
            }
        }

        guard.complete(Utc::now().timestamp())?;
        tracing::info!("Completed category '{}'", task.title);

        Ok(CycleOutcome::Worked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::lister::Member;
    use crate::store::TaskStatus;
    use crate::{MagpieError, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapFetcher {
        bodies: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn get(&self, url: &str) -> FetchOutcome {
            match self.bodies.get(url) {
                Some(body) => FetchOutcome::Success {
                    status: 200,
                    body: body.clone(),
                },
                None => FetchOutcome::HttpError { status: 404 },
            }
        }
    }

    struct MapLister {
        members: HashMap<String, Vec<Member>>,
    }

    #[async_trait]
    impl DirectoryLister for MapLister {
        async fn list_members(&self, category_title: &str) -> Result<Vec<Member>> {
            self.members
                .get(category_title)
                .cloned()
                .ok_or_else(|| MagpieError::Listing {
                    category: category_title.to_string(),
                    message: "unknown category".to_string(),
                })
        }
    }

    fn test_source(max_docs: Option<u64>) -> CategorySourceConfig {
        CategorySourceConfig {
            name: "wiki".to_string(),
            api_url: "https://wiki.test/w/api.php".to_string(),
            page_base: "https://wiki.test/wiki/".to_string(),
            category_prefix: "Category:".to_string(),
            delay_ms: 0,
            max_docs,
            recrawl_after_secs: 86400,
            seeds: vec!["https://wiki.test/wiki/Category:Root".to_string()],
        }
    }

    fn page(title: &str) -> Member {
        Member {
            title: title.to_string(),
            kind: MemberKind::Page,
        }
    }

    fn subcat(title: &str) -> Member {
        Member {
            title: title.to_string(),
            kind: MemberKind::Subcategory,
        }
    }

    fn build_crawler(
        members: HashMap<String, Vec<Member>>,
        bodies: HashMap<String, Vec<u8>>,
        source: CategorySourceConfig,
        max_depth: u32,
        cancel: CancellationToken,
    ) -> (CategoryCrawler, Arc<Mutex<SqliteStore>>) {
        let store = Arc::new(Mutex::new(SqliteStore::new_in_memory().unwrap()));
        let crawler = CategoryCrawler::new(
            store.clone(),
            Arc::new(MapFetcher { bodies }),
            Arc::new(MapLister { members }),
            source,
            max_depth,
            cancel,
        );
        (crawler, store)
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let (crawler, _store) = build_crawler(
            HashMap::new(),
            HashMap::new(),
            test_source(None),
            2,
            CancellationToken::new(),
        );

        let outcome = crawler.run_one_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::QueueEmpty);
    }

    #[tokio::test]
    async fn test_full_cycle_saves_pages_and_queues_subcategories() {
        let members = HashMap::from([(
            "Root".to_string(),
            vec![page("Alpha Beta"), subcat("Category:Nested"), page("Gamma")],
        )]);
        let bodies = HashMap::from([
            (
                "https://wiki.test/wiki/Alpha_Beta".to_string(),
                b"alpha".to_vec(),
            ),
            (
                "https://wiki.test/wiki/Gamma".to_string(),
                b"gamma".to_vec(),
            ),
        ]);

        let (crawler, store) = build_crawler(
            members,
            bodies,
            test_source(None),
            2,
            CancellationToken::new(),
        );
        {
            let mut store = store.lock().unwrap();
            store.insert_task_if_absent("Root", "wiki", 0).unwrap();
        }

        let outcome = crawler.run_one_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Worked);

        let store = store.lock().unwrap();
        assert_eq!(store.count_by_source("wiki").unwrap(), 2);
        assert!(store
            .find_document("https://wiki.test/wiki/Alpha_Beta")
            .unwrap()
            .is_some());

        let root = store.get_task("Root", "wiki").unwrap().unwrap();
        assert_eq!(root.status, TaskStatus::Done);
        assert_eq!(root.cursor, 0);
        assert!(root.last_crawled.is_some());

        let nested = store.get_task("Nested", "wiki").unwrap().unwrap();
        assert_eq!(nested.status, TaskStatus::Pending);
        assert_eq!(nested.depth, 1);
    }

    #[tokio::test]
    async fn test_subcategory_beyond_max_depth_is_not_queued() {
        let members = HashMap::from([(
            "Deep".to_string(),
            vec![subcat("Category:Deeper")],
        )]);

        let (crawler, store) = build_crawler(
            members,
            HashMap::new(),
            test_source(None),
            1,
            CancellationToken::new(),
        );
        {
            let mut store = store.lock().unwrap();
            store.insert_task_if_absent("Deep", "wiki", 1).unwrap();
        }

        crawler.run_one_cycle().await.unwrap();

        let store = store.lock().unwrap();
        assert!(store.get_task("Deeper", "wiki").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cap_requeues_task_with_cursor() {
        let members = HashMap::from([(
            "Root".to_string(),
            vec![page("First"), page("Second")],
        )]);
        let bodies = HashMap::from([(
            "https://wiki.test/wiki/First".to_string(),
            b"first".to_vec(),
        )]);

        let (crawler, store) = build_crawler(
            members,
            bodies,
            test_source(Some(1)),
            2,
            CancellationToken::new(),
        );
        {
            let mut store = store.lock().unwrap();
            store.insert_task_if_absent("Root", "wiki", 0).unwrap();
        }

        let outcome = crawler.run_one_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::CapReached);

        let store = store.lock().unwrap();
        assert_eq!(store.count_by_source("wiki").unwrap(), 1);

        // Second member is still owed; the task is pending at cursor 1.
        let root = store.get_task("Root", "wiki").unwrap().unwrap();
        assert_eq!(root.status, TaskStatus::Pending);
        assert_eq!(root.cursor, 1);
    }

    #[tokio::test]
    async fn test_listing_failure_requeues_task() {
        let (crawler, store) = build_crawler(
            HashMap::new(),
            HashMap::new(),
            test_source(None),
            2,
            CancellationToken::new(),
        );
        {
            let mut store = store.lock().unwrap();
            store.insert_task_if_absent("Root", "wiki", 0).unwrap();
        }

        assert!(crawler.run_one_cycle().await.is_err());

        let store = store.lock().unwrap();
        let root = store.get_task("Root", "wiki").unwrap().unwrap();
        assert_eq!(root.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_page_but_completes() {
        let members = HashMap::from([(
            "Root".to_string(),
            vec![page("Missing"), page("Present")],
        )]);
        let bodies = HashMap::from([(
            "https://wiki.test/wiki/Present".to_string(),
            b"present".to_vec(),
        )]);

        let (crawler, store) = build_crawler(
            members,
            bodies,
            test_source(None),
            2,
            CancellationToken::new(),
        );
        {
            let mut store = store.lock().unwrap();
            store.insert_task_if_absent("Root", "wiki", 0).unwrap();
        }

        let outcome = crawler.run_one_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Worked);

        let store = store.lock().unwrap();
        assert_eq!(store.count_by_source("wiki").unwrap(), 1);
        let root = store.get_task("Root", "wiki").unwrap().unwrap();
        assert_eq!(root.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_cancellation_requeues_with_cursor() {
        let members = HashMap::from([("Root".to_string(), vec![page("First")])]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (crawler, store) = build_crawler(
            members,
            HashMap::new(),
            test_source(None),
            2,
            cancel,
        );
        {
            let mut store = store.lock().unwrap();
            store.insert_task_if_absent("Root", "wiki", 0).unwrap();
        }

        let outcome = crawler.run_one_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Worked);

        let store = store.lock().unwrap();
        let root = store.get_task("Root", "wiki").unwrap().unwrap();
        assert_eq!(root.status, TaskStatus::Pending);
        assert_eq!(root.cursor, 0);
    }

    #[tokio::test]
    async fn test_resume_from_cursor_skips_processed_members() {
        let members = HashMap::from([(
            "Root".to_string(),
            vec![page("First"), page("Second")],
        )]);
        let bodies = HashMap::from([
            (
                "https://wiki.test/wiki/First".to_string(),
                b"first".to_vec(),
            ),
            (
                "https://wiki.test/wiki/Second".to_string(),
                b"second".to_vec(),
            ),
        ]);

        let (crawler, store) = build_crawler(
            members,
            bodies,
            test_source(None),
            2,
            CancellationToken::new(),
        );
        {
            let mut store = store.lock().unwrap();
            store.insert_task_if_absent("Root", "wiki", 0).unwrap();
            let task = store.claim_pending_task("wiki").unwrap().unwrap();
            store.set_task_cursor(task.id, 1).unwrap();
            store.requeue_task(task.id).unwrap();
        }

        crawler.run_one_cycle().await.unwrap();

        let store = store.lock().unwrap();
        // Only the member at the cursor onwards was fetched.
        assert!(store
            .find_document("https://wiki.test/wiki/First")
            .unwrap()
            .is_none());
        assert!(store
            .find_document("https://wiki.test/wiki/Second")
            .unwrap()
            .is_some());
    }
}
