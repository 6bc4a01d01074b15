//! Store trait and error types

use crate::store::{CategoryTask, DocumentRecord, PageProgress};
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for the durable crawl-state backend
///
/// Implementations must make every mutation atomic per row; concurrent
/// writers to the same document key converge to last-writer-wins with no
/// partial record.
pub trait Store {
    // ===== Documents =====

    /// Looks up a document by its normalized URL
    fn find_document(&self, url: &str) -> StoreResult<Option<DocumentRecord>>;

    /// Inserts or fully replaces a document record (content, hash,
    /// timestamp, and source)
    fn upsert_document(
        &mut self,
        url: &str,
        source: &str,
        body: &[u8],
        content_hash: &str,
        fetched_at: i64,
    ) -> StoreResult<()>;

    /// Metadata-only update of `fetched_at`; the stored body and hash are
    /// untouched
    fn touch_document(&mut self, url: &str, fetched_at: i64) -> StoreResult<()>;

    /// Counts documents stored for a source (cap enforcement)
    fn count_by_source(&self, source: &str) -> StoreResult<u64>;

    /// Returns the URLs of documents for `source` last fetched strictly
    /// before `before` (unix seconds)
    fn scan_stale(&self, source: &str, before: i64) -> StoreResult<Vec<String>>;

    // ===== Category task queue =====

    /// Atomically claims one pending task for the source, transitioning it
    /// to processing in the same operation
    ///
    /// Returns None when the queue has no pending task for the source.
    fn claim_pending_task(&mut self, source: &str) -> StoreResult<Option<CategoryTask>>;

    /// Inserts a pending task at the given depth unless a task with the
    /// same (title, source) already exists
    ///
    /// Returns true if a new task was created. Re-discovering an existing
    /// task never resets its status, depth, or cursor.
    fn insert_task_if_absent(&mut self, title: &str, source: &str, depth: u32)
        -> StoreResult<bool>;

    /// Persists the member cursor of a claimed task
    fn set_task_cursor(&mut self, task_id: i64, cursor: u32) -> StoreResult<()>;

    /// Marks a task done: cursor reset to 0, `last_crawled` stamped
    fn complete_task(&mut self, task_id: i64, last_crawled: i64) -> StoreResult<()>;

    /// Reverts a task to pending, keeping its cursor and depth
    fn requeue_task(&mut self, task_id: i64) -> StoreResult<()>;

    /// Crash recovery: flips every processing task of the source back to
    /// pending; returns how many were restored
    fn requeue_processing(&mut self, source: &str) -> StoreResult<u64>;

    /// Recrawl scheduling: flips the (title, source) task to pending,
    /// creating it at depth 0 if absent; an existing task keeps its depth
    /// and cursor
    fn mark_task_pending(&mut self, title: &str, source: &str) -> StoreResult<()>;

    /// Looks up a task by its unique (title, source) key
    fn get_task(&self, title: &str, source: &str) -> StoreResult<Option<CategoryTask>>;

    // ===== Paginated progress =====

    /// Loads the (page, index) cursor for a paginated source, defaulting
    /// to (1, 0) on first run
    fn load_progress(&self, source: &str) -> StoreResult<PageProgress>;

    /// Persists the (page, index) cursor; called after every single item
    fn save_progress(&mut self, source: &str, page: u32, index: u32) -> StoreResult<()>;

    // ===== Force-refresh marker =====

    /// Records the URL most recently selected for an immediate recrawl of
    /// a paginated source (audit breadcrumb only)
    fn record_force_refresh(&mut self, source: &str, url: &str, marked_at: i64)
        -> StoreResult<()>;
}
