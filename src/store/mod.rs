//! Durable crawl state: documents, category tasks, pagination progress
//!
//! Everything the crawler needs to survive a crash lives here. All
//! mutations are single-row atomic statements; the task claim in
//! particular is one indivisible read-modify operation, which is what lets
//! multiple workers share a queue without any other locking.

mod schema;
mod sqlite;
mod traits;

pub use schema::initialize_schema;
pub use sqlite::SqliteStore;
pub use traits::{Store, StoreError, StoreResult};

/// A stored document, keyed by normalized URL
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub url: String,
    pub source: String,
    /// Exact bytes fetched from the wire
    pub body: Vec<u8>,
    /// Hex SHA-256 of `body`
    pub content_hash: String,
    /// Unix seconds of the last fetch (changed or not)
    pub fetched_at: i64,
}

/// One category-traversal unit in the durable queue
#[derive(Debug, Clone)]
pub struct CategoryTask {
    pub id: i64,
    /// Normalized category title (no prefix, underscores for spaces)
    pub title: String,
    pub source: String,
    pub status: TaskStatus,
    /// Distance from a seed category; never regresses
    pub depth: u32,
    /// Index of the next unprocessed member, for mid-category resume
    pub cursor: u32,
    pub last_crawled: Option<i64>,
}

/// Status of a category task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Waiting to be claimed
    Pending,
    /// Claimed by a worker; reverted to pending on failure or crash
    Processing,
    /// Fully traversed; recrawl scheduling may flip it back to pending
    Done,
}

impl TaskStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Resumable position within a paginated source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    /// 1-based listing page number
    pub page: u32,
    /// Offset into the current page's item list
    pub index: u32,
}

impl Default for PageProgress {
    fn default() -> Self {
        Self { page: 1, index: 0 }
    }
}
