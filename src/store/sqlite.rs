//! SQLite implementation of the store

use crate::store::schema::initialize_schema;
use crate::store::traits::{Store, StoreResult};
use crate::store::{CategoryTask, DocumentRecord, PageProgress, TaskStatus};
use crate::MagpieError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite store backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the crawl-state database at the given path
    pub fn new(path: &Path) -> Result<Self, MagpieError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, MagpieError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<CategoryTask> {
    let status_raw: String = row.get(3)?;
    let status = TaskStatus::from_db_string(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown task status '{}'", status_raw).into(),
        )
    })?;

    Ok(CategoryTask {
        id: row.get(0)?,
        title: row.get(1)?,
        source: row.get(2)?,
        status,
        depth: row.get(4)?,
        cursor: row.get(5)?,
        last_crawled: row.get(6)?,
    })
}

const TASK_COLUMNS: &str = "id, title, source, status, depth, cursor, last_crawled";

impl Store for SqliteStore {
    // ===== Documents =====

    fn find_document(&self, url: &str) -> StoreResult<Option<DocumentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, source, body, content_hash, fetched_at FROM documents WHERE url = ?1",
        )?;

        let doc = stmt
            .query_row(params![url], |row| {
                Ok(DocumentRecord {
                    url: row.get(0)?,
                    source: row.get(1)?,
                    body: row.get(2)?,
                    content_hash: row.get(3)?,
                    fetched_at: row.get(4)?,
                })
            })
            .optional()?;

        Ok(doc)
    }

    fn upsert_document(
        &mut self,
        url: &str,
        source: &str,
        body: &[u8],
        content_hash: &str,
        fetched_at: i64,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO documents (url, source, body, content_hash, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(url) DO UPDATE SET
                 source = excluded.source,
                 body = excluded.body,
                 content_hash = excluded.content_hash,
                 fetched_at = excluded.fetched_at",
            params![url, source, body, content_hash, fetched_at],
        )?;
        Ok(())
    }

    fn touch_document(&mut self, url: &str, fetched_at: i64) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE documents SET fetched_at = ?1 WHERE url = ?2",
            params![fetched_at, url],
        )?;
        Ok(())
    }

    fn count_by_source(&self, source: &str) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE source = ?1",
            params![source],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn scan_stale(&self, source: &str, before: i64) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT url FROM documents WHERE source = ?1 AND fetched_at < ?2 ORDER BY fetched_at",
        )?;

        let urls = stmt
            .query_map(params![source, before], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(urls)
    }

    // ===== Category task queue =====

    fn claim_pending_task(&mut self, source: &str) -> StoreResult<Option<CategoryTask>> {
        // Single indivisible read-modify statement; this is the only
        // coordination primitive between concurrent workers.
        let sql = format!(
            "UPDATE tasks SET status = 'processing'
             WHERE id = (SELECT id FROM tasks
                         WHERE status = 'pending' AND source = ?1
                         ORDER BY id LIMIT 1)
             RETURNING {TASK_COLUMNS}"
        );

        let task = self
            .conn
            .query_row(&sql, params![source], task_from_row)
            .optional()?;

        Ok(task)
    }

    fn insert_task_if_absent(
        &mut self,
        title: &str,
        source: &str,
        depth: u32,
    ) -> StoreResult<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO tasks (title, source, status, depth, cursor)
             VALUES (?1, ?2, 'pending', ?3, 0)
             ON CONFLICT(title, source) DO NOTHING",
            params![title, source, depth],
        )?;
        Ok(inserted > 0)
    }

    fn set_task_cursor(&mut self, task_id: i64, cursor: u32) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE tasks SET cursor = ?1 WHERE id = ?2",
            params![cursor, task_id],
        )?;
        Ok(())
    }

    fn complete_task(&mut self, task_id: i64, last_crawled: i64) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE tasks SET status = 'done', cursor = 0, last_crawled = ?1 WHERE id = ?2",
            params![last_crawled, task_id],
        )?;
        Ok(())
    }

    fn requeue_task(&mut self, task_id: i64) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE tasks SET status = 'pending' WHERE id = ?1",
            params![task_id],
        )?;
        Ok(())
    }

    fn requeue_processing(&mut self, source: &str) -> StoreResult<u64> {
        let restored = self.conn.execute(
            "UPDATE tasks SET status = 'pending' WHERE status = 'processing' AND source = ?1",
            params![source],
        )?;
        Ok(restored as u64)
    }

    fn mark_task_pending(&mut self, title: &str, source: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO tasks (title, source, status, depth, cursor)
             VALUES (?1, ?2, 'pending', 0, 0)
             ON CONFLICT(title, source) DO UPDATE SET status = 'pending'",
            params![title, source],
        )?;
        Ok(())
    }

    fn get_task(&self, title: &str, source: &str) -> StoreResult<Option<CategoryTask>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE title = ?1 AND source = ?2");

        let task = self
            .conn
            .query_row(&sql, params![title, source], task_from_row)
            .optional()?;

        Ok(task)
    }

    // ===== Paginated progress =====

    fn load_progress(&self, source: &str) -> StoreResult<PageProgress> {
        let progress = self
            .conn
            .query_row(
                "SELECT page, item_index FROM progress WHERE source = ?1",
                params![source],
                |row| {
                    Ok(PageProgress {
                        page: row.get(0)?,
                        index: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(progress.unwrap_or_default())
    }

    fn save_progress(&mut self, source: &str, page: u32, index: u32) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO progress (source, page, item_index) VALUES (?1, ?2, ?3)
             ON CONFLICT(source) DO UPDATE SET page = excluded.page,
                                               item_index = excluded.item_index",
            params![source, page, index],
        )?;
        Ok(())
    }

    // ===== Force-refresh marker =====

    fn record_force_refresh(
        &mut self,
        source: &str,
        url: &str,
        marked_at: i64,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO force_refresh (source, url, marked_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(source) DO UPDATE SET url = excluded.url,
                                               marked_at = excluded.marked_at",
            params![source, url, marked_at],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStore::new_in_memory().is_ok());
    }

    #[test]
    fn test_upsert_and_find_document() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store
            .upsert_document("https://example.com/a", "wiki", b"body", "hash1", 100)
            .unwrap();

        let doc = store.find_document("https://example.com/a").unwrap().unwrap();
        assert_eq!(doc.source, "wiki");
        assert_eq!(doc.body, b"body");
        assert_eq!(doc.content_hash, "hash1");
        assert_eq!(doc.fetched_at, 100);
    }

    #[test]
    fn test_upsert_replaces_full_record() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store
            .upsert_document("https://example.com/a", "wiki", b"old", "hash1", 100)
            .unwrap();
        store
            .upsert_document("https://example.com/a", "wiki", b"new", "hash2", 200)
            .unwrap();

        let doc = store.find_document("https://example.com/a").unwrap().unwrap();
        assert_eq!(doc.body, b"new");
        assert_eq!(doc.content_hash, "hash2");
        assert_eq!(doc.fetched_at, 200);
        assert_eq!(store.count_by_source("wiki").unwrap(), 1);
    }

    #[test]
    fn test_touch_updates_only_timestamp() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store
            .upsert_document("https://example.com/a", "wiki", b"body", "hash1", 100)
            .unwrap();
        store.touch_document("https://example.com/a", 500).unwrap();

        let doc = store.find_document("https://example.com/a").unwrap().unwrap();
        assert_eq!(doc.fetched_at, 500);
        assert_eq!(doc.body, b"body");
        assert_eq!(doc.content_hash, "hash1");
    }

    #[test]
    fn test_scan_stale_boundary() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store
            .upsert_document("https://example.com/old", "wiki", b"a", "h1", 100)
            .unwrap();
        store
            .upsert_document("https://example.com/edge", "wiki", b"b", "h2", 200)
            .unwrap();
        store
            .upsert_document("https://example.com/fresh", "wiki", b"c", "h3", 300)
            .unwrap();
        store
            .upsert_document("https://example.com/other", "news", b"d", "h4", 100)
            .unwrap();

        // Strictly-before semantics: the document fetched exactly at the
        // threshold is not stale.
        let stale = store.scan_stale("wiki", 200).unwrap();
        assert_eq!(stale, vec!["https://example.com/old".to_string()]);
    }

    #[test]
    fn test_claim_transitions_to_processing() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_task_if_absent("Physics", "wiki", 0).unwrap();

        let task = store.claim_pending_task("wiki").unwrap().unwrap();
        assert_eq!(task.title, "Physics");
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.depth, 0);
        assert_eq!(task.cursor, 0);

        let stored = store.get_task("Physics", "wiki").unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Processing);
    }

    #[test]
    fn test_claim_exclusivity() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_task_if_absent("Physics", "wiki", 0).unwrap();

        // Exactly one claim succeeds; the second observes no pending task.
        assert!(store.claim_pending_task("wiki").unwrap().is_some());
        assert!(store.claim_pending_task("wiki").unwrap().is_none());
    }

    #[test]
    fn test_claim_is_scoped_to_source() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_task_if_absent("Physics", "wiki", 0).unwrap();

        assert!(store.claim_pending_task("otherwiki").unwrap().is_none());
    }

    #[test]
    fn test_claim_is_fifo() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_task_if_absent("First", "wiki", 0).unwrap();
        store.insert_task_if_absent("Second", "wiki", 0).unwrap();

        let task = store.claim_pending_task("wiki").unwrap().unwrap();
        assert_eq!(task.title, "First");
    }

    #[test]
    fn test_insert_if_absent_never_resets_progress() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_task_if_absent("Physics", "wiki", 1).unwrap();

        let task = store.claim_pending_task("wiki").unwrap().unwrap();
        store.set_task_cursor(task.id, 7).unwrap();

        // Re-discovery of the same subcategory must be a no-op.
        let created = store.insert_task_if_absent("Physics", "wiki", 3).unwrap();
        assert!(!created);

        let stored = store.get_task("Physics", "wiki").unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Processing);
        assert_eq!(stored.cursor, 7);
        assert_eq!(stored.depth, 1);
    }

    #[test]
    fn test_complete_task_resets_cursor() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_task_if_absent("Physics", "wiki", 0).unwrap();
        let task = store.claim_pending_task("wiki").unwrap().unwrap();
        store.set_task_cursor(task.id, 12).unwrap();

        store.complete_task(task.id, 999).unwrap();

        let stored = store.get_task("Physics", "wiki").unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Done);
        assert_eq!(stored.cursor, 0);
        assert_eq!(stored.last_crawled, Some(999));
    }

    #[test]
    fn test_requeue_task_keeps_cursor() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_task_if_absent("Physics", "wiki", 0).unwrap();
        let task = store.claim_pending_task("wiki").unwrap().unwrap();
        store.set_task_cursor(task.id, 4).unwrap();

        store.requeue_task(task.id).unwrap();

        let stored = store.get_task("Physics", "wiki").unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
        assert_eq!(stored.cursor, 4);
    }

    #[test]
    fn test_requeue_processing_repairs_crashed_tasks() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_task_if_absent("A", "wiki", 0).unwrap();
        store.insert_task_if_absent("B", "wiki", 0).unwrap();
        store.claim_pending_task("wiki").unwrap();
        store.claim_pending_task("wiki").unwrap();

        let restored = store.requeue_processing("wiki").unwrap();
        assert_eq!(restored, 2);
        assert!(store.claim_pending_task("wiki").unwrap().is_some());
    }

    #[test]
    fn test_mark_task_pending_flips_done_without_reset() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_task_if_absent("Physics", "wiki", 2).unwrap();
        let task = store.claim_pending_task("wiki").unwrap().unwrap();
        store.complete_task(task.id, 100).unwrap();

        store.mark_task_pending("Physics", "wiki").unwrap();

        let stored = store.get_task("Physics", "wiki").unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
        assert_eq!(stored.depth, 2); // depth untouched by recrawl
    }

    #[test]
    fn test_mark_task_pending_creates_when_absent() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.mark_task_pending("Unknown", "wiki").unwrap();

        let stored = store.get_task("Unknown", "wiki").unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
        assert_eq!(stored.depth, 0);
        assert_eq!(stored.cursor, 0);
    }

    #[test]
    fn test_unknown_status_string_is_an_error() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_task_if_absent("Physics", "wiki", 0).unwrap();

        store
            .conn
            .execute("UPDATE tasks SET status = 'zombie'", [])
            .unwrap();

        // Corrupted rows surface instead of masquerading as pending.
        assert!(store.get_task("Physics", "wiki").is_err());
    }

    #[test]
    fn test_progress_defaults_to_first_page() {
        let store = SqliteStore::new_in_memory().unwrap();
        let progress = store.load_progress("news").unwrap();
        assert_eq!(progress, PageProgress { page: 1, index: 0 });
    }

    #[test]
    fn test_progress_round_trip() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.save_progress("news", 3, 5).unwrap();
        store.save_progress("articles", 1, 2).unwrap();

        assert_eq!(
            store.load_progress("news").unwrap(),
            PageProgress { page: 3, index: 5 }
        );
        assert_eq!(
            store.load_progress("articles").unwrap(),
            PageProgress { page: 1, index: 2 }
        );
    }

    #[test]
    fn test_force_refresh_is_singleton_per_source() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store
            .record_force_refresh("news", "https://example.com/1", 10)
            .unwrap();
        store
            .record_force_refresh("news", "https://example.com/2", 20)
            .unwrap();

        let (url, marked_at): (String, i64) = store
            .conn
            .query_row(
                "SELECT url, marked_at FROM force_refresh WHERE source = 'news'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(url, "https://example.com/2");
        assert_eq!(marked_at, 20);
    }
}
