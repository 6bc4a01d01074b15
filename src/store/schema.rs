//! Database schema definitions

/// SQL schema for the crawl-state database
pub const SCHEMA_SQL: &str = r#"
-- Fetched documents, keyed by normalized URL
CREATE TABLE IF NOT EXISTS documents (
    url TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    body BLOB NOT NULL,
    content_hash TEXT NOT NULL,
    fetched_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_source ON documents(source);
CREATE INDEX IF NOT EXISTS idx_documents_fetched_at ON documents(fetched_at);

-- Category traversal queue
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    source TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    depth INTEGER NOT NULL DEFAULT 0,
    cursor INTEGER NOT NULL DEFAULT 0,
    last_crawled INTEGER,
    UNIQUE(title, source)
);

CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
CREATE INDEX IF NOT EXISTS idx_tasks_source ON tasks(source);

-- Singleton (page, index) cursor per paginated source
CREATE TABLE IF NOT EXISTS progress (
    source TEXT PRIMARY KEY,
    page INTEGER NOT NULL DEFAULT 1,
    item_index INTEGER NOT NULL DEFAULT 0
);

-- Most recent forced-recrawl target per paginated source
CREATE TABLE IF NOT EXISTS force_refresh (
    source TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    marked_at INTEGER NOT NULL
);
"#;

/// Initializes the database schema (idempotent)
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
