//! Change-aware document persistence
//!
//! Every fetched body funnels through [`save_document`], which compares
//! the content hash against what the store already holds. An unchanged
//! document only gets its `fetched_at` refreshed; anything else is a full
//! upsert. This is the single point that keeps re-fetches cheap and makes
//! the recrawl sweep idempotent.

use crate::fingerprint::{fingerprint, has_changed};
use crate::store::Store;
use crate::Result;
use chrono::Utc;

/// What saving a fetched body did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// New document, or content changed since the last fetch
    Saved,
    /// Content identical to the stored copy; only `fetched_at` moved
    Unchanged,
}

/// Saves a fetched document body under its normalized URL
pub fn save_document(
    store: &mut dyn Store,
    url: &str,
    source: &str,
    body: &[u8],
) -> Result<SaveOutcome> {
    let hash = fingerprint(body);
    let now = Utc::now().timestamp();

    match store.find_document(url)? {
        Some(existing) if !has_changed(&existing.content_hash, &hash) => {
            store.touch_document(url, now)?;
            Ok(SaveOutcome::Unchanged)
        }
        _ => {
            store.upsert_document(url, source, body, &hash, now)?;
            Ok(SaveOutcome::Saved)
        }
    }
}
