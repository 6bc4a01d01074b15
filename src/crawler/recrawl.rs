//! TTL-based recrawl scheduling
//!
//! Documents carry a `fetched_at` stamp; anything older than the source's
//! `recrawl-after-secs` is stale. For category sources staleness turns
//! into pending tasks and the normal queue machinery does the refetch. For
//! paginated sources there is no queue, so stale documents are refetched
//! on the spot.

use crate::config::{CategorySourceConfig, PaginatedSourceConfig};
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::crawler::save::save_document;
use crate::store::{SqliteStore, Store};
use crate::url::{normalize_title, title_from_url};
use crate::Result;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Flips stale documents of a category source back into pending tasks
///
/// Returns how many tasks were scheduled.
pub fn schedule_category_recrawls(
    store: &Arc<Mutex<SqliteStore>>,
    source: &CategorySourceConfig,
) -> Result<u64> {
    let cutoff = Utc::now().timestamp() - source.recrawl_after_secs;

    let stale = {
        let store = store.lock().unwrap();
        store.scan_stale(&source.name, cutoff)?
    };

    let mut scheduled = 0;
    for url in stale {
        let title = match title_from_url(&url, &source.page_base) {
            Ok(title) => title,
            Err(e) => {
                tracing::warn!("Cannot derive a task from stale document {}: {}", url, e);
                continue;
            }
        };
        let title = normalize_title(&title, &source.category_prefix);

        {
            let mut store = store.lock().unwrap();
            store.mark_task_pending(&title, &source.name)?;
        }
        scheduled += 1;
    }

    if scheduled > 0 {
        tracing::info!(
            "Scheduled {} recrawl tasks for '{}'",
            scheduled,
            source.name
        );
    }

    Ok(scheduled)
}

/// Refetches stale documents of a paginated source immediately
///
/// Returns how many documents were refetched.
pub async fn recrawl_paginated_source(
    store: &Arc<Mutex<SqliteStore>>,
    fetcher: &Arc<dyn Fetcher>,
    source: &PaginatedSourceConfig,
    cancel: &CancellationToken,
) -> Result<u64> {
    let cutoff = Utc::now().timestamp() - source.recrawl_after_secs;
    let delay = std::time::Duration::from_millis(source.delay_ms);

    let stale = {
        let store = store.lock().unwrap();
        store.scan_stale(&source.name, cutoff)?
    };

    if stale.is_empty() {
        return Ok(0);
    }

    tracing::info!(
        "Refreshing {} stale documents of '{}'",
        stale.len(),
        source.name
    );

    let mut refreshed = 0;
    for url in stale {
        if cancel.is_cancelled() {
            break;
        }

        {
            let mut store = store.lock().unwrap();
            store.record_force_refresh(&source.name, &url, Utc::now().timestamp())?;
        }

        match fetcher.get(&url).await {
            FetchOutcome::Success { body, .. } => {
                {
                    let mut store = store.lock().unwrap();
                    save_document(&mut *store, &url, &source.name, &body)?;
                }
                refreshed += 1;
            }
            FetchOutcome::HttpError { status } => {
                tracing::warn!("HTTP {} refreshing {}, skipping", status, url);
            }
            FetchOutcome::NetworkError { error } => {
                tracing::warn!("Network error refreshing {}: {}, skipping", url, error);
            }
        }

        tokio::time::sleep(delay).await;
    }

    Ok(refreshed)
}
