//! Item link extraction for paginated listing pages
//!
//! A listing page is just HTML with anchors; which anchors count as
//! "items" differs per source, so each paginated source configures a path
//! regex. Everything else (resolution against the base URL, host check,
//! normalization, dedup) is the same for all of them.

use crate::url::normalize_url;
use crate::{MagpieError, Result};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts item links from a paginated source's listing pages
#[derive(Debug)]
pub struct ItemLinkExtractor {
    base: Url,
    pattern: Regex,
}

impl ItemLinkExtractor {
    /// Compiles the extractor for one source
    ///
    /// `item_pattern` is matched against the path of each resolved link;
    /// anchors belong in the pattern itself (configs typically use
    /// `^...$`).
    pub fn new(base_url: &str, item_pattern: &str) -> Result<Self> {
        let base = Url::parse(base_url)?;
        let pattern = Regex::new(item_pattern).map_err(|e| MagpieError::ItemPattern {
            pattern: item_pattern.to_string(),
            source: e,
        })?;

        Ok(Self { base, pattern })
    }

    /// Returns the normalized item URLs found on a listing page, in
    /// document order, with duplicates removed
    ///
    /// Links that fail to resolve, point at another host, or don't match
    /// the item pattern are silently dropped.
    pub fn extract_item_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let anchor_selector =
            Selector::parse("a[href]").expect("anchor selector is statically valid");

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&anchor_selector) {
            let href = match element.value().attr("href") {
                Some(href) => href,
                None => continue,
            };

            let resolved = match self.base.join(href) {
                Ok(url) => url,
                Err(_) => continue,
            };

            let normalized = match normalize_url(resolved.as_str()) {
                Ok(url) => url,
                Err(_) => continue,
            };

            if normalized.host_str() != self.base.host_str() {
                continue;
            }

            if !self.pattern.is_match(normalized.path()) {
                continue;
            }

            let url_string = normalized.to_string();
            if seen.insert(url_string.clone()) {
                links.push(url_string);
            }
        }

        links
    }
}
