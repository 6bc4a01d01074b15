//! Wiki title helpers
//!
//! Category tasks are keyed by a normalized title: no category prefix,
//! spaces replaced with underscores. Page URLs and stale-document URLs are
//! translated to and from that form here.

use crate::UrlError;

/// Normalizes a wiki title: trims whitespace, strips the category prefix
/// if present, and replaces spaces with underscores.
pub fn normalize_title(title: &str, category_prefix: &str) -> String {
    let title = title.trim();
    let title = title.strip_prefix(category_prefix).unwrap_or(title);
    title.replace(' ', "_")
}

/// Builds the article URL for a normalized title under the given page base
/// (e.g. `https://ru.wikipedia.org/wiki/`).
pub fn page_url(page_base: &str, title: &str) -> String {
    format!("{}{}", page_base, urlencoding::encode(title))
}

/// Translates a document URL back into a title by stripping the page base
/// and percent-decoding the remainder.
///
/// Inverse of [`page_url`]; used for seed insertion and recrawl
/// scheduling.
pub fn title_from_url(url: &str, page_base: &str) -> Result<String, UrlError> {
    let rest = url
        .strip_prefix(page_base)
        .ok_or_else(|| UrlError::NotUnderBase {
            url: url.to_string(),
            base: page_base.to_string(),
        })?;

    let decoded = urlencoding::decode(rest).map_err(|e| UrlError::Parse(e.to_string()))?;
    Ok(decoded.into_owned())
}
