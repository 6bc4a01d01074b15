//! URL normalization and wiki title handling
//!
//! Normalized URLs are the unique keys of the document store, so every URL
//! must pass through `normalize_url` before it is fetched or stored.

mod normalize;
mod title;

pub use normalize::normalize_url;
pub use title::{normalize_title, page_url, title_from_url};
