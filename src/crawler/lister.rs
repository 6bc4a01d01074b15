//! Category member listings via the MediaWiki API
//!
//! A category's contents come from `list=categorymembers`, which pages its
//! results through an opaque continuation token. [`MediaWikiLister`]
//! follows the token until the API stops returning one, so the crawl loop
//! always sees the complete member list in a stable order.

use crate::{MagpieError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Namespace of regular article pages
const NS_PAGE: i64 = 0;
/// Namespace of category pages
const NS_SUBCATEGORY: i64 = 14;

/// How many members to request per API call
const MEMBERS_PER_REQUEST: u32 = 500;

/// What a category member is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// An article page to fetch and store
    Page,
    /// A nested category to enqueue for traversal
    Subcategory,
}

/// One entry in a category's member list
#[derive(Debug, Clone)]
pub struct Member {
    /// Title as reported by the API (spaces, no percent-encoding)
    pub title: String,
    pub kind: MemberKind,
}

/// Source of category member listings
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// Returns every member of the category, pages and subcategories both,
    /// in the order the directory reports them
    async fn list_members(&self, category_title: &str) -> Result<Vec<Member>>;
}

/// Lister backed by a live MediaWiki API endpoint
pub struct MediaWikiLister {
    client: reqwest::Client,
    api_url: String,
    category_prefix: String,
}

impl MediaWikiLister {
    pub fn new(client: reqwest::Client, api_url: &str, category_prefix: &str) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            category_prefix: category_prefix.to_string(),
        }
    }
}

#[async_trait]
impl DirectoryLister for MediaWikiLister {
    async fn list_members(&self, category_title: &str) -> Result<Vec<Member>> {
        let cmtitle = format!("{}{}", self.category_prefix, category_title);
        let limit = MEMBERS_PER_REQUEST.to_string();

        let mut params: BTreeMap<String, String> = BTreeMap::new();
        params.insert("action".to_string(), "query".to_string());
        params.insert("list".to_string(), "categorymembers".to_string());
        params.insert("cmtitle".to_string(), cmtitle);
        params.insert("cmtype".to_string(), "page|subcat".to_string());
        params.insert("cmlimit".to_string(), limit);
        params.insert("format".to_string(), "json".to_string());

        let mut members = Vec::new();

        loop {
            let response = self
                .client
                .get(&self.api_url)
                .query(&params)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(MagpieError::Listing {
                    category: category_title.to_string(),
                    message: format!("API returned HTTP {}", response.status().as_u16()),
                });
            }

            let data: Value = response.json().await?;

            if let Some(error) = data.get("error") {
                return Err(MagpieError::Listing {
                    category: category_title.to_string(),
                    message: error.to_string(),
                });
            }

            members.extend(members_from_response(&data));

            // The API hands back a set of key/value pairs to echo on the
            // next request; its absence means the listing is complete.
            match data.get("continue").and_then(Value::as_object) {
                Some(continuation) => {
                    for (key, value) in continuation {
                        let value = match value {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        params.insert(key.clone(), value);
                    }
                }
                None => break,
            }
        }

        Ok(members)
    }
}

/// Pulls the member entries out of one API response page
fn members_from_response(data: &Value) -> Vec<Member> {
    let entries = match data
        .pointer("/query/categorymembers")
        .and_then(Value::as_array)
    {
        Some(entries) => entries,
        None => return Vec::new(),
    };

    entries
        .iter()
        .filter_map(|entry| {
            let title = entry.get("title")?.as_str()?.to_string();
            let kind = match entry.get("ns")?.as_i64()? {
                NS_PAGE => MemberKind::Page,
                NS_SUBCATEGORY => MemberKind::Subcategory,
                _ => return None,
            };
            Some(Member { title, kind })
        })
        .collect()
}
