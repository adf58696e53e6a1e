//! HTTP client for the source API
//!
//! The source answers in one of three shapes:
//!
//! ```text
//! {"results": [...], "next": "https://..."}   paginated
//! [{...}, {...}]                              full list in one response
//! {...}                                       single object
//! ```
//!
//! The shape is decided once per response by [`Page::classify`]; anything else
//! is a fatal [`EtlError::UnexpectedShape`].

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::Record;
use crate::error::{EtlError, Result};

/// Per-request ceiling for source API calls, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Transport used by the fetcher and the reference resolver.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    /// GET `url` and decode the body as JSON.
    async fn get_json(&self, url: &str) -> Result<Value>;
}

/// [`JsonFetcher`] backed by `reqwest`
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("swapi-etl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

/// One decoded response from the source API
#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Paginated {
        results: Vec<Record>,
        next: Option<String>,
    },
    List(Vec<Record>),
    Single(Record),
}

impl Page {
    /// Classify a response body fetched from `url`.
    pub fn classify(url: &str, body: Value) -> Result<Self> {
        match body {
            Value::Object(mut object) if object.contains_key("results") => {
                let results = match object.remove("results") {
                    Some(Value::Array(items)) => into_records(url, items)?,
                    Some(other) => {
                        return Err(EtlError::unexpected_shape(
                            url,
                            format!("'results' holding {}", kind_of(&other)),
                        ))
                    },
                    None => Vec::new(),
                };
                let next = match object.remove("next") {
                    Some(Value::String(next)) if !next.is_empty() => Some(next),
                    _ => None,
                };
                Ok(Page::Paginated { results, next })
            },
            Value::Array(items) => Ok(Page::List(into_records(url, items)?)),
            Value::Object(object) => Ok(Page::Single(object)),
            other => Err(EtlError::unexpected_shape(url, kind_of(&other))),
        }
    }
}

fn into_records(url: &str, items: Vec<Value>) -> Result<Vec<Record>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            other => Err(EtlError::unexpected_shape(
                url,
                format!("record of type {}", kind_of(&other)),
            )),
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Fetch every record reachable from `root_url`, following `next` links.
///
/// Records repeated verbatim across pages are kept once, in first-seen order.
/// Transport errors abort the fetch.
#[instrument(skip(fetcher))]
pub async fn fetch_all_pages(fetcher: &dyn JsonFetcher, root_url: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut seen_records = HashSet::new();
    let mut visited = HashSet::new();
    let mut next_url = Some(root_url.to_string());
    let mut pages = 0usize;

    while let Some(url) = next_url.take() {
        if !visited.insert(url.clone()) {
            return Err(EtlError::PaginationCycle(url));
        }

        debug!(url = %url, "Fetching page");
        let body = fetcher.get_json(&url).await?;
        pages += 1;

        let batch = match Page::classify(&url, body)? {
            Page::Paginated { results, next } => {
                next_url = next;
                results
            },
            Page::List(items) => items,
            Page::Single(record) => vec![record],
        };

        for record in batch {
            if seen_records.insert(Value::Object(record.clone()).to_string()) {
                records.push(record);
            }
        }
    }

    info!(pages, records = records.len(), "Fetched source records");
    Ok(records)
}
