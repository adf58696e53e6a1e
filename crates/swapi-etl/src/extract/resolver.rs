//! Cross-reference resolution
//!
//! Planet records point at other entities by URL (`residents`, `films`).
//! The resolver swaps each URL for the referenced entity's `name`, or its
//! `title` when it has no name (films).
//!
//! Every URL is fetched at most once per run: outcomes, failures included,
//! are memoized in a [`ReferenceCache`] owned by the resolver.

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

use super::client::JsonFetcher;

/// Outcome of dereferencing one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Resolved(String),
    Unresolved,
}

impl Lookup {
    /// JSON form: the display string, or `null` when unresolved
    pub fn to_value(&self) -> Value {
        match self {
            Lookup::Resolved(name) => Value::String(name.clone()),
            Lookup::Unresolved => Value::Null,
        }
    }
}

/// URL -> lookup outcome, scoped to one pipeline run
#[derive(Debug, Default, Clone)]
pub struct ReferenceCache {
    entries: HashMap<String, Lookup>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, url: &str) -> Option<&Lookup> {
        self.entries.get(url)
    }

    pub fn insert(&mut self, url: impl Into<String>, outcome: Lookup) {
        self.entries.insert(url.into(), outcome);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of cached negative outcomes
    pub fn unresolved_count(&self) -> usize {
        self.entries
            .values()
            .filter(|outcome| **outcome == Lookup::Unresolved)
            .count()
    }
}

/// Whether `value` is a cross-reference: an absolute http(s) URL.
pub fn is_reference(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Display value of a fetched entity: non-empty `name`, else non-empty `title`.
pub fn display_value(entity: &Value) -> Option<String> {
    ["name", "title"].iter().find_map(|field| match entity.get(field) {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    })
}

/// Memoizing cross-reference resolver
pub struct Resolver<'a> {
    fetcher: &'a dyn JsonFetcher,
    cache: ReferenceCache,
    fetches: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(fetcher: &'a dyn JsonFetcher) -> Self {
        Self::with_cache(fetcher, ReferenceCache::new())
    }

    /// Start from an existing cache, e.g. one seeded in tests.
    pub fn with_cache(fetcher: &'a dyn JsonFetcher, cache: ReferenceCache) -> Self {
        Self {
            fetcher,
            cache,
            fetches: 0,
        }
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    /// Number of network lookups performed so far
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    /// Resolve one field value.
    ///
    /// - a list made only of references resolves element-wise (same length,
    ///   `null` for failures)
    /// - a single reference resolves to its display value or `null`
    /// - anything else is returned unchanged
    pub async fn resolve(&mut self, value: Value) -> Value {
        match value {
            Value::Array(items) if items.iter().all(|item| item.as_str().is_some_and(is_reference)) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in &items {
                    if let Some(url) = item.as_str() {
                        resolved.push(self.lookup(url).await.to_value());
                    }
                }
                Value::Array(resolved)
            },
            Value::String(text) if is_reference(&text) => self.lookup(&text).await.to_value(),
            other => other,
        }
    }

    /// Dereference a single URL through the cache.
    pub async fn lookup(&mut self, url: &str) -> Lookup {
        if let Some(hit) = self.cache.lookup(url) {
            return hit.clone();
        }

        self.fetches += 1;
        let outcome = match self.fetcher.get_json(url).await {
            Ok(entity) => match display_value(&entity) {
                Some(name) => Lookup::Resolved(name),
                None => {
                    debug!(url = %url, "Referenced entity has no name or title");
                    Lookup::Unresolved
                },
            },
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to resolve reference");
                Lookup::Unresolved
            },
        };

        self.cache.insert(url, outcome.clone());
        outcome
    }
}
