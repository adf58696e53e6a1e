//! Bronze layer: fetch planet records and resolve their cross-references
//!
//! - [`client`]: paginated fetch against the source API
//! - [`resolver`]: memoized URL -> display name resolution
//! - [`normalizer`]: applies the resolver to every field of every record

pub mod client;
pub mod normalizer;
pub mod resolver;

/// A single source record: field name to JSON value, in source field order.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Default planets endpoint of the public SWAPI mirror
pub const DEFAULT_PLANETS_URL: &str = "https://swapi.info/api/planets";

// Re-export commonly used types
pub use client::{fetch_all_pages, HttpFetcher, JsonFetcher, Page};
pub use normalizer::normalize_records;
pub use resolver::{Lookup, ReferenceCache, Resolver};
