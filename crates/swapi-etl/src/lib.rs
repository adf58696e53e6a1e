//! SWAPI ETL Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Extracts the planet catalog from the Star Wars API, resolves cross-reference
//! URLs into display names, reshapes the records into a small relational model
//! and loads it into object storage, PostgreSQL and BigQuery.
//!
//! # Layers
//!
//! - **Bronze**: raw planet records with references resolved
//! - **Silver**: cleaned records with surrogate keys, numeric and list columns
//! - **Gold**: the `planets` fact table and four link tables
//!
//! # Architecture
//!
//! ```text
//! extract::client      paginated fetch            (fatal on transport errors)
//! extract::resolver    URL -> name/title, memoized (never fails)
//! extract::normalizer  resolver over every field
//! transform::cleaner   text, numeric and composite field parsing
//! transform::keys      dense surrogate keys
//! transform::gold      fact + link tables
//! load::*              parquet layers, Postgres, BigQuery
//! ```
//!
//! # Example
//!
//! ```no_run
//! use swapi_etl::{config::EtlConfig, config::RunSwitches, pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EtlConfig::load(RunSwitches::default())?;
//!     let report = pipeline::run(&config).await?;
//!     println!("{} planets", report.fact_rows);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod load;
pub mod pipeline;
pub mod table;
pub mod transform;

// Re-export commonly used types
pub use error::{EtlError, Result};
pub use extract::Record;
pub use table::Table;
