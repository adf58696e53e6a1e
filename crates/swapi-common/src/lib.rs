//! SWAPI ETL Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the SWAPI ETL workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`SwapiError`] and the [`Result`] alias
//! - **Environment**: typed readers for environment-driven configuration
//! - **Logging**: `tracing` subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use swapi_common::{env, Result};
//!
//! fn bucket() -> Result<String> {
//!     env::required("GCS_BUCKET")
//! }
//! ```

pub mod env;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, SwapiError};
