//! Pipeline error types

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Errors that abort a pipeline run.
///
/// Cross-reference lookups and field parsing never produce these; they degrade
/// to absent values instead.
#[derive(Error, Debug)]
pub enum EtlError {
    /// Source or warehouse API request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Top-level response was not a paginated object, a list or an object
    #[error("Unexpected response shape from {url}: got {found}")]
    UnexpectedShape { url: String, found: String },

    /// A `next` link pointed back at a page that was already fetched
    #[error("Pagination cycle detected: {0} was already fetched")]
    PaginationCycle(String),

    /// Columns of a table disagree in length or type
    #[error("Table '{table}' is malformed: {reason}")]
    MalformedTable { table: String, reason: String },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet encoding failed: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Object storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Warehouse load failed: {0}")]
    Warehouse(String),

    #[error("Configuration error: {0}")]
    Config(#[from] swapi_common::SwapiError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EtlError {
    pub fn unexpected_shape(url: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            url: url.into(),
            found: found.into(),
        }
    }

    pub fn malformed_table(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTable {
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn warehouse(message: impl Into<String>) -> Self {
        Self::Warehouse(message.into())
    }
}
