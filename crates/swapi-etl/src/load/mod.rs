//! Sinks for the bronze, silver and gold layers
//!
//! - [`parquet`]: table encoding
//! - [`object_store`]: layer files in a bucket or a local directory
//! - [`postgres`]: gold tables into a Postgres schema
//! - [`warehouse`]: gold tables into BigQuery from the bucket

pub mod object_store;
pub mod parquet;
pub mod postgres;
pub mod warehouse;

/// Object key of the bronze layer, relative to the base path
pub const BRONZE_FILE: &str = "bronze/planets_raw.parquet";

/// Object key of the silver layer, relative to the base path
pub const SILVER_FILE: &str = "silver/planets_clean.parquet";

/// Object keys of every layer under one base path.
///
/// Shared by the layer writer and the warehouse loader so both agree on where
/// gold files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerPaths {
    base: String,
}

impl LayerPaths {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn bronze(&self) -> String {
        self.join(BRONZE_FILE)
    }

    pub fn silver(&self) -> String {
        self.join(SILVER_FILE)
    }

    pub fn gold(&self, table: &str) -> String {
        self.join(&format!("gold/{}.parquet", table))
    }

    /// `gs://` URI of `key` in `bucket`
    pub fn gs_uri(bucket: &str, key: &str) -> String {
        format!("gs://{}/{}", bucket, key)
    }

    fn join(&self, relative: &str) -> String {
        if self.base.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.base, relative)
        }
    }
}

// Re-export commonly used types
pub use object_store::{
    write_layers, LayerWriter, LocalLayerWriter, ObjectStorage, UploadResult,
};
pub use postgres::PostgresLoader;
pub use warehouse::WarehouseLoader;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_keys() {
        let paths = LayerPaths::new("/swapi/");
        assert_eq!(paths.bronze(), "swapi/bronze/planets_raw.parquet");
        assert_eq!(paths.silver(), "swapi/silver/planets_clean.parquet");
        assert_eq!(paths.gold("planet_films"), "swapi/gold/planet_films.parquet");
    }

    #[test]
    fn test_empty_base() {
        let paths = LayerPaths::new("");
        assert_eq!(paths.gold("planets"), "gold/planets.parquet");
        assert_eq!(
            LayerPaths::gs_uri("lake", &paths.gold("planets")),
            "gs://lake/gold/planets.parquet"
        );
    }
}
